#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use waypoint::api::{NewPlace, NewUser, UserAPI};
use waypoint::db::{DocumentStore, Filter, MemoryStore};
use waypoint::engine::Engine;
use waypoint::entities::{Coordinates, Place, User};
use waypoint::error::{geocode_not_found_error, geocode_unavailable_error, Error};
use waypoint::external::Geocoder;

pub const EMPIRE_STATE: &str = "350 5th Ave, NYC";
pub const SAGRADA_FAMILIA: &str = "Carrer de Mallorca, 401, Barcelona";

/// Resolves a fixed set of addresses, counting every lookup.
#[derive(Default)]
pub struct StubGeocoder {
    known: HashMap<String, Coordinates>,
    unavailable: AtomicBool,
    pub calls: AtomicUsize,
}

impl StubGeocoder {
    pub fn new() -> Self {
        let mut known = HashMap::new();
        known.insert(EMPIRE_STATE.to_string(), Coordinates::new(40.7484, -73.9857));
        known.insert(SAGRADA_FAMILIA.to_string(), Coordinates::new(41.4036, 2.1744));

        Self {
            known,
            ..Self::default()
        }
    }

    pub fn go_offline(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn resolve(&self, address: &str) -> Result<Coordinates, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(geocode_unavailable_error());
        }

        self.known
            .get(address)
            .copied()
            .ok_or_else(geocode_not_found_error)
    }
}

pub type TestEngine = Engine<MemoryStore, StubGeocoder>;

pub fn engine() -> (TestEngine, MemoryStore) {
    let store = MemoryStore::new();

    (Engine::new(store.clone(), StubGeocoder::new()), store)
}

pub async fn signup(engine: &TestEngine, name: &str, email: &str) -> Uuid {
    engine
        .signup(NewUser {
            name: name.into(),
            email: email.into(),
            password: "testers".into(),
        })
        .await
        .unwrap()
        .id
}

pub fn new_place(title: &str, address: &str, creator: Uuid) -> NewPlace {
    NewPlace {
        title: title.into(),
        description: "A place worth visiting".into(),
        address: address.into(),
        creator,
    }
}

pub async fn user(store: &MemoryStore, id: Uuid) -> User {
    store.find_by_id(&id).await.unwrap().unwrap()
}

/// Every place's creator lists it, and every listed place exists with that creator.
pub async fn assert_referentially_consistent(store: &MemoryStore) {
    let users: Vec<User> = store.find(Filter::All).await.unwrap();
    let places: Vec<Place> = store.find(Filter::All).await.unwrap();

    for user in users.iter() {
        for place_id in user.places.iter() {
            let place = places
                .iter()
                .find(|p| p.id == *place_id)
                .unwrap_or_else(|| panic!("user {} lists missing place {}", user.id, place_id));
            assert_eq!(place.creator, user.id);
        }
    }

    for place in places.iter() {
        let creator = users
            .iter()
            .find(|u| u.id == place.creator)
            .unwrap_or_else(|| panic!("place {} has no creator", place.id));
        assert!(creator.places.contains(&place.id));
    }
}
