mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use uuid::Uuid;
use waypoint::api::PlaceAPI;
use waypoint::db::{Document, DocumentStore, MemoryStore};
use waypoint::entities::{Coordinates, Place, User};
use waypoint::error::{Error, ErrorKind, GeocodeFailure, Resource};

use support::*;

#[tokio::test]
async fn create_place_geocodes_and_links_creator() {
    let (engine, store) = engine();
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;

    let place = engine
        .create_place(new_place("Empire State", EMPIRE_STATE, u1))
        .await
        .unwrap();

    assert_eq!(place.location, Coordinates::new(40.7484, -73.9857));
    assert_eq!(place.creator, u1);
    assert_eq!(place.address, EMPIRE_STATE);
    assert!(!place.image.is_empty());

    assert_eq!(user(&store, u1).await.places, vec![place.id]);
    assert_eq!(engine.find_place(place.id).await.unwrap(), place);
}

#[tokio::test]
async fn create_place_with_unknown_creator_writes_nothing() {
    let (engine, store) = engine();

    let err = engine
        .create_place(new_place("Empire State", EMPIRE_STATE, Uuid::new_v4()))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound(Resource::Creator));
    assert_eq!(store.count(Place::COLLECTION).await, 0);
}

#[tokio::test]
async fn geocoding_failures_propagate_before_any_lookup() {
    let (engine, store) = engine();
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;

    let err = engine
        .create_place(new_place("Nowhere", "1 Nonexistent Rd, Atlantis", u1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Geocode(GeocodeFailure::NotFound));

    let offline = support::StubGeocoder::new();
    offline.go_offline();
    let engine = waypoint::engine::Engine::new(store.clone(), offline);

    let err = engine
        .create_place(new_place("Empire State", EMPIRE_STATE, u1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Geocode(GeocodeFailure::Unavailable));

    assert_eq!(store.count(Place::COLLECTION).await, 0);
    assert!(user(&store, u1).await.places.is_empty());
}

#[tokio::test]
async fn failed_create_transaction_leaves_no_trace() {
    let (engine, store) = engine();
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;

    store.fail_writes_to(User::COLLECTION).await;

    let err = engine
        .create_place(new_place("Empire State", EMPIRE_STATE, u1))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Store);
    assert_eq!(store.count(Place::COLLECTION).await, 0);

    store.restore_writes_to(User::COLLECTION).await;
    assert!(user(&store, u1).await.places.is_empty());
}

#[tokio::test]
async fn delete_place_detaches_it_from_creator() {
    let (engine, store) = engine();
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;
    let p1 = engine
        .create_place(new_place("Empire State", EMPIRE_STATE, u1))
        .await
        .unwrap();
    let p2 = engine
        .create_place(new_place("Sagrada Familia", SAGRADA_FAMILIA, u1))
        .await
        .unwrap();

    engine.delete_place(p1.id).await.unwrap();

    let err = engine.find_place(p1.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound(Resource::Place));
    assert_eq!(user(&store, u1).await.places, vec![p2.id]);
}

#[tokio::test]
async fn failed_delete_transaction_keeps_place_intact() {
    let (engine, store) = engine();
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;
    let p1 = engine
        .create_place(new_place("Empire State", EMPIRE_STATE, u1))
        .await
        .unwrap();

    store.fail_writes_to(User::COLLECTION).await;

    let err = engine.delete_place(p1.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Store);

    assert_eq!(engine.find_place(p1.id).await.unwrap(), p1);
    assert_eq!(user(&store, u1).await.places, vec![p1.id]);
}

#[tokio::test]
async fn delete_of_orphaned_place_reports_missing_creator() {
    let (engine, store) = engine();
    let orphan = Place::new(
        "Orphan".into(),
        "Creator was removed out of band".into(),
        EMPIRE_STATE.into(),
        Coordinates::new(40.7484, -73.9857),
        Uuid::new_v4(),
    );
    store.insert(&orphan).await.unwrap();

    let err = engine.delete_place(orphan.id).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound(Resource::Creator));
    assert_eq!(engine.find_place(orphan.id).await.unwrap(), orphan);
}

#[tokio::test]
async fn delete_of_unknown_place_is_not_found() {
    let (engine, _) = engine();

    let err = engine.delete_place(Uuid::new_v4()).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound(Resource::Place));
}

#[tokio::test]
async fn update_place_only_touches_title_and_description() {
    let (engine, store) = engine();
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;
    let original = engine
        .create_place(new_place("Empire State", EMPIRE_STATE, u1))
        .await
        .unwrap();

    let first = engine
        .update_place(original.id, "ESB".into(), "Art deco skyscraper".into())
        .await
        .unwrap();
    let stored_after_first: Place = store.find_by_id(&original.id).await.unwrap().unwrap();

    let second = engine
        .update_place(original.id, "ESB".into(), "Art deco skyscraper".into())
        .await
        .unwrap();
    let stored_after_second: Place = store.find_by_id(&original.id).await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(stored_after_first, stored_after_second);
    assert_eq!(second.title, "ESB");
    assert_eq!(second.address, original.address);
    assert_eq!(second.location, original.location);
    assert_eq!(second.creator, original.creator);
}

#[tokio::test]
async fn update_of_unknown_place_is_not_found() {
    let (engine, _) = engine();

    let err = engine
        .update_place(Uuid::new_v4(), "Title".into(), "Description".into())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound(Resource::Place));
}

#[tokio::test]
async fn places_by_user_follow_the_creators_list() {
    let (engine, _) = engine();
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;

    let err = engine.list_places_by_user(u1).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound(Resource::Place));

    let err = engine
        .list_places_by_user(Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound(Resource::Place));

    let p1 = engine
        .create_place(new_place("Empire State", EMPIRE_STATE, u1))
        .await
        .unwrap();
    let p2 = engine
        .create_place(new_place("Sagrada Familia", SAGRADA_FAMILIA, u1))
        .await
        .unwrap();

    let places = engine.list_places_by_user(u1).await.unwrap();
    assert_eq!(places, vec![p1, p2]);
}

#[tokio::test]
async fn invariants_hold_across_mixed_operations() {
    let (engine, store) = engine();
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;
    let u2 = signup(&engine, "Kim Wexler", "kim@test.com").await;

    let mut created = vec![];
    for (i, creator) in [u1, u2, u1, u2, u1].iter().enumerate() {
        let address = if i % 2 == 0 { EMPIRE_STATE } else { SAGRADA_FAMILIA };
        let place = engine
            .create_place(new_place(&format!("Place {}", i), address, *creator))
            .await
            .unwrap();
        created.push(place);
        assert_referentially_consistent(&store).await;
    }

    engine.delete_place(created[0].id).await.unwrap();
    assert_referentially_consistent(&store).await;

    engine
        .update_place(created[1].id, "Renamed".into(), "New description".into())
        .await
        .unwrap();
    assert_referentially_consistent(&store).await;

    store.fail_writes_to(Place::COLLECTION).await;
    assert!(engine.delete_place(created[2].id).await.is_err());
    assert!(engine
        .create_place(new_place("Blocked", EMPIRE_STATE, u2))
        .await
        .is_err());
    store.restore_writes_to(Place::COLLECTION).await;
    assert_referentially_consistent(&store).await;

    engine.delete_place(created[3].id).await.unwrap();
    assert_referentially_consistent(&store).await;

    assert_eq!(user(&store, u1).await.places, vec![created[2].id, created[4].id]);
    assert_eq!(user(&store, u2).await.places, vec![created[1].id]);
}

#[tokio::test]
async fn concurrent_creates_for_one_user_never_lose_references() {
    let (engine, store) = engine();
    store.interleave_commits().await;
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;

    let attempts = (0..8).map(|i| {
        engine.create_place(new_place(&format!("Place {}", i), EMPIRE_STATE, u1))
    });
    let results = join_all(attempts).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let conflicted = results
        .iter()
        .filter(|r| matches!(r, Err(err) if err.kind == ErrorKind::Store))
        .count();

    assert!(succeeded >= 1);
    assert!(conflicted >= 1);
    assert_eq!(succeeded + conflicted, results.len());

    assert_eq!(store.count(Place::COLLECTION).await, succeeded);
    assert_eq!(user(&store, u1).await.places.len(), succeeded);
    assert_referentially_consistent(&store).await;
}

#[tokio::test]
async fn concurrent_creates_and_deletes_for_one_user_stay_consistent() {
    let (engine, store) = engine();
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;

    let mut seeded = vec![];
    for i in 0..4 {
        let place = engine
            .create_place(new_place(&format!("Seed {}", i), SAGRADA_FAMILIA, u1))
            .await
            .unwrap();
        seeded.push(place.id);
    }

    store.interleave_commits().await;

    let mut attempts: Vec<BoxFuture<'_, Result<(), Error>>> = vec![];
    for (i, place_id) in seeded.iter().enumerate() {
        let engine = &engine;
        let place_id = *place_id;

        let create = async move {
            engine
                .create_place(new_place(&format!("Place {}", i), EMPIRE_STATE, u1))
                .await
                .map(|_| ())
        };
        let delete = async move { engine.delete_place(place_id).await };

        attempts.push(create.boxed());
        attempts.push(delete.boxed());
    }
    let results = join_all(attempts).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let conflicted = results
        .iter()
        .filter(|r| matches!(r, Err(err) if err.kind == ErrorKind::Store))
        .count();

    assert!(succeeded >= 1);
    assert!(conflicted >= 1);
    assert_eq!(succeeded + conflicted, results.len());

    let places = store.count(Place::COLLECTION).await;
    assert_eq!(user(&store, u1).await.places.len(), places);
    assert_referentially_consistent(&store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_creates_and_deletes_across_threads_stay_consistent() {
    let (engine, store) = engine();
    store.interleave_commits().await;
    let engine = Arc::new(engine);
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;

    let mut handles = vec![];
    for i in 0..32 {
        let engine = engine.clone();

        handles.push(tokio::spawn(async move {
            let place = engine
                .create_place(new_place(&format!("Place {}", i), EMPIRE_STATE, u1))
                .await?;

            if i % 2 == 0 {
                engine.delete_place(place.id).await?;
            }

            Ok::<_, Error>(())
        }));
    }

    for handle in handles {
        if let Err(err) = handle.await.unwrap() {
            assert_eq!(err.kind, ErrorKind::Store);
        }
    }

    let places = store.count(Place::COLLECTION).await;
    assert_eq!(user(&store, u1).await.places.len(), places);
    assert_referentially_consistent(&store).await;
}

#[tokio::test]
async fn geocoder_is_consulted_once_per_create() {
    let store = MemoryStore::new();
    let engine = waypoint::engine::Engine::new(store.clone(), StubGeocoder::new());
    let u1 = signup(&engine, "Saul Goodman", "test@test.com").await;

    engine
        .create_place(new_place("Empire State", EMPIRE_STATE, u1))
        .await
        .unwrap();

    assert_eq!(engine_geocoder_calls(&engine), 1);
}

fn engine_geocoder_calls(engine: &TestEngine) -> usize {
    engine.geocoder().calls.load(Ordering::SeqCst)
}
