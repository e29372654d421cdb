use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Document;

pub const DEFAULT_USER_IMAGE: &str =
    "https://upload.wikimedia.org/wikipedia/commons/8/89/Portrait_Placeholder.png";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    // stored as supplied, see DESIGN.md
    pub password: String,
    pub image: String,
    pub places: Vec<Uuid>,
}

/// A user as it is exposed over the API: everything but the password.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: String,
    pub places: Vec<Uuid>,
}

impl User {
    pub fn new(name: String, email: String, password: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password,
            image: DEFAULT_USER_IMAGE.into(),
            places: vec![],
        }
    }

    pub fn owns_place(&self, place_id: &Uuid) -> bool {
        self.places.contains(place_id)
    }

    pub fn add_place(&mut self, place_id: Uuid) {
        if !self.owns_place(&place_id) {
            self.places.push(place_id);
        }
    }

    pub fn remove_place(&mut self, place_id: &Uuid) -> bool {
        let before = self.places.len();
        self.places.retain(|id| id != place_id);
        self.places.len() != before
    }

    pub fn password_matches(&self, password: &str) -> bool {
        self.password == password
    }
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image,
            places: user.places,
        }
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";
    const UNIQUE_FIELDS: &'static [&'static str] = &["email"];

    fn id(&self) -> Uuid {
        self.id
    }
}

#[test]
fn add_place_keeps_order_and_skips_duplicates() {
    let mut user = User::new("Saul".into(), "saul@test.com".into(), "testers".into());
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    user.add_place(a);
    user.add_place(b);
    user.add_place(a);

    assert_eq!(user.places, vec![a, b]);
}

#[test]
fn remove_place_reports_whether_it_was_owned() {
    let mut user = User::new("Saul".into(), "saul@test.com".into(), "testers".into());
    let place_id = Uuid::new_v4();
    user.add_place(place_id);

    assert!(user.remove_place(&place_id));
    assert!(!user.remove_place(&place_id));
    assert!(user.places.is_empty());
}

#[test]
fn view_drops_password() {
    let user = User::new("Saul".into(), "saul@test.com".into(), "testers".into());
    let json = serde_json::to_value(UserView::from(user)).unwrap();

    assert!(json.get("password").is_none());
    assert_eq!(json["email"], "saul@test.com");
}
