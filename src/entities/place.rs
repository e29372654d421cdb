use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Document;
use crate::entities::Coordinates;

pub const DEFAULT_PLACE_IMAGE: &str =
    "https://upload.wikimedia.org/wikipedia/commons/1/10/Empire_State_Building_%28aerial_view%29.jpg";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub address: String,
    pub location: Coordinates,
    pub image: String,
    pub creator: Uuid,
}

impl Place {
    pub fn new(
        title: String,
        description: String,
        address: String,
        location: Coordinates,
        creator: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            address,
            location,
            image: DEFAULT_PLACE_IMAGE.into(),
            creator,
        }
    }

    /// Only the title and description are mutable once a place exists.
    pub fn revise(&mut self, title: String, description: String) {
        self.title = title;
        self.description = description;
    }
}

impl Document for Place {
    const COLLECTION: &'static str = "places";

    fn id(&self) -> Uuid {
        self.id
    }
}
