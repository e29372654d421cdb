use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{Place, UserView};
use crate::error::Error;

#[derive(Clone, Debug)]
pub struct NewPlace {
    pub title: String,
    pub description: String,
    pub address: String,
    pub creator: Uuid,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[async_trait]
pub trait PlaceAPI {
    async fn list_places(&self) -> Result<Vec<Place>, Error>;
    async fn find_place(&self, id: Uuid) -> Result<Place, Error>;
    async fn list_places_by_user(&self, user_id: Uuid) -> Result<Vec<Place>, Error>;
    async fn create_place(&self, params: NewPlace) -> Result<Place, Error>;
    async fn update_place(&self, id: Uuid, title: String, description: String)
        -> Result<Place, Error>;
    async fn delete_place(&self, id: Uuid) -> Result<(), Error>;
}

#[async_trait]
pub trait UserAPI {
    async fn list_users(&self) -> Result<Vec<UserView>, Error>;
    async fn signup(&self, params: NewUser) -> Result<UserView, Error>;
    async fn login(&self, email: String, password: String) -> Result<UserView, Error>;
}

pub trait API: PlaceAPI + UserAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
