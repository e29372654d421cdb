use axum::extract::{rejection::JsonRejection, Extension, Json, Path};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::body;
use crate::{
    api::{DynAPI, NewPlace},
    error::{not_found_error, Error, Resource},
    server::validation::{min_length, not_empty},
};

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    title: String,
    description: String,
    address: String,
    creator: Uuid,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateParams {
    title: String,
    description: String,
}

impl CreateParams {
    fn validate(self) -> Result<NewPlace, Error> {
        not_empty(&self.title)?;
        min_length(&self.description, 5)?;
        not_empty(&self.address)?;

        Ok(NewPlace {
            title: self.title,
            description: self.description,
            address: self.address,
            creator: self.creator,
        })
    }
}

impl UpdateParams {
    fn validate(self) -> Result<(String, String), Error> {
        not_empty(&self.title)?;
        min_length(&self.description, 5)?;

        Ok((self.title, self.description))
    }
}

fn place_id(raw: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw).map_err(|_| not_found_error(Resource::Place))
}

pub async fn list(Extension(api): Extension<DynAPI>) -> Result<Json<Value>, Error> {
    let places = api.list_places().await?;

    Ok(Json(json!({ "users": places })))
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(pid): Path<String>,
) -> Result<Json<Value>, Error> {
    let place = api.find_place(place_id(&pid)?).await?;

    Ok(Json(json!({ "place": place })))
}

// matchit cannot hold a static `user` segment beside `:pid`, so the by-user
// listing is routed as `/:pid/:uid` and checks the first segment itself
pub async fn list_by_user(
    Extension(api): Extension<DynAPI>,
    Path((segment, uid)): Path<(String, String)>,
) -> Result<Json<Value>, Error> {
    if segment != "user" {
        return Err(not_found_error(Resource::Route));
    }

    let user_id = Uuid::parse_str(&uid).map_err(|_| not_found_error(Resource::Place))?;
    let places = api.list_places_by_user(user_id).await?;

    Ok(Json(json!({ "places": places })))
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    payload: Result<Json<CreateParams>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let params = body(payload)?.validate()?;
    let place = api.create_place(params).await?;

    Ok((StatusCode::CREATED, Json(json!({ "place": place }))))
}

pub async fn update(
    Extension(api): Extension<DynAPI>,
    Path(pid): Path<String>,
    payload: Result<Json<UpdateParams>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    let (title, description) = body(payload)?.validate()?;
    let place = api.update_place(place_id(&pid)?, title, description).await?;

    Ok(Json(json!({ "place": place })))
}

pub async fn delete(
    Extension(api): Extension<DynAPI>,
    Path(pid): Path<String>,
) -> Result<Json<Value>, Error> {
    api.delete_place(place_id(&pid)?).await?;

    Ok(Json(json!({ "message": "Place deleted successfully." })))
}
