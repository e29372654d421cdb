use axum::extract::{rejection::JsonRejection, Extension, Json};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::body;
use crate::{
    api::{DynAPI, NewUser},
    error::Error,
    server::validation::{email, min_length, not_empty},
};

#[derive(Serialize, Deserialize)]
pub struct SignupParams {
    name: String,
    email: String,
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginParams {
    email: String,
    password: String,
}

impl SignupParams {
    fn validate(self) -> Result<NewUser, Error> {
        not_empty(&self.name)?;
        email(&self.email)?;
        min_length(&self.password, 6)?;

        Ok(NewUser {
            name: self.name,
            email: self.email,
            password: self.password,
        })
    }
}

pub async fn list(Extension(api): Extension<DynAPI>) -> Result<Json<Value>, Error> {
    let users = api.list_users().await?;

    Ok(Json(json!({ "users": users })))
}

pub async fn signup(
    Extension(api): Extension<DynAPI>,
    payload: Result<Json<SignupParams>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let params = body(payload)?.validate()?;
    let user = api.signup(params).await?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

pub async fn login(
    Extension(api): Extension<DynAPI>,
    payload: Result<Json<LoginParams>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    let params = body(payload)?;
    let user = api.login(params.email, params.password).await?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(json!({ "message": "Logged in!" })))
}
