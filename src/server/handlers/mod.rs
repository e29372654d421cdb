pub mod places;
pub mod users;

use axum::{extract::rejection::JsonRejection, Json};

use crate::error::{invalid_input_error, not_found_error, Error, Resource};

/// Undecodable bodies are reported as invalid input rather than axum's own rejection.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
    match payload {
        Ok(Json(params)) => Ok(params),
        Err(rejection) => {
            tracing::info!("rejected request body: {}", rejection);
            Err(invalid_input_error())
        }
    }
}

pub async fn route_not_found() -> Error {
    not_found_error(Resource::Route)
}
