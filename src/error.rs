use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt::{self, Debug, Display};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Place,
    Creator,
    Route,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeocodeFailure {
    NotFound,
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound(Resource),
    Conflict,
    Auth,
    Geocode(GeocodeFailure),
    Store,
    Config,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Validation | ErrorKind::Conflict => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            ErrorKind::Auth => StatusCode::UNAUTHORIZED,
            ErrorKind::Geocode(GeocodeFailure::NotFound) => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Geocode(GeocodeFailure::Unavailable)
            | ErrorKind::Store
            | ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_store_error(&self) -> bool {
        self.kind == ErrorKind::Store
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        database_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        // internal details stay in the logs
        let message = match self.kind {
            ErrorKind::Store | ErrorKind::Config => {
                tracing::error!(kind = ?self.kind, "{}", self.message);
                "Something went wrong, please try again later.".to_string()
            }
            _ => self.message,
        };

        let body = Json(json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub fn validation_error(message: impl Into<String>) -> Error {
    Error {
        kind: ErrorKind::Validation,
        message: message.into(),
    }
}

pub fn invalid_input_error() -> Error {
    validation_error("Invalid inputs passed, please check your data.")
}

pub fn not_found_error(resource: Resource) -> Error {
    let message = match resource {
        Resource::Place => "Could not find a place for the provided id.",
        Resource::Creator => "Could not find user for provided id.",
        Resource::Route => "Could not find this route.",
    };

    Error {
        kind: ErrorKind::NotFound(resource),
        message: message.into(),
    }
}

pub fn conflict_error() -> Error {
    Error {
        kind: ErrorKind::Conflict,
        message: "User exists already, please login instead.".into(),
    }
}

pub fn auth_error() -> Error {
    Error {
        kind: ErrorKind::Auth,
        message: "Invalid credentials, could not log you in.".into(),
    }
}

pub fn geocode_not_found_error() -> Error {
    Error {
        kind: ErrorKind::Geocode(GeocodeFailure::NotFound),
        message: "Could not find location for the specified address.".into(),
    }
}

pub fn geocode_unavailable_error() -> Error {
    Error {
        kind: ErrorKind::Geocode(GeocodeFailure::Unavailable),
        message: "Geocoding service unavailable, please try again later.".into(),
    }
}

pub fn store_error(message: impl Into<String>) -> Error {
    Error {
        kind: ErrorKind::Store,
        message: message.into(),
    }
}

pub fn config_error(message: impl Into<String>) -> Error {
    Error {
        kind: ErrorKind::Config,
        message: message.into(),
    }
}

pub fn database_error<T: Debug>(err: T) -> Error {
    tracing::warn!("database error: {:?}", err);

    store_error("Something went wrong, please try again later.")
}

pub fn reqwest_error(err: reqwest::Error) -> Error {
    tracing::warn!("geocoder transport error: {}", err);

    geocode_unavailable_error()
}

#[test]
fn status_codes_follow_error_kind() {
    assert_eq!(
        invalid_input_error().status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        not_found_error(Resource::Creator).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(conflict_error().status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(auth_error().status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        geocode_not_found_error().status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        geocode_unavailable_error().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        store_error("tx aborted").status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn into_response_uses_error_status() {
    let response = auth_error().into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = store_error("no document to update").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
