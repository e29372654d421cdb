mod handlers;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    handler::Handler,
    routing::{get, post},
    Router,
};

use crate::api::{DynAPI, API};
use crate::error::{config_error, Error};
use crate::server::handlers::{places, route_not_found, users};

pub fn router(api: DynAPI) -> Router {
    Router::new()
        .route("/api/places", get(places::list).post(places::create))
        .route(
            "/api/places/:pid",
            get(places::find)
                .patch(places::update)
                .delete(places::delete),
        )
        .route("/api/places/:pid/:uid", get(places::list_by_user))
        .route("/api/users", get(users::list))
        .route("/api/users/signup", post(users::signup))
        .route("/api/users/login", post(users::login))
        .fallback(route_not_found.into_service())
        .layer(Extension(api))
}

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) -> Result<(), Error> {
    let api = Arc::new(api) as DynAPI;

    let app = router(api);

    tracing::info!("listening on {}", addr);

    axum::Server::try_bind(&addr)
        .map_err(|err| config_error(format!("could not bind {}: {}", addr, err)))?
        .serve(app.into_make_service())
        .await
        .map_err(|err| config_error(format!("server error: {}", err)))
}
