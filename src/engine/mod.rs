mod place_api;
mod user_api;

use crate::{
    api::API,
    db::DocumentStore,
    error::{store_error, Error},
    external::Geocoder,
};

/// Coordinates places and users over a document store, keeping every place's
/// creator and that creator's `places` list in agreement.
pub struct Engine<S, G> {
    store: S,
    geocoder: G,
}

impl<S, G> Engine<S, G>
where
    S: DocumentStore,
    G: Geocoder,
{
    pub fn new(store: S, geocoder: G) -> Self {
        tracing::info!("engine ready");

        Self { store, geocoder }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }
}

/// Whatever made a transaction abort, callers see a store failure.
fn aborted(err: Error) -> Error {
    if err.is_store_error() {
        return err;
    }

    store_error(format!("transaction aborted: {}", err.message))
}

impl<S, G> API for Engine<S, G>
where
    S: DocumentStore + 'static,
    G: Geocoder + 'static,
{
}
