pub mod google_maps;

use async_trait::async_trait;

use crate::{entities::Coordinates, error::Error};

pub use google_maps::GoogleMapsGeocoder;

/// Resolves a free-text address to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Coordinates, Error>;
}
