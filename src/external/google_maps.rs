use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Geocoder;
use crate::{
    entities::Coordinates,
    error::{geocode_not_found_error, geocode_unavailable_error, validation_error, Error},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub formatted_address: String,
    pub geometry: Geometry,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Geometry {
    pub location: Coordinates,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response<T> {
    status: String,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

/// Geocoder backed by the Google Maps geocoding API.
#[derive(Clone)]
pub struct GoogleMapsGeocoder {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl std::fmt::Debug for GoogleMapsGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleMapsGeocoder")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GoogleMapsGeocoder {
    pub fn new(api_base: String, api_key: String, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base,
            api_key,
        })
    }
}

fn coordinates_from(data: Response<GeocodeResult>) -> Result<Coordinates, Error> {
    match data.status.as_str() {
        "OK" => data
            .results
            .into_iter()
            .next()
            .map(|result| result.geometry.location)
            .ok_or_else(geocode_not_found_error),
        "ZERO_RESULTS" => Err(geocode_not_found_error()),
        status => {
            tracing::warn!("geocoder responded with status {}", status);
            Err(geocode_unavailable_error())
        }
    }
}

#[async_trait]
impl Geocoder for GoogleMapsGeocoder {
    #[tracing::instrument(skip(self))]
    async fn resolve(&self, address: &str) -> Result<Coordinates, Error> {
        if address.trim().is_empty() {
            return Err(validation_error("An address is required to find a location."));
        }

        let url = format!("https://{}/maps/api/geocode/json", self.api_base);

        let res = self
            .client
            .get(url)
            .query(&[("address", address)])
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status_code = res.status();

        if !status_code.is_success() {
            tracing::warn!("geocoder returned http {}", status_code);
            return Err(geocode_unavailable_error());
        }

        let data: Response<GeocodeResult> = res.json().await?;

        coordinates_from(data)
    }
}
