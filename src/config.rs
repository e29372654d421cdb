use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::error::{config_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend {:?}", other)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub max_connections: u32,
    pub google_maps_api_base: String,
    pub google_maps_api_key: String,
    pub geocoder_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("store_backend", &self.store_backend)
            .field("max_connections", &self.max_connections)
            .field("google_maps_api_base", &self.google_maps_api_base)
            .field("geocoder_timeout", &self.geocoder_timeout)
            .finish()
    }
}

impl Config {
    /// Reads the process environment, after merging in a `.env` file if present.
    pub fn from_env() -> Result<Self, Error> {
        if let Err(err) = dotenv::dotenv() {
            tracing::debug!("no .env file loaded: {}", err);
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend: StoreBackend =
            parse_or(&lookup, "STORE_BACKEND", StoreBackend::Postgres)?;

        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None if store_backend == StoreBackend::Memory => String::new(),
            None => database_url_from_parts(&lookup)?,
        };

        Ok(Self {
            listen_addr: parse_or(
                &lookup,
                "LISTEN_ADDR",
                SocketAddr::from(([127, 0, 0, 1], 5000)),
            )?,
            store_backend,
            database_url,
            max_connections: parse_or(&lookup, "PG_MAX_CONNECTIONS", 5)?,
            google_maps_api_base: lookup("GOOGLE_MAPS_API_BASE")
                .unwrap_or_else(|| "maps.googleapis.com".into()),
            google_maps_api_key: required(&lookup, "GOOGLE_MAPS_API_KEY")?,
            geocoder_timeout: Duration::from_secs(parse_or(
                &lookup,
                "GEOCODER_TIMEOUT_SECS",
                10,
            )?),
        })
    }
}

// credentials are percent-encoded into the userinfo
fn database_url_from_parts<F>(lookup: &F) -> Result<String, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let username = required(lookup, "PG_USERNAME")?;
    let password = required(lookup, "PG_PASSWORD")?;
    let database = required(lookup, "PG_DATABASE")?;
    let host = lookup("PG_HOST").unwrap_or_else(|| "localhost:5432".into());

    let mut url = Url::parse(&format!("postgresql://{}", host))
        .map_err(|e| config_error(format!("invalid PG_HOST value: {}", e)))?;

    if url.set_username(&username).is_err() || url.set_password(Some(&password)).is_err() {
        return Err(config_error("invalid PG_HOST value: cannot carry credentials"));
    }
    url.set_path(&database);

    Ok(url.to_string())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, Error>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| config_error(format!("{} must be set", key)))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| config_error(format!("invalid {} value: {}", key, e))),
        None => Ok(default),
    }
}
