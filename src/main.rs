use waypoint::config::{Config, StoreBackend};
use waypoint::db::{MemoryStore, PgStore};
use waypoint::engine::Engine;
use waypoint::error::Error;
use waypoint::external::GoogleMapsGeocoder;
use waypoint::server::serve;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run().await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let config = Config::from_env()?;

    tracing::info!(?config, "starting");

    let geocoder = GoogleMapsGeocoder::new(
        config.google_maps_api_base.clone(),
        config.google_maps_api_key.clone(),
        config.geocoder_timeout,
    )?;

    match config.store_backend {
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.database_url, config.max_connections).await?;
            serve(Engine::new(store, geocoder), config.listen_addr).await
        }
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store, data will not survive a restart");
            serve(Engine::new(MemoryStore::new(), geocoder), config.listen_addr).await
        }
    }
}
