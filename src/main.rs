use std::sync::Arc;
use anyhow::{Context, Result};
use dotenv::dotenv;
use tokio::net::TcpListener;
use reqwest::Client as ReqwestClient;
use poem::Server;

use crypto_monitor::api::routes::create_router;
use crypto_monitor::api::state::AppState;
use crypto_monitor::config::{AppConfig, ColumnMapping};
use crypto_monitor::frontend::{create_frontend, Backend};
use crypto_monitor::services::cache::SnapshotCache;
use crypto_monitor::services::listing::CoinMarketCapSource;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    dotenv().ok();
    let config = AppConfig::from_env();
    tracing::info!("Starting with {:?}", config);

    let mapping = ColumnMapping::from_file(&config.column_config)
        .with_context(|| format!("loading column config {}", config.column_config.display()))?;
    tracing::info!("Loaded column config with {} columns", mapping.selections().len());

    let source = CoinMarketCapSource::new(config.listing_url.clone(), config.http_timeout)?;
    let cache = Arc::new(SnapshotCache::new(
        Arc::new(source),
        Arc::new(mapping),
        config.snapshot_ttl,
    ));

    // Warm the cache; a failure here is reported again on the first request
    if let Err(e) = cache.current().await {
        tracing::warn!("Initial snapshot fetch failed: {}", e);
    }

    let state = AppState::new(cache, config.refresh_per_minute, config.insights_enabled);
    let app = create_router(state);

    tracing::info!("API listening on {}", config.api_bind);
    let listener = TcpListener::bind(&config.api_bind).await?;

    // Frontend server
    let backend = Backend {
        client: ReqwestClient::new(),
        base_url: config.api_base_url.clone(),
    };
    tracing::info!("Dashboard listening on {}", config.frontend_bind);
    let frontend_server = Server::new(poem::listener::TcpListener::bind(config.frontend_bind.clone()))
        .run(create_frontend(backend));
    let frontend_handle = tokio::spawn(frontend_server);

    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            if let Err(e) = result {
                tracing::error!("Failed to serve API: {:?}", e);
            }
        }
        result = frontend_handle => {
            match result {
                Ok(Err(e)) => tracing::error!("Dashboard server failed: {:?}", e),
                Err(e) => tracing::error!("Dashboard task panicked: {:?}", e),
                Ok(Ok(())) => tracing::info!("Dashboard server finished"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down");
        }
    }

    Ok(())
}
