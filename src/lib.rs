pub mod api;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod importer;
pub mod query;

use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

use api::{create_router, AppState};
use client::{ApiClient, Session, Store};
use importer::{ImportSummary, Importer};

pub use config::AppConfig;
pub use database::Database;
pub use error::{AppError, AppResult};

/// Open (creating if needed) the catalog database named by the config.
pub fn open_database(config: &AppConfig) -> AppResult<Arc<Database>> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db = Database::new(&config.database_path)?;
    log::info!("Database opened at {:?}", config.database_path);
    Ok(Arc::new(db))
}

/// Serve the JSON API (and static front end, if configured) until Ctrl-C.
pub async fn serve(config: &AppConfig) -> AppResult<()> {
    let db = open_database(config)?;
    match db.get_stats() {
        Ok(stats) if stats.episodes == 0 => {
            log::warn!("Catalog is empty; run the import command first")
        }
        Ok(stats) => log::info!(
            "Catalog holds {} episodes and {} characters",
            stats.episodes,
            stats.characters
        ),
        Err(e) => log::warn!("Failed to read catalog stats: {}", e),
    }

    let app = create_router(AppState::new(db), config.static_dir.as_deref());
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}

/// Pull every episode and character from the public API into the store.
pub async fn import(config: &AppConfig) -> AppResult<ImportSummary> {
    let db = open_database(config)?;
    Importer::new(db, config.import_api_base.as_str())?.run().await
}

/// Interactive browse loop on stdin/stdout against a running server.
pub async fn browse(config: &AppConfig, server: &str) -> AppResult<()> {
    let api = ApiClient::new(
        server,
        Duration::from_secs(config.client_connect_timeout_secs),
    )?;
    log::info!("Browsing {}", api.base_url());

    let mut session = Session::new(api, Store::new());
    client::browse::run(
        &mut session,
        BufReader::new(tokio::io::stdin()),
        std::io::stdout(),
    )
    .await
}
