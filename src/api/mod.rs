//! JSON HTTP API.
//!
//! - `GET /api/page/:id/:type/:fromFilter/:toFilter[/:nameFilter]`
//! - `GET /api/num_of_pages/:num`
//! - `GET /api/characters_of_episode/:id`
//! - `GET /api/diagnostics`
//! - `GET /health`
//!
//! Malformed parameters are answered with an `invalid_input` result and
//! HTTP 200; only store failures produce an error status.

pub mod characters;
pub mod diagnostics;
pub mod episodes;
pub mod types;


use axum::routing::get;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::database::Database;
use crate::error::AppError;
use crate::query::QueryService;
use diagnostics::ErrorLog;

const ERROR_LOG_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub query: QueryService,
    pub error_log: Arc<ErrorLog>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            query: QueryService::new(db.clone()),
            db,
            error_log: Arc::new(ErrorLog::new(ERROR_LOG_CAPACITY)),
            started_at: Instant::now(),
        }
    }

    /// Record a failed request in the diagnostics log and hand the error
    /// back for the response.
    pub(crate) fn record_failure(&self, command: &str, err: AppError) -> AppError {
        self.error_log.log_error(command, &err.to_string());
        err
    }
}

pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/page/:id/:type/:from/:to", get(episodes::get_page))
        .route(
            "/page/:id/:type/:from/:to/:name",
            get(episodes::get_page_with_title),
        )
        .route("/num_of_pages/:num", get(episodes::get_num_of_pages))
        .route(
            "/characters_of_episode/:id",
            get(characters::get_characters_of_episode),
        )
        .route("/diagnostics", get(diagnostics::get_diagnostics));

    let mut router = Router::new()
        .nest("/api", api)
        .route("/health", get(diagnostics::health));

    if let Some(dir) = static_dir {
        log::info!("Serving static files from {:?}", dir);
        let index = ServeFile::new(dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(dir).not_found_service(index));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Parse a path segment as a whole integer, naming the parameter on failure.
pub(crate) fn parse_int(name: &str, raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| format!("{} must be an integer (got {:?})", name, raw))
}
