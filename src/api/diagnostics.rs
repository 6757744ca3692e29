use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::AppState;
use crate::database::CatalogStats;

/// Recent request failures, oldest dropped first.
pub struct ErrorLog {
    errors: Mutex<VecDeque<ErrorEntry>>,
    max_entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub timestamp: String,
    pub command: String,
    pub error: String,
}

impl ErrorLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            errors: Mutex::new(VecDeque::new()),
            max_entries,
        }
    }

    pub fn log_error(&self, command: &str, error: &str) {
        let entry = ErrorEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: command.to_string(),
            error: error.to_string(),
        };

        log::error!("[{}] {}: {}", entry.timestamp, command, error);

        // A poisoned log is still a usable log
        let mut errors = self.errors.lock().unwrap_or_else(|p| p.into_inner());
        if errors.len() >= self.max_entries {
            errors.pop_front();
        }
        errors.push_back(entry);
    }

    pub fn get_errors(&self) -> Vec<ErrorEntry> {
        self.errors
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct DiagnosticsReport {
    pub app_version: String,
    pub database_status: String,
    pub stats: CatalogStats,
    pub uptime_seconds: u64,
    pub recent_errors: Vec<ErrorEntry>,
}

/// GET /api/diagnostics
pub async fn get_diagnostics(State(state): State<AppState>) -> Json<DiagnosticsReport> {
    let db = state.db.clone();
    let (database_status, stats) = match tokio::task::spawn_blocking(move || db.get_stats()).await
    {
        Ok(Ok(stats)) => ("OK".to_string(), stats),
        Ok(Err(e)) => (format!("ERROR: {}", e), CatalogStats::default()),
        Err(e) => (format!("ERROR: {}", e), CatalogStats::default()),
    };

    Json(DiagnosticsReport {
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        database_status,
        stats,
        uptime_seconds: state.started_at.elapsed().as_secs(),
        recent_errors: state.error_log.get_errors(),
    })
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_log_is_bounded() {
        let log = ErrorLog::new(2);
        log.log_error("a", "first");
        log.log_error("b", "second");
        log.log_error("c", "third");
        let commands: Vec<String> = log.get_errors().into_iter().map(|e| e.command).collect();
        assert_eq!(commands, vec!["b", "c"]);
    }
}
