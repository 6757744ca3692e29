use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_IMPORT_API_BASE: &str = "https://rickandmortyapi.com/api";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const APP_DIR_NAME: &str = "episode-catalog";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Directory holding a built web front end; served at `/` when set.
    pub static_dir: Option<PathBuf>,
    pub import_api_base: String,
    pub client_connect_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_data_dir().join("catalog.db"),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            static_dir: None,
            import_api_base: DEFAULT_IMPORT_API_BASE.to_string(),
            client_connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Load from `path` (or the default location), then apply overrides from
    /// the process environment and a `.env` file in the working directory.
    /// A missing config file means defaults.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides(|key| {
            std::env::var(key)
                .ok()
                .or_else(|| load_env_value(Path::new("."), key))
        })?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> AppResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid port value: {}", port)))?;
        }
        if let Some(host) = lookup("CATALOG_HOST") {
            self.host = host;
        }
        if let Some(db) = lookup("CATALOG_DATABASE") {
            self.database_path = PathBuf::from(db);
        }
        if let Some(dir) = lookup("CATALOG_STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> AppResult<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("Invalid bind address {}: {}", addr, e)))
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("config.yaml")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Load a value from the .env file by key name
pub fn load_env_value(project_dir: &Path, key: &str) -> Option<String> {
    let env_path = project_dir.join(".env");
    let prefix = format!("{}=", key);
    let content = std::fs::read_to_string(&env_path).ok()?;
    content.lines().find_map(|line| {
        let value = line
            .trim()
            .strip_prefix(&prefix)?
            .trim()
            .trim_matches('"')
            .trim_matches('\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}
