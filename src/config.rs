use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::files::CleanupPolicy;
use crate::report::ReportColumns;

/// Process-wide settings, built once at startup and shared read-only
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```json
/// {
///   "bind_addr": "0.0.0.0:8080",
///   "columns": { "include_time": false },
///   "cleanup": { "policy": "sweep", "age_limit_secs": 3600, "poll_interval_secs": 600 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the web server listens on
    pub bind_addr: String,

    /// Root of the contest platform's REST API, without a trailing slash
    pub api_base_url: String,

    /// Page size for both listing and leaderboard requests
    pub page_size: u32,

    /// Timeout applied to every outbound API request
    pub request_timeout_secs: u64,

    /// Where generated reports are written
    pub downloads_dir: PathBuf,

    /// Static assets served under `/static`
    pub static_dir: PathBuf,

    /// Which leaderboard columns go into the report
    pub columns: ReportColumns,

    /// How generated reports are removed
    pub cleanup: CleanupPolicy,

    /// Signing secret for flash cookies, at least 64 bytes.
    /// A random key is generated when unset.
    pub secret_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "127.0.0.1:5000".to_string(),
            api_base_url: "https://www.hackerrank.com/rest".to_string(),
            page_size: 100,
            request_timeout_secs: 30,
            downloads_dir: PathBuf::from("static/downloads"),
            static_dir: PathBuf::from("static/assets"),
            columns: ReportColumns::default(),
            cleanup: CleanupPolicy::default(),
            secret_key: None,
        }
    }
}

impl Config {
    /// Load a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Use the first command-line argument as a config path, or defaults
    pub fn from_args() -> Result<Self> {
        let args: Vec<String> = env::args().collect();

        match args.get(1) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Key used to sign flash cookies
    #[cfg(feature = "web")]
    pub fn signing_key(&self) -> Result<axum_extra::extract::cookie::Key> {
        use axum_extra::extract::cookie::Key;

        match &self.secret_key {
            Some(secret) => Key::try_from(secret.as_bytes()).map_err(|_| {
                AppError::Config("secret_key must be at least 64 bytes long".to_string())
            }),
            None => Ok(Key::generate()),
        }
    }
}
