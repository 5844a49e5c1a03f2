//! Configuration module for msgdrive.

use serde::Deserialize;
use std::path::Path;

use crate::{DriveError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins (empty = any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_size() -> u64 {
    50
}

impl ServerConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Blob store adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobBackend {
    /// Directories on local disk.
    Local,
    /// Process memory (lost on exit).
    Memory,
    /// Discard bytes; downloads use the fallback policy.
    Null,
}

/// How uploads are spread over containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Every file goes to the default container.
    Shared,
    /// Each folder created gets its own container.
    PerFolder,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the metadata document.
    #[serde(default = "default_metadata_path")]
    pub metadata_path: String,
    /// Path to the container map document.
    #[serde(default = "default_containers_path")]
    pub containers_path: String,
    /// Blob store adapter.
    #[serde(default = "default_backend")]
    pub backend: BlobBackend,
    /// Base directory for the local adapter.
    #[serde(default = "default_blob_path")]
    pub blob_path: String,
    /// Container isolation mode for new folders.
    #[serde(default = "default_isolation")]
    pub isolation: Isolation,
    /// Label given to the default container when it is created.
    #[serde(default = "default_container_label")]
    pub default_container_label: String,
}

fn default_metadata_path() -> String {
    "data/drive_db.json".to_string()
}

fn default_containers_path() -> String {
    "data/containers.json".to_string()
}

fn default_backend() -> BlobBackend {
    BlobBackend::Local
}

fn default_blob_path() -> String {
    "data/blobs".to_string()
}

fn default_isolation() -> Isolation {
    Isolation::PerFolder
}

fn default_container_label() -> String {
    "Drive Storage".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            metadata_path: default_metadata_path(),
            containers_path: default_containers_path(),
            backend: default_backend(),
            blob_path: default_blob_path(),
            isolation: default_isolation(),
            default_container_label: default_container_label(),
        }
    }
}

/// How far a folder delete reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeMode {
    /// Only files directly inside the folder.
    Flat,
    /// Descendant folders and their files as well.
    Recursive,
}

/// What a download returns when the blob store cannot deliver the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadFallback {
    /// Generated placeholder text.
    Placeholder,
    /// A `StorageUnavailable` error.
    Fail,
}

/// Lifecycle engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    #[serde(default = "default_cascade")]
    pub cascade: CascadeMode,
    #[serde(default = "default_download_fallback")]
    pub download_fallback: DownloadFallback,
    /// Window of the recent-files listing, in minutes.
    #[serde(default = "default_recent_window")]
    pub recent_window_minutes: i64,
    /// Maximum number of recent files listed.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_cascade() -> CascadeMode {
    CascadeMode::Flat
}

fn default_download_fallback() -> DownloadFallback {
    DownloadFallback::Placeholder
}

fn default_recent_window() -> i64 {
    30
}

fn default_recent_limit() -> usize {
    10
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            cascade: default_cascade(),
            download_fallback: default_download_fallback(),
            recent_window_minutes: default_recent_window(),
            recent_limit: default_recent_limit(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// JWT secret key (must be set).
    #[serde(default)]
    pub jwt_secret: String,
    /// Bearer token validity in days (at most 30).
    #[serde(default = "default_token_ttl")]
    pub token_ttl_days: u64,
    /// Oldest identity assertion accepted at login, in seconds.
    #[serde(default = "default_max_claim_age")]
    pub max_claim_age_secs: i64,
}

fn default_token_ttl() -> u64 {
    30
}

fn default_max_claim_age() -> i64 {
    86400 // 24 hours
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_days: default_token_ttl(),
            max_claim_age_secs: default_max_claim_age(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/msgdrive.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DriveError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DriveError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `MSGDRIVE_JWT_SECRET`: Override the JWT secret key
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("MSGDRIVE_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(DriveError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via MSGDRIVE_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.drive.recent_window_minutes <= 0 {
            return Err(DriveError::Config(
                "recent_window_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
