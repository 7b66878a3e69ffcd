//! Configuration types for alertbox

use crate::types::{AutoDelete, AutoDownload};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration
///
/// Every field has a default, so an empty document is a valid configuration.
/// The `api` section is flattened to the top level.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Record store location
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Attachment content location
    #[serde(default)]
    pub content: ContentConfig,

    /// Download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Retention sweep behavior
    #[serde(default)]
    pub retention: RetentionConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Check values that would otherwise fail at runtime
    pub fn validate(&self) -> Result<()> {
        if self.download.progress_interval.is_zero() {
            return Err(Error::Config {
                message: "progress interval must be greater than zero".to_string(),
                key: Some("download.progress_interval".to_string()),
            });
        }
        if self.download.idle_timeout.is_zero() {
            return Err(Error::Config {
                message: "idle timeout must be greater than zero".to_string(),
                key: Some("download.idle_timeout".to_string()),
            });
        }
        if self.retention.enabled && self.retention.sweep_interval.is_zero() {
            return Err(Error::Config {
                message: "sweep interval must be greater than zero".to_string(),
                key: Some("retention.sweep_interval".to_string()),
            });
        }
        Ok(())
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./alertbox.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Attachment content storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ContentConfig {
    /// Directory holding downloaded attachments (default: "./attachments")
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
        }
    }
}

/// Attachment download configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Automatic download policy applied on first start (default: up to 1 MiB)
    ///
    /// Afterwards the persisted setting is authoritative.
    #[serde(default)]
    pub auto_download: AutoDownload,

    /// Minimum time between persisted progress updates (default: 500 ms)
    #[serde(default = "default_progress_interval", with = "duration_millis_serde")]
    #[schema(value_type = u64)]
    pub progress_interval: Duration,

    /// Time allowed for a source to answer with response headers (default: 300 seconds)
    ///
    /// The body is not covered; a long transfer runs as long as data keeps arriving.
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub fetch_timeout: Duration,

    /// Longest gap between body chunks before a transfer fails (default: 60 seconds)
    #[serde(default = "default_idle_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub idle_timeout: Duration,

    /// Time allowed to establish a connection (default: 30 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub connect_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            auto_download: AutoDownload::default(),
            progress_interval: default_progress_interval(),
            fetch_timeout: default_fetch_timeout(),
            idle_timeout: default_idle_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Retention configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetentionConfig {
    /// Automatic soft-deletion policy applied on first start (default: 30 days)
    ///
    /// Afterwards the persisted setting is authoritative.
    #[serde(default)]
    pub auto_delete: AutoDelete,

    /// Run the periodic sweep (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time between sweeps (default: 24 hours)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub sweep_interval: Duration,

    /// Minimum age of unreferenced content before it is removed (default: 1 hour)
    #[serde(default = "default_orphan_grace", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub orphan_grace: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            auto_delete: AutoDelete::default(),
            enabled: true,
            sweep_interval: default_sweep_interval(),
            orphan_grace: default_orphan_grace(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Optional API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./alertbox.db")
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("./attachments")
}

fn default_true() -> bool {
    true
}

fn default_progress_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(24 * 60 * 60) // daily
}

fn default_orphan_grace() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.persistence.database_path, PathBuf::from("./alertbox.db"));
        assert_eq!(config.content.content_dir, PathBuf::from("./attachments"));
        assert_eq!(config.download.progress_interval, Duration::from_millis(500));
        assert_eq!(config.download.idle_timeout, Duration::from_secs(60));
        assert_eq!(
            config.download.auto_download,
            AutoDownload::UpTo {
                max_bytes: 1024 * 1024
            }
        );
        assert_eq!(
            config.retention.auto_delete,
            AutoDelete::After {
                seconds: 30 * 24 * 60 * 60
            }
        );
        assert!(config.retention.enabled);
        assert_eq!(config.server.api.bind_address.port(), 6790);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn durations_use_seconds_and_millis() {
        let json = r#"{
            "download": { "progress_interval": 250, "fetch_timeout": 60, "idle_timeout": 15 },
            "retention": { "sweep_interval": 3600, "auto_delete": { "mode": "never" } }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.download.progress_interval, Duration::from_millis(250));
        assert_eq!(config.download.fetch_timeout, Duration::from_secs(60));
        assert_eq!(config.download.idle_timeout, Duration::from_secs(15));
        assert_eq!(config.retention.sweep_interval, Duration::from_secs(3600));
        assert_eq!(config.retention.auto_delete, AutoDelete::Never);

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["download"]["progress_interval"], 250);
        assert_eq!(value["retention"]["sweep_interval"], 3600);
    }

    #[test]
    fn api_section_is_flattened() {
        let json = r#"{ "api": { "api_key": "secret", "cors_enabled": false } }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.server.api.api_key.as_deref(), Some("secret"));
        assert!(!config.server.api.cors_enabled);
        assert!(config.server.api.swagger_ui);
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut config = Config::default();
        config.download.progress_interval = Duration::ZERO;
        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("download.progress_interval"));
            }
            other => panic!("expected config error, got {other:?}"),
        }

        let mut config = Config::default();
        config.retention.sweep_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config.retention.enabled = false;
        assert!(config.validate().is_ok());
    }
}
