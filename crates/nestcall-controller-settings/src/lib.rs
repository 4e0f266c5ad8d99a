//! Application settings, loaded from a TOML file with `NESTCALL_CTRL_*` environment
//! overrides (spec §9 ambient configuration).
//!
//! Nested fields are separated by a double underscore, e.g. `NESTCALL_CTRL_HTTP__PORT=8080`
//! overrides `http.port`.

mod settings_error;
mod settings_provider;

use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

pub use settings_error::SettingsError;
pub use settings_provider::SettingsProvider;

pub type Result<T, E = SettingsError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub ice: Ice,
    #[serde(default)]
    pub recording_queue: RecordingQueue,
    #[serde(default)]
    pub signaling: Signaling,
    #[serde(default)]
    pub recorder: Recorder,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub metrics: Metrics,
}

impl Settings {
    /// Load settings from `file_name`, applying `NESTCALL_CTRL_*` environment
    /// overrides on top.
    pub fn load(file_name: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::new(file_name, FileFormat::Toml))
            .add_source(Environment::with_prefix("NESTCALL_CTRL").prefix_separator("_").separator("__"))
            .build()?;

        serde_path_to_error::deserialize(config).map_err(|source| SettingsError::DeserializeConfig {
            file_name: file_name.to_owned(),
            source: Box::new(source),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Http {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: Option<HttpTls>,
    /// Origins allowed by the `actix-cors` layer. Empty means same-origin only.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            tls: None,
            allowed_origins: Vec::new(),
        }
    }
}

const fn default_http_port() -> u16 {
    8790
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HttpTls {
    pub certificate: PathBuf,
    pub private_key: PathBuf,
}

/// ICE server configuration handed out by `IceConfigProvider` (spec §4.2).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Ice {
    #[serde(default)]
    pub stun_urls: Vec<String>,
    #[serde(default)]
    pub turn: Option<Turn>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Turn {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

/// `RecordingQueue` tuning (spec §4.6).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordingQueue {
    #[serde(default = "default_max_concurrent_recordings")]
    pub max_concurrent: usize,
    /// The member id notified when the queue is under pressure. Left unset in
    /// environments that do not wire up a real `Notifier`.
    #[serde(default)]
    pub alert_recipient_member_id: Option<uuid::Uuid>,
    /// How long a queue entry may sit idle before `sweep` drops it.
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,
    /// How often the background sweep task runs.
    #[serde(default = "default_queue_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
    /// Minimum time between two pressure alerts.
    #[serde(default = "default_queue_alert_cooldown_ms")]
    pub alert_cooldown_ms: u64,
}

impl Default for RecordingQueue {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent_recordings(),
            alert_recipient_member_id: None,
            queue_timeout_ms: default_queue_timeout_ms(),
            cleanup_interval_ms: default_queue_cleanup_interval_ms(),
            alert_cooldown_ms: default_queue_alert_cooldown_ms(),
        }
    }
}

fn default_max_concurrent_recordings() -> usize {
    10
}

const fn default_queue_timeout_ms() -> u64 {
    600_000
}

const fn default_queue_cleanup_interval_ms() -> u64 {
    30_000
}

const fn default_queue_alert_cooldown_ms() -> u64 {
    300_000
}

/// The ephemeral signaling relay's tuning (spec §4.1).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Signaling {
    /// How long a deposited signal waits in a mailbox before `sweep` discards it.
    #[serde(default = "default_signal_ttl_ms")]
    pub ttl_ms: u64,
    /// How often the background sweep task runs.
    #[serde(default = "default_signal_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for Signaling {
    fn default() -> Self {
        Self {
            ttl_ms: default_signal_ttl_ms(),
            sweep_interval_ms: default_signal_sweep_interval_ms(),
        }
    }
}

const fn default_signal_ttl_ms() -> u64 {
    5 * 60 * 1000
}

const fn default_signal_sweep_interval_ms() -> u64 {
    30_000
}

/// The `RecorderBackend` HTTP client (spec §4.7, §6).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Recorder {
    /// Base URL of the external ghost-recorder backend.
    #[serde(default = "default_recorder_backend_base_url")]
    pub backend_base_url: String,
    #[serde(default = "default_recorder_start_timeout_ms")]
    pub start_timeout_ms: u64,
    #[serde(default = "default_recorder_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
    #[serde(default = "default_recorder_status_timeout_ms")]
    pub status_timeout_ms: u64,
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            backend_base_url: default_recorder_backend_base_url(),
            start_timeout_ms: default_recorder_start_timeout_ms(),
            stop_timeout_ms: default_recorder_stop_timeout_ms(),
            status_timeout_ms: default_recorder_status_timeout_ms(),
        }
    }
}

fn default_recorder_backend_base_url() -> String {
    "http://localhost:9200".to_owned()
}

/// spec §5 "RecorderBackend start carries a 60 s deadline".
const fn default_recorder_start_timeout_ms() -> u64 {
    60_000
}

const fn default_recorder_stop_timeout_ms() -> u64 {
    30_000
}

const fn default_recorder_status_timeout_ms() -> u64 {
    5_000
}

/// This service's own externally reachable address, handed to the
/// `RecorderBackend` so it knows where to post signaling and ingest callbacks
/// (spec §4.7 `apiBase`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Api {
    #[serde(default = "default_api_public_base_url")]
    pub public_base_url: String,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            public_base_url: default_api_public_base_url(),
        }
    }
}

fn default_api_public_base_url() -> String {
    "http://localhost:8790".to_owned()
}

/// The shared secret used both to verify an `Identity`'s bearer JWT and to mint the
/// short-lived callback token handed to the `RecorderBackend` so it can reach back
/// into this service's own API (spec §4.7 `callbackAuth`).
#[derive(Clone, PartialEq, Deserialize)]
pub struct Auth {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth").field("jwt_secret", &"<redacted>").finish()
    }
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
        }
    }
}

fn default_jwt_secret() -> String {
    "insecure-development-secret-change-me".to_owned()
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Logging {
    pub default_directives: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Metrics {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::Write as _};

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    const MINIMUM_CONFIG_TOML: &str = r#"
        [http]
        port = 9000
        "#;

    #[test]
    fn load_minimal_applies_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nestcall.toml");
        {
            let mut file = File::create(&path).unwrap();
            writeln!(file, "{MINIMUM_CONFIG_TOML}").unwrap();
        }

        let settings = Settings::load(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.http.port, 9000);
        assert_eq!(settings.recording_queue.max_concurrent, 10);
        assert!(settings.metrics.enabled);
    }

    #[test]
    fn env_vars_override_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nestcall.toml");
        {
            let mut file = File::create(&path).unwrap();
            writeln!(file, "{MINIMUM_CONFIG_TOML}").unwrap();
        }

        std::env::set_var("NESTCALL_CTRL_HTTP__PORT", "9100");
        let settings = Settings::load(path.to_str().unwrap()).unwrap();
        std::env::remove_var("NESTCALL_CTRL_HTTP__PORT");

        assert_eq!(settings.http.port, 9100);
    }

    #[test]
    fn malformed_file_fails_to_build() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        {
            let mut file = File::create(&path).unwrap();
            writeln!(file, "this is not valid = = toml").unwrap();
        }

        let err = Settings::load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, SettingsError::BuildConfig { .. }));
    }

    #[test]
    fn wrong_type_fails_to_deserialize() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wrong_type.toml");
        {
            let mut file = File::create(&path).unwrap();
            writeln!(file, "[http]\nport = \"not-a-number\"").unwrap();
        }

        let err = Settings::load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, SettingsError::DeserializeConfig { .. }));
    }
}
