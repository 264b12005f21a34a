//! Configuration types for media-cover-sync

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// HTTP client settings used for probing and downloading remote covers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_http_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Event worker settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum number of lifecycle events processed at once (default: 4)
    ///
    /// Events for the same entity are always processed one at a time,
    /// regardless of this value.
    #[serde(default = "default_max_concurrent_events")]
    pub max_concurrent_events: usize,

    /// Capacity of the inbound event queue (default: 256)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_events: default_max_concurrent_events(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Main configuration for [`MediaCoverService`](crate::MediaCoverService)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root directory of the local cover cache (default: "./MediaCover")
    #[serde(default = "default_cover_root")]
    pub cover_root: PathBuf,

    /// URL base path prefix for public cover URLs (default: "")
    ///
    /// Set this when the application is served under a sub-path, e.g. "/music".
    #[serde(default)]
    pub url_base: String,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Event worker settings
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Buffer size of the outbound event broadcast channel (default: 1000)
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cover_root: default_cover_root(),
            url_base: String::new(),
            http: HttpConfig::default(),
            worker: WorkerConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl Config {
    /// Parse a configuration from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.cover_root.as_os_str().is_empty() {
            return Err(config_error("cover_root must not be empty", "cover_root"));
        }

        let base = self.url_base.trim_end_matches('/');
        if !base.is_empty() && !base.starts_with('/') {
            return Err(config_error(
                "url_base must be empty or start with '/'",
                "url_base",
            ));
        }

        if self.http.timeout.is_zero() {
            return Err(config_error("http.timeout must be at least 1 second", "http.timeout"));
        }

        if self.worker.max_concurrent_events == 0 {
            return Err(config_error(
                "worker.max_concurrent_events must be at least 1",
                "worker.max_concurrent_events",
            ));
        }

        if self.worker.queue_capacity == 0 {
            return Err(config_error(
                "worker.queue_capacity must be at least 1",
                "worker.queue_capacity",
            ));
        }

        if self.event_channel_capacity == 0 {
            return Err(config_error(
                "event_channel_capacity must be at least 1",
                "event_channel_capacity",
            ));
        }

        Ok(())
    }

    /// URL base with any trailing slash removed
    pub fn normalized_url_base(&self) -> &str {
        self.url_base.trim_end_matches('/')
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_cover_root() -> PathBuf {
    PathBuf::from("./MediaCover")
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("media-cover-sync/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_concurrent_events() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_event_channel_capacity() -> usize {
    1000
}

// Duration serialization helper (whole seconds)
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
