//! Layered runtime settings.
//!
//! Built-in defaults, then an optional config file, then `AIRQ_*`
//! environment variables (`AIRQ_API__KEY`, `AIRQ_COLLECTION__CITY_LIMIT`).

use crate::error::{ProcessingError, Result};
use crate::fetch::{lookup_endpoint, RetryPolicy};
use crate::utils::constants::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

pub const ENV_PREFIX: &str = "AIRQ";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub api: ApiSettings,

    #[serde(default)]
    #[validate(nested)]
    pub collection: CollectionSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApiSettings {
    /// Required only by commands that call the API.
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default = "default_base_url")]
    #[validate(length(min = 1))]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CollectionSettings {
    #[serde(default = "default_max_attempts")]
    #[validate(range(min = 1, max = 20))]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base")]
    #[validate(range(min = 1.0, max = 10.0))]
    pub backoff_base: f64,

    #[serde(default = "default_timeout_retry_delay_ms")]
    pub timeout_retry_delay_ms: u64,

    #[serde(default = "default_inter_request_delay_ms")]
    pub inter_request_delay_ms: u64,

    #[serde(default = "default_city_limit")]
    #[validate(range(min = 1))]
    pub city_limit: usize,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_base() -> f64 {
    DEFAULT_BACKOFF_BASE
}

fn default_timeout_retry_delay_ms() -> u64 {
    DEFAULT_TIMEOUT_RETRY_DELAY_MS
}

fn default_inter_request_delay_ms() -> u64 {
    DEFAULT_INTER_REQUEST_DELAY_MS
}

fn default_city_limit() -> usize {
    DEFAULT_CITY_LIMIT
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base: default_backoff_base(),
            timeout_retry_delay_ms: default_timeout_retry_delay_ms(),
            inter_request_delay_ms: default_inter_request_delay_ms(),
            city_limit: default_city_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus the environment, then validate.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ProcessingError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        tracing::debug!(
            base_url = %settings.api.base_url,
            max_attempts = settings.collection.max_attempts,
            city_limit = settings.collection.city_limit,
            "Settings loaded"
        );
        Ok(settings)
    }

    /// The API key, or a configuration error when unset.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api.key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ProcessingError::Config(format!(
                "API key not configured; set api.key in the config file or {}_API__KEY",
                ENV_PREFIX
            ))),
        }
    }

    pub fn endpoint(&self) -> String {
        lookup_endpoint(&self.api.base_url)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.collection.max_attempts)
            .with_backoff_base(self.collection.backoff_base)
            .with_timeout_delay(Duration::from_millis(self.collection.timeout_retry_delay_ms))
            .with_request_timeout(Duration::from_secs(self.api.timeout_secs))
    }

    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.collection.inter_request_delay_ms)
    }
}
