use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::Deserialize;
use url::Url;
use validator::Validate;

use crate::error::BunqError;

const DEFAULT_SETTINGS: &str = include_str!("../../../bunq-light.toml");

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Api {
    /// Base URL every endpoint path is resolved against. Must end with `/`.
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub user_agent: String,
    pub language: String,
    pub region: String,
    pub geolocation: String,
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Retry {
    pub default_delay_secs: u64,
    /// Total attempts allowed for one request while rate limited.
    /// `None` keeps retrying until the server lets the request through.
    #[validate(range(min = 1))]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub jitter_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Device {
    #[validate(length(min = 1))]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[validate(nested)]
    pub api: Api,
    #[validate(nested)]
    pub retry: Retry,
    #[validate(nested)]
    pub device: Device,
}

impl Settings {
    /// Load the embedded defaults with `BUNQ_LIGHT__*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::Configuration`] when the merged settings fail to
    /// parse or validate.
    pub fn new() -> Result<Self, Report<BunqError>> {
        Self::from_toml(DEFAULT_SETTINGS)
    }

    /// Parse settings from a TOML string, applying environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::Configuration`] on invalid TOML, missing fields or
    /// failed validation.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<BunqError>> {
        let environment = Environment::default()
            .prefix("BUNQ_LIGHT")
            .separator("__");

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let settings: Self = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .and_then(Config::try_deserialize)
            .change_context(BunqError::Configuration {
                message: "Failed to load settings".to_string(),
            })?;

        settings
            .validate()
            .change_context(BunqError::Configuration {
                message: "Settings validation failed".to_string(),
            })?;

        Ok(settings)
    }

    /// Parsed base URL for the API.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::Configuration`] if `api.base_url` is not a valid URL.
    pub fn base_url(&self) -> Result<Url, Report<BunqError>> {
        Url::parse(&self.api.base_url).change_context(BunqError::Configuration {
            message: format!("Invalid base_url: {}", self.api.base_url),
        })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}
