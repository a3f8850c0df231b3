//! Client configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is read first when present.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use prohero_application::session::{LogoutPolicy, ParseLogoutPolicyError};
use url::Url;

/// Base URL of the production API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.bookapro.com";

/// Variable holding the API base URL.
pub const API_BASE_URL_VAR: &str = "PROHERO_API_BASE_URL";
/// Variable holding the directory for the store files.
pub const DATA_DIR_VAR: &str = "PROHERO_DATA_DIR";
/// Variable holding the request timeout in seconds.
pub const REQUEST_TIMEOUT_VAR: &str = "PROHERO_REQUEST_TIMEOUT_SECS";
/// Variable holding the logout policy.
pub const LOGOUT_POLICY_VAR: &str = "PROHERO_LOGOUT_POLICY";

const SECURE_STORE_FILE: &str = "secure.json";
const LOCAL_STORE_FILE: &str = "local.json";

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// API base URL (http or https).
    pub api_base_url: Url,
    /// Directory holding the store files.
    pub data_dir: PathBuf,
    /// Per-request timeout; `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
    /// Whether logout is refused while on duty.
    pub logout_policy: LogoutPolicy,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set to an invalid value or no data
    /// directory can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_base_url = parse_base_url(
            &read(API_BASE_URL_VAR).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        )?;

        let data_dir = match read(DATA_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("prohero"),
        };

        let request_timeout = read(REQUEST_TIMEOUT_VAR)
            .map(|value| {
                value
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::InvalidNumber {
                        var: REQUEST_TIMEOUT_VAR,
                        value,
                    })
            })
            .transpose()?;

        let logout_policy = read(LOGOUT_POLICY_VAR)
            .map(|value| value.parse::<LogoutPolicy>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            api_base_url,
            data_dir,
            request_timeout,
            logout_policy,
        })
    }

    /// Replaces the API base URL.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` unless `raw` is an absolute http(s) URL.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.api_base_url = parse_base_url(raw.trim())?;
        Ok(self)
    }

    /// Replaces the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// The base URL as joined onto endpoint paths, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.api_base_url.as_str().trim_end_matches('/').to_string()
    }

    /// File backing the secure store (tokens and cached user).
    #[must_use]
    pub fn secure_store_path(&self) -> PathBuf {
        self.data_dir.join(SECURE_STORE_FILE)
    }

    /// File backing the local store (duty status).
    #[must_use]
    pub fn local_store_path(&self) -> PathBuf {
        self.data_dir.join(LOCAL_STORE_FILE)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            value: raw.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }
    Ok(url)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The API base URL is not an absolute http(s) URL.
    #[error("invalid PROHERO_API_BASE_URL '{value}': {reason}")]
    InvalidUrl {
        /// Rejected value.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// A numeric variable did not parse.
    #[error("invalid {var} '{value}': expected a whole number")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },

    /// The logout policy name is unknown.
    #[error(transparent)]
    InvalidLogoutPolicy(#[from] ParseLogoutPolicyError),

    /// No data directory was configured and the platform has none.
    #[error("cannot determine a data directory; set PROHERO_DATA_DIR")]
    NoDataDir,
}
