//! ERP client configuration

use std::time::Duration;

use serde::Deserialize;

use crate::error::ErpError;

/// ERP connection settings
///
/// Loaded from `ERP_*` environment variables:
///
/// * `ERP_BASE_URL` - Server root, e.g. `https://erp.example.com:8080` (required)
/// * `ERP_LOGIN` - API user (required)
/// * `ERP_PASSWORD_SHA1` - Hex SHA-1 of the API password (required)
/// * `ERP_CONNECT_TIMEOUT_SECS` - Connect timeout (default: 5)
/// * `ERP_READ_TIMEOUT_SECS` - Read timeout (default: 25)
/// * `ERP_MAX_RETRIES` - Retries for gateway errors (default: 3)
/// * `ERP_TOKEN_LIFETIME_MINS` - Assumed token lifetime (default: 25)
/// * `ERP_TOKEN_REFRESH_THRESHOLD_MINS` - Refresh this close to expiry (default: 5)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ErpConfig {
    /// Server root URL
    pub base_url: String,
    /// API login
    pub login: String,
    /// SHA-1 hex digest of the API password
    pub password_sha1: String,
    /// Connect timeout in seconds
    pub connect_timeout_secs: f64,
    /// Read timeout in seconds
    pub read_timeout_secs: f64,
    /// Retries after the first attempt for 502/503/504 and network errors
    pub max_retries: u32,
    /// Token lifetime in minutes
    pub token_lifetime_mins: i64,
    /// Remaining lifetime at which a token is refreshed, in minutes
    pub token_refresh_threshold_mins: i64,
}

impl Default for ErpConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            login: String::new(),
            password_sha1: String::new(),
            connect_timeout_secs: 5.0,
            read_timeout_secs: 25.0,
            max_retries: 3,
            token_lifetime_mins: 25,
            token_refresh_threshold_mins: 5,
        }
    }
}

impl ErpConfig {
    /// Settings for the given server and credentials, other fields default
    pub fn new(
        base_url: impl Into<String>,
        login: impl Into<String>,
        password_sha1: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            login: login.into(),
            password_sha1: password_sha1.into(),
            ..Default::default()
        }
    }

    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, ErpError> {
        let config: ErpConfig = config::Config::builder()
            .add_source(config::Environment::with_prefix("ERP").try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the required settings are present
    pub fn validate(&self) -> Result<(), ErpError> {
        let missing: Vec<&str> = [
            ("ERP_BASE_URL", &self.base_url),
            ("ERP_LOGIN", &self.login),
            ("ERP_PASSWORD_SHA1", &self.password_sha1),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(ErpError::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }
        if self.connect_timeout_secs <= 0.0 || self.read_timeout_secs <= 0.0 {
            return Err(ErpError::Config("Timeouts must be positive".into()));
        }
        Ok(())
    }

    /// Server root without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout_secs)
    }

    /// Upper bound for one request, connect plus read
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout_secs + self.read_timeout_secs)
    }

    pub fn token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_lifetime_mins)
    }

    pub fn token_refresh_threshold(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_refresh_threshold_mins)
    }
}
