//! Authentication token lifecycle
//!
//! The ERP issues opaque session tokens from `GET /resto/api/auth`. A token
//! is cached with an assumed lifetime and refreshed once its remaining
//! lifetime drops to the refresh threshold:
//!
//! ```text
//! Absent ──fetch──▶ Valid ──time──▶ NearExpiry ──time──▶ Expired
//!                     ▲                 │                    │
//!                     └─────fetch───────┴────────fetch───────┘
//! ```
//!
//! The cached token sits behind an async mutex held across the fetch, so
//! concurrent callers sharing one session trigger at most one fetch.
//! A token the import endpoint refuses with 401 or 403 is dropped, putting
//! the session back in `Absent`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use core_kernel::{Clock, SystemClock};

use crate::config::ErpConfig;
use crate::error::ErpError;

/// A cached session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

/// Where a cached token is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Nothing cached
    Absent,
    /// Usable without a network call
    Valid,
    /// Unexpired but within the refresh threshold
    NearExpiry,
    /// Past its expiry
    Expired,
}

impl TokenState {
    pub fn needs_refresh(&self) -> bool {
        !matches!(self, TokenState::Valid)
    }
}

/// Token cache and fetch logic for one set of credentials
pub struct AuthSession {
    login: String,
    password_sha1: String,
    lifetime: Duration,
    refresh_threshold: Duration,
    clock: Arc<dyn Clock>,
    token: Mutex<Option<AuthToken>>,
}

impl AuthSession {
    pub fn new(config: &ErpConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &ErpConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            login: config.login.clone(),
            password_sha1: config.password_sha1.clone(),
            lifetime: config.token_lifetime(),
            refresh_threshold: config.token_refresh_threshold(),
            clock,
            token: Mutex::new(None),
        }
    }

    fn classify(&self, token: Option<&AuthToken>) -> TokenState {
        let Some(token) = token else {
            return TokenState::Absent;
        };
        let remaining = token.expires_at - self.clock.now();
        if remaining <= Duration::zero() {
            TokenState::Expired
        } else if remaining <= self.refresh_threshold {
            TokenState::NearExpiry
        } else {
            TokenState::Valid
        }
    }

    /// Current state of the cached token
    pub async fn state(&self) -> TokenState {
        let guard = self.token.lock().await;
        self.classify(guard.as_ref())
    }

    /// Drops the cached token so the next call fetches a fresh one
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    /// Returns a usable token, fetching a new one unless the cached one is valid
    ///
    /// Fetch failures are returned as [`ErpError::Auth`] and never retried.
    pub async fn token(&self, http: &reqwest::Client, base_url: &str) -> Result<String, ErpError> {
        let mut guard = self.token.lock().await;

        if let Some(cached) = guard.as_ref() {
            if !self.classify(Some(cached)).needs_refresh() {
                let remaining = cached.expires_at - self.clock.now();
                debug!(expires_in_mins = remaining.num_minutes(), "Using cached ERP token");
                return Ok(cached.value.clone());
            }
        }

        let value = self.fetch(http, base_url).await?;
        let token = AuthToken {
            value: value.clone(),
            expires_at: self.clock.now() + self.lifetime,
        };
        *guard = Some(token);

        info!(lifetime_mins = self.lifetime.num_minutes(), "Obtained new ERP token");
        Ok(value)
    }

    async fn fetch(&self, http: &reqwest::Client, base_url: &str) -> Result<String, ErpError> {
        let url = format!("{}/resto/api/auth", base_url);
        let response = http
            .get(&url)
            .query(&[("login", self.login.as_str()), ("pass", self.password_sha1.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Network error during token request");
                ErpError::auth(format!("Network error during authentication: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "Token request rejected");
            return Err(ErpError::auth(format!(
                "HTTP error during authentication: {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ErpError::auth(format!("Network error during authentication: {}", e)))?;
        let token = body.trim();
        if token.is_empty() {
            return Err(ErpError::auth("Empty token received from ERP"));
        }
        Ok(token.to_string())
    }
}
