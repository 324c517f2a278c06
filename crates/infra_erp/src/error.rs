//! ERP client errors

use thiserror::Error;

use core_kernel::{CoreError, PortError};

/// Failure class of an [`ErpError`]
///
/// `Validation` and `Auth` are permanent for the given input; `Http` covers
/// transport and status failures that survived the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErpErrorKind {
    Validation,
    Http,
    Auth,
    Config,
}

/// Errors that can occur while preparing or submitting an invoice
#[derive(Debug, Error)]
pub enum ErpError {
    /// Invoice rejected locally or by the server
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure or unexpected status after retries
    #[error("{message}")]
    Http {
        status: Option<u16>,
        request_id: Option<String>,
        message: String,
    },

    /// Token could not be obtained
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Client settings missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error raised by a core collaborator such as the product catalog
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ErpError {
    pub fn validation(message: impl Into<String>) -> Self {
        ErpError::Validation(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        ErpError::Auth(message.into())
    }

    /// HTTP status failure, carrying the server's request id when present
    pub fn status(status: u16, request_id: Option<String>) -> Self {
        let message = format!(
            "HTTP error {}, Request-ID: {}",
            status,
            request_id.as_deref().unwrap_or("unknown")
        );
        ErpError::Http {
            status: Some(status),
            request_id,
            message,
        }
    }

    /// Connection or timeout failure
    pub fn network(err: impl std::fmt::Display) -> Self {
        ErpError::Http {
            status: None,
            request_id: None,
            message: format!("Network error: {}", err),
        }
    }

    pub fn kind(&self) -> ErpErrorKind {
        match self {
            ErpError::Validation(_) => ErpErrorKind::Validation,
            ErpError::Http { .. } => ErpErrorKind::Http,
            ErpError::Auth(_) => ErpErrorKind::Auth,
            ErpError::Config(_) => ErpErrorKind::Config,
            ErpError::Core(CoreError::Port(port)) if port.is_not_found() => ErpErrorKind::Validation,
            ErpError::Core(CoreError::Port(_)) => ErpErrorKind::Http,
        }
    }

    /// HTTP status code, if the failure carried one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ErpError::Http { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<PortError> for ErpError {
    fn from(err: PortError) -> Self {
        ErpError::Core(CoreError::Port(err))
    }
}

impl From<config::ConfigError> for ErpError {
    fn from(err: config::ConfigError) -> Self {
        ErpError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for ErpError {
    fn from(err: reqwest::Error) -> Self {
        ErpError::network(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = ErpError::status(503, Some("req-42".into()));
        assert_eq!(err.to_string(), "HTTP error 503, Request-ID: req-42");
        assert_eq!(err.kind(), ErpErrorKind::Http);
        assert_eq!(err.status_code(), Some(503));

        let err = ErpError::status(500, None);
        assert_eq!(err.to_string(), "HTTP error 500, Request-ID: unknown");
    }

    #[test]
    fn test_port_error_kinds() {
        let missing: ErpError = PortError::not_found("Product", "Tomato").into();
        assert_eq!(missing.kind(), ErpErrorKind::Validation);

        let down: ErpError = PortError::ServiceUnavailable { service: "catalog".into() }.into();
        assert_eq!(down.kind(), ErpErrorKind::Http);
    }

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(ErpError::validation("x").kind(), ErpErrorKind::Validation);
        assert_eq!(ErpError::auth("x").kind(), ErpErrorKind::Auth);
        assert_eq!(ErpError::Config("x".into()).kind(), ErpErrorKind::Config);
        assert_eq!(ErpError::network("refused").kind(), ErpErrorKind::Http);
    }
}
