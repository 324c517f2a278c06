//! Invoice domain errors
//!
//! Data-quality findings are never errors here; they become [`crate::Issue`]s.
//! These variants cover malformed input and configuration only.

use thiserror::Error;

/// Errors that can occur in the invoice domain
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Input document could not be decoded
    #[error("Malformed invoice document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Validation settings could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),
}
