//! Ports for external collaborators
//!
//! The pipeline consumes a product catalog that resolves a matched product
//! name to the ERP product GUID. Fuzzy matching and catalog storage live
//! outside this workspace; only the port is defined here.

use async_trait::async_trait;
use thiserror::Error;

/// Error type for port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// The external system is unavailable
    #[error("Service unavailable: {service}")]
    ServiceUnavailable {
        service: String,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Resolves product names to ERP product GUIDs
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns the GUID for a product name, or `None` when it is unknown
    async fn resolve_product_id(&self, name: &str) -> Result<Option<String>, PortError>;
}
