//! ERP Infrastructure - submission of incoming invoices
//!
//! This crate turns a validated invoice into the ERP's incoming-invoice
//! document and delivers it:
//!
//! - [`InvoiceMapper`] resolves product GUIDs and builds the wire [`Invoice`]
//! - [`validate_invoice`] rejects malformed documents before any network call
//! - [`generate_invoice_xml`] writes the order-sensitive XML document
//! - [`ErpClient`] authenticates through an [`AuthSession`] and posts the
//!   document, retrying gateway errors with an injectable [`Backoff`]
//!
//! Every failure is an [`ErpError`] whose [`ErpErrorKind`] tells callers
//! whether it is worth retrying.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_erp::{ErpClient, ErpConfig};
//!
//! let client = ErpClient::new(ErpConfig::from_env()?)?;
//! client.send_invoice(invoice).await?;
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod validation;
pub mod xml;
pub mod auth;
pub mod retry;
pub mod client;
pub mod mapping;

pub use config::ErpConfig;
pub use error::{ErpError, ErpErrorKind};
pub use model::{Invoice, InvoiceItem};
pub use validation::validate_invoice;
pub use xml::{generate_invoice_xml, ImportResponse, NoSchemaValidation, XmlSchemaValidator};
pub use auth::{AuthSession, AuthToken, TokenState};
pub use retry::{is_retryable_status, Backoff, ExponentialBackoff, NoDelay};
pub use client::{ErpClient, ResultCallback};
pub use mapping::{InvoiceMapper, StaticProductCatalog, SubmissionTarget};
