//! Core Kernel - Foundational types shared by the invoice pipeline
//!
//! This crate provides the fundamental building blocks used across the workspace:
//! - Exact decimal helpers (half-up rounding, percentage error, OCR number parsing)
//! - Identifier helpers (GUID format checks, external ids, document numbers)
//! - Date parsing and an injectable clock
//! - Ports for external collaborators such as the product catalog

pub mod decimal;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use decimal::{
    round_half_up, percent_error, relative_difference, checked_mul, parse_ocr_number, DecimalError,
};
pub use temporal::{parse_invoice_date, Clock, SystemClock, FixedClock, TemporalError, DATE_FORMATS};
pub use identifiers::{is_guid, generate_external_id, generate_document_number, GUID_PATTERN};
pub use ports::{ProductCatalog, PortError};
pub use error::CoreError;
