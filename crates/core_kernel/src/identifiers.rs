//! Identifier helpers for ERP entity references
//!
//! The ERP addresses suppliers, stores, conceptions and products by GUID and
//! accepts caller-chosen external ids and document numbers. These helpers
//! check the GUID shape the ERP accepts and generate the identifiers the
//! client fills in when the caller leaves them out.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

/// GUID shape accepted by the ERP: 36 hex digits or dashes
pub const GUID_PATTERN: &str = r"^[0-9a-fA-F-]{36}$";

static GUID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(GUID_PATTERN).expect("GUID_REGEX should compile"));

/// Returns true if the value has the ERP GUID shape
pub fn is_guid(value: &str) -> bool {
    GUID_REGEX.is_match(value)
}

/// Generates a fresh external id for an ERP document
pub fn generate_external_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a document number of the form `AUTO-YYYYMMDD-XXXXXXXX`
///
/// The suffix is the first eight hex digits of a random UUID, upper-cased.
pub fn generate_document_number(date: NaiveDate) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("AUTO-{}-{}", date.format("%Y%m%d"), suffix)
}
