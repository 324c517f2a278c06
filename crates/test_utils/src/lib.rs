//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! invoice pipeline test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built invoices, identifiers and a pinned clock
//! - `builders`: Builder patterns for test data construction
//! - `assertions`: Custom assertion helpers for issues and errors
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
