//! Core error types used across the workspace

use thiserror::Error;
use crate::ports::PortError;

/// Core error type for the kernel
///
/// Decimal and date failures stay local to the caller, which adds line
/// context; only collaborator failures cross crate boundaries as-is.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Port error: {0}")]
    Port(#[from] PortError),
}
