//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::ports::PortError;

#[test]
fn test_core_error_from_port_error() {
    let port_error = PortError::not_found("product", "beef tenderloin");
    assert!(port_error.is_not_found());

    let core_error: CoreError = port_error.into();
    assert!(matches!(core_error, CoreError::Port(_)));
    assert!(core_error.to_string().contains("beef tenderloin"));
}

#[test]
fn test_core_error_display() {
    let error: CoreError = PortError::ServiceUnavailable { service: "catalog".into() }.into();
    let display = format!("{}", error);

    assert!(display.starts_with("Port error: "));
    assert!(display.contains("catalog"));
}
