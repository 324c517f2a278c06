//! Custom Test Assertions
//!
//! Provides assertion helpers for issues and ERP errors that print the
//! full finding list on failure.

use domain_invoice::{Issue, IssueKind, Severity};
use infra_erp::{ErpError, ErpErrorKind};

/// Returns the first issue of the given kind, panicking if there is none
pub fn assert_has_issue(issues: &[Issue], kind: IssueKind) -> &Issue {
    issues
        .iter()
        .find(|issue| issue.kind == kind)
        .unwrap_or_else(|| panic!("Expected {:?} among issues: {:#?}", kind, issues))
}

/// Asserts that no issue of the given kind was reported
pub fn assert_no_issue(issues: &[Issue], kind: IssueKind) {
    assert!(
        issues.iter().all(|issue| issue.kind != kind),
        "Unexpected {:?} among issues: {:#?}",
        kind,
        issues
    );
}

/// Asserts that an issue of the given kind exists with the given severity
/// and line
pub fn assert_issue_at<'a>(issues: &'a [Issue], kind: IssueKind, severity: Severity, line: usize) -> &'a Issue {
    issues
        .iter()
        .find(|i| i.kind == kind && i.severity == severity && i.line_ref == Some(line))
        .unwrap_or_else(|| {
            panic!(
                "Expected {:?} ({:?}) on line {} among issues: {:#?}",
                kind, severity, line, issues
            )
        })
}

/// Asserts that a result failed with the given error kind
pub fn assert_erp_error<T: std::fmt::Debug>(
    result: &Result<T, ErpError>,
    kind: ErpErrorKind,
) -> &ErpError {
    match result {
        Err(err) => {
            assert_eq!(err.kind(), kind, "Unexpected error kind for: {}", err);
            err
        }
        Ok(value) => panic!("Expected {:?} error, got Ok({:?})", kind, value),
    }
}
