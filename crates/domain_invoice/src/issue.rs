//! Validation issues
//!
//! Every stage reports what it found or fixed as an [`Issue`]. Issues are
//! append-only: once pushed onto an invoice or line they are never edited.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// `quantity × unit_price` does not match `line_amount` and no repair fits
    ArithmeticError,
    /// A missing or rescaled field was recomputed from the other two
    ArithmeticFix,
    /// Unit price lost a trailing zero
    PriceZeroLost,
    /// Unit price gained a trailing zero
    PriceExtraZero,
    /// Quantity lost its decimal point
    QtyDecimalMissed,
    PriceTooLow,
    PriceTooHigh,
    /// Price outside the typical range but within absolute bounds
    PriceAtypical,
    PriceNegative,
    QtyNegative,
    QtyTooLarge,
    NameMissing,
    NameTooShort,
    UnitMismatch,
    UnitFixed,
    UnitInvalid,
    DateFuture,
    DateInvalid,
    SupplierMissing,
    SupplierTooShort,
    InvoiceNumberInvalid,
    DuplicatePositions,
    ValidationError,
}

impl IssueKind {
    /// Wire code of the kind, e.g. `PRICE_ZERO_LOST`
    pub fn code(&self) -> &'static str {
        match self {
            IssueKind::ArithmeticError => "ARITHMETIC_ERROR",
            IssueKind::ArithmeticFix => "ARITHMETIC_FIX",
            IssueKind::PriceZeroLost => "PRICE_ZERO_LOST",
            IssueKind::PriceExtraZero => "PRICE_EXTRA_ZERO",
            IssueKind::QtyDecimalMissed => "QTY_DECIMAL_MISSED",
            IssueKind::PriceTooLow => "PRICE_TOO_LOW",
            IssueKind::PriceTooHigh => "PRICE_TOO_HIGH",
            IssueKind::PriceAtypical => "PRICE_ATYPICAL",
            IssueKind::PriceNegative => "PRICE_NEGATIVE",
            IssueKind::QtyNegative => "QTY_NEGATIVE",
            IssueKind::QtyTooLarge => "QTY_TOO_LARGE",
            IssueKind::NameMissing => "NAME_MISSING",
            IssueKind::NameTooShort => "NAME_TOO_SHORT",
            IssueKind::UnitMismatch => "UNIT_MISMATCH",
            IssueKind::UnitFixed => "UNIT_FIXED",
            IssueKind::UnitInvalid => "UNIT_INVALID",
            IssueKind::DateFuture => "DATE_FUTURE",
            IssueKind::DateInvalid => "DATE_INVALID",
            IssueKind::SupplierMissing => "SUPPLIER_MISSING",
            IssueKind::SupplierTooShort => "SUPPLIER_TOO_SHORT",
            IssueKind::InvoiceNumberInvalid => "INVOICE_NUMBER_INVALID",
            IssueKind::DuplicatePositions => "DUPLICATE_POSITIONS",
            IssueKind::ValidationError => "VALIDATION_ERROR",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How much attention an issue needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single finding about an invoice or one of its lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// 1-based line index, `None` for header or invoice-wide findings
    #[serde(rename = "line", skip_serializing_if = "Option::is_none")]
    pub line_ref: Option<usize>,
    pub message: String,
    pub severity: Severity,
    /// Original value before a fix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<String>,
    /// Value applied or proposed by a fix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl Issue {
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            line_ref: None,
            message: message.into(),
            severity,
            old: None,
            fix: None,
        }
    }

    pub fn info(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, message)
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warning, message)
    }

    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, message)
    }

    /// Scopes the issue to a line
    pub fn on_line(mut self, index: usize) -> Self {
        self.line_ref = Some(index);
        self
    }

    /// Records the original and corrected values
    pub fn with_change(mut self, old: impl ToString, fix: impl ToString) -> Self {
        self.old = Some(old.to_string());
        self.fix = Some(fix.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_kind_serializes_as_code() {
        let json = serde_json::to_string(&IssueKind::PriceZeroLost).unwrap();
        assert_eq!(json, "\"PRICE_ZERO_LOST\"");
        assert_eq!(IssueKind::DuplicatePositions.to_string(), "DUPLICATE_POSITIONS");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_issue_builder() {
        let issue = Issue::info(IssueKind::PriceZeroLost, "fixed")
            .on_line(2)
            .with_change("25000", "250000");
        assert_eq!(issue.line_ref, Some(2));
        assert_eq!(issue.old.as_deref(), Some("25000"));
        assert_eq!(issue.fix.as_deref(), Some("250000"));
        assert_eq!(issue.severity, Severity::Info);
    }
}
