//! Validation pipeline
//!
//! Runs arithmetic correction, sanity rules and price context checks over
//! one invoice in that fixed order. Later stages see the values earlier
//! stages corrected. Nothing feeds back into an earlier stage.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use core_kernel::{Clock, SystemClock};

use crate::arithmetic::{ArithmeticConfig, ArithmeticCorrector};
use crate::context_price::{ContextPriceValidator, InvoiceContextReport};
use crate::error::InvoiceError;
use crate::issue::{Issue, Severity};
use crate::model::ParsedInvoice;
use crate::sanity::{SanityConfig, SanityValidator};

/// Settings for all pipeline stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest percentage error accepted as a rounding difference
    pub max_error_percent: Decimal,
    /// Relative tolerance when searching for missing or rescaled fields
    pub recovery_tolerance: Decimal,
    /// Quantities above this are flagged
    pub max_qty: Decimal,
    /// Prices below this are flagged
    pub min_price: Decimal,
    /// Apply fixes in place
    pub auto_fix: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let arithmetic = ArithmeticConfig::default();
        let sanity = SanityConfig::default();
        Self {
            max_error_percent: arithmetic.max_error_percent,
            recovery_tolerance: arithmetic.recovery_tolerance,
            max_qty: sanity.max_qty,
            min_price: sanity.min_price,
            auto_fix: true,
        }
    }
}

impl PipelineConfig {
    /// Loads settings from `VALIDATION_*` environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, InvoiceError> {
        let defaults = Self::default();
        let config = config::Config::builder()
            .set_default("max_error_percent", defaults.max_error_percent.to_string())?
            .set_default("recovery_tolerance", defaults.recovery_tolerance.to_string())?
            .set_default("max_qty", defaults.max_qty.to_string())?
            .set_default("min_price", defaults.min_price.to_string())?
            .set_default("auto_fix", defaults.auto_fix)?
            .add_source(config::Environment::with_prefix("VALIDATION").try_parsing(true))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn arithmetic(&self) -> ArithmeticConfig {
        ArithmeticConfig {
            max_error_percent: self.max_error_percent,
            recovery_tolerance: self.recovery_tolerance,
            auto_fix: self.auto_fix,
        }
    }

    pub fn sanity(&self) -> SanityConfig {
        SanityConfig {
            max_qty: self.max_qty,
            min_price: self.min_price,
            auto_fix: self.auto_fix,
        }
    }
}

/// Overall outcome, from the most severe issue raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Success,
    Warning,
    Error,
}

impl ValidationStatus {
    pub fn from_issues(issues: &[Issue]) -> Self {
        match issues.iter().map(|i| i.severity).max() {
            Some(Severity::Error) => ValidationStatus::Error,
            Some(Severity::Warning) => ValidationStatus::Warning,
            _ => ValidationStatus::Success,
        }
    }
}

/// Corrected invoice plus everything the stages found
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Invoice with fixes applied and issues attached to lines
    pub invoice: ParsedInvoice,
    /// All issues in stage order
    pub issues: Vec<Issue>,
    pub status: ValidationStatus,
    /// No error-severity issue and no implausible price
    pub validation_passed: bool,
    /// Number of lines changed by any stage
    pub auto_fixed_count: usize,
    pub price_context: InvoiceContextReport,
}

impl ValidationReport {
    pub fn issues_at_least(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.severity >= severity)
    }
}

/// Sequences the three validation stages
pub struct ValidationPipeline {
    arithmetic: ArithmeticCorrector,
    sanity: SanityValidator,
    price_context: ContextPriceValidator,
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl ValidationPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: PipelineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            arithmetic: ArithmeticCorrector::new(config.arithmetic()),
            sanity: SanityValidator::with_clock(config.sanity(), clock),
            price_context: ContextPriceValidator::default(),
        }
    }

    /// Replaces the price category table
    pub fn with_price_validator(mut self, validator: ContextPriceValidator) -> Self {
        self.price_context = validator;
        self
    }

    /// Validates and corrects one invoice
    #[instrument(skip_all, fields(lines = invoice.lines.len()))]
    pub fn run(&self, mut invoice: ParsedInvoice) -> ValidationReport {
        let mut issues = self.arithmetic.correct_invoice(&mut invoice);
        issues.extend(self.sanity.validate(&mut invoice));

        let price_context = self.price_context.validate_invoice_context(&invoice.lines);
        issues.extend(price_context.issues.iter().cloned());

        invoice.attach(&issues);

        let status = ValidationStatus::from_issues(&issues);
        let auto_fixed_count = invoice.lines.iter().filter(|l| l.auto_fixed).count();
        let validation_passed = status != ValidationStatus::Error && price_context.overall_valid;

        info!(
            issues = issues.len(),
            auto_fixed = auto_fixed_count,
            status = ?status,
            passed = validation_passed,
            "Invoice validated"
        );

        ValidationReport {
            invoice,
            issues,
            status,
            validation_passed,
            auto_fixed_count,
            price_context,
        }
    }

    /// Decodes OCR JSON and validates it
    pub fn run_json(&self, json: &str) -> Result<ValidationReport, InvoiceError> {
        Ok(self.run(ParsedInvoice::from_json(json)?))
    }
}
