//! Invoice Domain - OCR invoice line correction and validation
//!
//! This crate takes invoice lines as extracted by an upstream OCR process and
//! repairs or flags the numeric recognition errors such extraction produces.
//!
//! # Stages
//!
//! The stages run in a fixed order over one invoice and never throw for
//! data-quality problems; every finding is recorded as an [`Issue`]:
//!
//! 1. [`ArithmeticCorrector`] reconciles `quantity × unit_price ≈ line_amount`
//!    and repairs lost or extra zeros and missed decimal points
//! 2. [`SanityValidator`] applies business rules to the header and lines
//! 3. [`ContextPriceValidator`] checks unit prices against category ranges
//!
//! [`ValidationPipeline`] sequences the three and returns a
//! [`ValidationReport`] with the corrected invoice and a flat issue list.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_invoice::{ParsedInvoice, ValidationPipeline};
//!
//! let invoice = ParsedInvoice::from_json(ocr_json)?;
//! let report = ValidationPipeline::default().run(invoice);
//!
//! for issue in &report.issues {
//!     println!("{}: {}", issue.kind, issue.message);
//! }
//! ```

pub mod issue;
pub mod model;
pub mod arithmetic;
pub mod sanity;
pub mod context_price;
pub mod pipeline;
pub mod error;

pub use issue::{Issue, IssueKind, Severity};
pub use model::{InvoiceHeader, InvoiceLine, LineField, ParsedInvoice};
pub use arithmetic::{
    ArithmeticConfig, ArithmeticCorrector, ArithmeticOutcome, DigitFix, FieldRecovery,
    RecoveryOutcome,
};
pub use sanity::{SanityConfig, SanityValidator};
pub use context_price::{
    Confidence, ContextPriceValidator, InvoiceContextReport, PriceCheck, PriceFinding,
    PriceRange, ProductCategory, SuggestedFix, CATEGORIES,
};
pub use pipeline::{PipelineConfig, ValidationPipeline, ValidationReport, ValidationStatus};
pub use error::InvoiceError;
