//! Arithmetic reconciliation of invoice lines
//!
//! OCR routinely drops or duplicates a zero, or loses the decimal point in a
//! quantity. This module checks `quantity × unit_price ≈ line_amount` and, on
//! a mismatch, tries a fixed list of digit-error hypotheses. The first
//! hypothesis whose corrected line reconciles within 1% wins; later ones are
//! not tried.
//!
//! [`FieldRecovery`] covers the broader case: a line with one field missing
//! gets it derived from the other two, and a mismatched line that none of the
//! hypotheses explain is searched for a ×10 or ÷10 error in any field.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use core_kernel::decimal::{checked_div, checked_mul, is_effectively_zero, relative_difference};
use core_kernel::{percent_error, round_half_up};

use crate::issue::{Issue, IssueKind, Severity};
use crate::model::{InvoiceLine, LineField, ParsedInvoice};

/// Acceptance threshold for a corrected line, independent of the configured tolerance
const FIX_TOLERANCE_PERCENT: Decimal = dec!(1);

const TEN: Decimal = dec!(10);
const LOST_ZERO_PRICE_CEILING: Decimal = dec!(100000);
const EXTRA_ZERO_PRICE_FLOOR: Decimal = dec!(1000);

/// Arithmetic corrector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArithmeticConfig {
    /// Largest percentage error accepted as a rounding difference
    pub max_error_percent: Decimal,
    /// Relative tolerance used by [`FieldRecovery`]
    pub recovery_tolerance: Decimal,
    /// Apply fixes to the line; when false fixes are only proposed
    pub auto_fix: bool,
}

impl Default for ArithmeticConfig {
    fn default() -> Self {
        Self {
            max_error_percent: dec!(1.0),
            recovery_tolerance: dec!(0.01),
            auto_fix: true,
        }
    }
}

/// A recognized digit error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigitFix {
    /// Unit price is ten times too small
    PriceZeroLost,
    /// Quantity is ten times too large
    QtyDecimalMissed,
    /// Unit price is ten times too large
    PriceExtraZero,
}

impl DigitFix {
    pub fn kind(&self) -> IssueKind {
        match self {
            DigitFix::PriceZeroLost => IssueKind::PriceZeroLost,
            DigitFix::QtyDecimalMissed => IssueKind::QtyDecimalMissed,
            DigitFix::PriceExtraZero => IssueKind::PriceExtraZero,
        }
    }

    pub fn field(&self) -> LineField {
        match self {
            DigitFix::QtyDecimalMissed => LineField::Quantity,
            DigitFix::PriceZeroLost | DigitFix::PriceExtraZero => LineField::UnitPrice,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            DigitFix::PriceZeroLost => "Price lost a trailing zero",
            DigitFix::QtyDecimalMissed => "Quantity lost its decimal point",
            DigitFix::PriceExtraZero => "Price has an extra trailing zero",
        }
    }
}

/// Result of checking one line
#[derive(Debug, Clone, PartialEq)]
pub enum ArithmeticOutcome {
    /// A numeric field is missing; the line cannot be checked
    Incomplete,
    /// The line reconciles within tolerance
    Valid,
    /// A digit-error hypothesis explains the mismatch
    Fixed {
        fix: DigitFix,
        old: Decimal,
        new: Decimal,
    },
    /// Mismatch that no hypothesis explains
    Unresolved {
        expected: Decimal,
        error_percent: Decimal,
    },
    /// `quantity × unit_price` or the error percentage leaves the decimal range
    OutOfRange,
}

impl ArithmeticOutcome {
    /// True for lines that reconcile as given or after a fix
    pub fn is_valid(&self) -> bool {
        matches!(self, ArithmeticOutcome::Valid | ArithmeticOutcome::Fixed { .. })
    }
}

struct Operands {
    qty: Decimal,
    price: Decimal,
    amount: Decimal,
}

struct Candidate {
    fix: DigitFix,
    qty: Decimal,
    price: Decimal,
}

type Hypothesis = fn(&Operands) -> Option<Candidate>;

/// Digit-error hypotheses, tried in order
///
/// The quantity hypothesis precedes the extra-zero price hypothesis: a
/// quantity read ten times too large and a price read ten times too large
/// produce the same product, and for quantities above 10 the decimal point is
/// the likelier loss.
const HYPOTHESES: [Hypothesis; 3] = [lost_zero_in_price, missed_decimal_in_qty, extra_zero_in_price];

fn lost_zero_in_price(ops: &Operands) -> Option<Candidate> {
    let per_unit = checked_div(ops.amount, ops.qty).ok()?;
    (ops.price < LOST_ZERO_PRICE_CEILING && per_unit > LOST_ZERO_PRICE_CEILING).then(|| Candidate {
        fix: DigitFix::PriceZeroLost,
        qty: ops.qty,
        price: ops.price * TEN,
    })
}

fn missed_decimal_in_qty(ops: &Operands) -> Option<Candidate> {
    let units = checked_div(ops.amount, ops.price).ok()?;
    (ops.qty > TEN && units <= ops.qty / TEN).then(|| Candidate {
        fix: DigitFix::QtyDecimalMissed,
        qty: ops.qty / TEN,
        price: ops.price,
    })
}

fn extra_zero_in_price(ops: &Operands) -> Option<Candidate> {
    let per_unit = checked_div(ops.amount, ops.qty).ok()?;
    (ops.price > EXTRA_ZERO_PRICE_FLOOR && per_unit <= ops.price / TEN).then(|| Candidate {
        fix: DigitFix::PriceExtraZero,
        qty: ops.qty,
        price: ops.price / TEN,
    })
}

/// Reconciles line arithmetic and repairs digit errors
#[derive(Debug, Clone, Default)]
pub struct ArithmeticCorrector {
    config: ArithmeticConfig,
    recovery: FieldRecovery,
}

impl ArithmeticCorrector {
    pub fn new(config: ArithmeticConfig) -> Self {
        let recovery = FieldRecovery::new(config.recovery_tolerance);
        Self { config, recovery }
    }

    pub fn config(&self) -> &ArithmeticConfig {
        &self.config
    }

    /// Checks a line without modifying it
    pub fn check(&self, line: &InvoiceLine) -> ArithmeticOutcome {
        let Some((qty, price, amount)) = line.numbers() else {
            return ArithmeticOutcome::Incomplete;
        };

        let Ok(expected) = checked_mul(qty, price) else {
            return ArithmeticOutcome::OutOfRange;
        };
        if expected.is_zero() && amount.is_zero() {
            return ArithmeticOutcome::Valid;
        }

        let Ok(error_percent) = percent_error(expected, amount) else {
            return ArithmeticOutcome::OutOfRange;
        };
        if error_percent <= self.config.max_error_percent {
            return ArithmeticOutcome::Valid;
        }

        let ops = Operands { qty, price, amount };
        let found = HYPOTHESES
            .iter()
            .filter_map(|hypothesis| hypothesis(&ops))
            .find(|candidate| {
                checked_mul(candidate.qty, candidate.price)
                    .and_then(|product| percent_error(amount, product))
                    .map_or(false, |error| error <= FIX_TOLERANCE_PERCENT)
            });

        match found {
            Some(candidate) => {
                let (old, new) = match candidate.fix.field() {
                    LineField::Quantity => (qty, candidate.qty),
                    _ => (price, candidate.price),
                };
                ArithmeticOutcome::Fixed {
                    fix: candidate.fix,
                    old,
                    new: new.normalize(),
                }
            }
            None => ArithmeticOutcome::Unresolved {
                expected,
                error_percent: round_half_up(error_percent, 2),
            },
        }
    }

    /// Applies a checked outcome to the line and returns the issue it raises
    ///
    /// Fixes mutate the line only when `auto_fix` is enabled; otherwise the
    /// issue carries the proposed value at warning severity.
    pub fn apply_outcome(&self, line: &mut InvoiceLine, outcome: &ArithmeticOutcome) -> Option<Issue> {
        match outcome {
            ArithmeticOutcome::Incomplete | ArithmeticOutcome::Valid => None,
            ArithmeticOutcome::Fixed { fix, old, new } => {
                let severity = if self.config.auto_fix {
                    line.set_field(fix.field(), *new);
                    info!(line = line.index, fix = fix.kind().code(), %old, %new, "Applied digit fix");
                    Severity::Info
                } else {
                    Severity::Warning
                };
                let message = format!("{}: {} -> {}", fix.describe(), old.normalize(), new);
                Some(
                    Issue::new(fix.kind(), severity, message)
                        .on_line(line.index)
                        .with_change(old.normalize(), new),
                )
            }
            ArithmeticOutcome::Unresolved { expected, error_percent } => {
                Some(self.arithmetic_error(line, *expected, *error_percent))
            }
            ArithmeticOutcome::OutOfRange => Some(self.out_of_range(line)),
        }
    }

    fn out_of_range(&self, line: &InvoiceLine) -> Issue {
        warn!(line = line.index, "Line values exceed the decimal range");
        Issue::warning(
            IssueKind::ValidationError,
            format!(
                "Line values too large to validate: {} * {} vs {}",
                line.quantity.unwrap_or_default().normalize(),
                line.unit_price.unwrap_or_default().normalize(),
                line.line_amount.unwrap_or_default().normalize()
            ),
        )
        .on_line(line.index)
    }

    fn arithmetic_error(&self, line: &InvoiceLine, expected: Decimal, error_percent: Decimal) -> Issue {
        let (qty, price, amount) = (
            line.quantity.unwrap_or_default(),
            line.unit_price.unwrap_or_default(),
            line.line_amount.unwrap_or_default(),
        );
        Issue::warning(
            IssueKind::ArithmeticError,
            format!(
                "qty * price != amount: {} * {} != {} (expected {}, error {}%)",
                qty.normalize(),
                price.normalize(),
                amount.normalize(),
                expected.normalize(),
                error_percent
            ),
        )
        .on_line(line.index)
    }

    /// Checks and repairs one line, returning the issues raised
    pub fn correct_line(&self, line: &mut InvoiceLine) -> Vec<Issue> {
        if let Some(derived) = self.recovery.derive_missing(line) {
            return vec![self.apply_recovery(line, &derived)];
        }

        match self.check(line) {
            ArithmeticOutcome::Incomplete => {
                debug!(line = line.index, "Line incomplete, not validated");
                Vec::new()
            }
            ArithmeticOutcome::Unresolved { expected, error_percent } => {
                match self.recovery.rescale(line) {
                    Some(rescaled) => vec![self.apply_recovery(line, &rescaled)],
                    None => vec![self.arithmetic_error(line, expected, error_percent)],
                }
            }
            outcome => self.apply_outcome(line, &outcome).into_iter().collect(),
        }
    }

    /// Corrects every line of the invoice
    pub fn correct_invoice(&self, invoice: &mut ParsedInvoice) -> Vec<Issue> {
        invoice
            .lines
            .iter_mut()
            .flat_map(|line| self.correct_line(line))
            .collect()
    }

    fn apply_recovery(&self, line: &mut InvoiceLine, outcome: &RecoveryOutcome) -> Issue {
        let (kind, field, old, new, message) = match outcome {
            RecoveryOutcome::Derived { field, value } => (
                IssueKind::ArithmeticFix,
                *field,
                line.field(*field),
                *value,
                format!("Derived missing {}: {}", field.label(), value),
            ),
            RecoveryOutcome::Rescaled { field, old, new } => (
                IssueKind::ArithmeticFix,
                *field,
                Some(*old),
                *new,
                format!("Rescaled {} by a factor of ten: {} -> {}", field.label(), old.normalize(), new),
            ),
        };

        let severity = if self.config.auto_fix {
            line.set_field(field, new);
            info!(line = line.index, field = field.label(), %new, "Recovered line field");
            Severity::Info
        } else {
            Severity::Warning
        };

        Issue::new(kind, severity, message)
            .on_line(line.index)
            .with_change(old.map(|v| v.normalize().to_string()).unwrap_or_default(), new)
    }
}

/// Result of a field recovery
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    /// A missing field was computed from the other two
    Derived { field: LineField, value: Decimal },
    /// A field was off by a factor of ten
    Rescaled {
        field: LineField,
        old: Decimal,
        new: Decimal,
    },
}

/// Derives missing fields and searches all three fields for ×10 errors
#[derive(Debug, Clone)]
pub struct FieldRecovery {
    tolerance: Decimal,
}

impl Default for FieldRecovery {
    fn default() -> Self {
        Self::new(dec!(0.01))
    }
}

impl FieldRecovery {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }

    fn reconciles(&self, qty: Decimal, price: Decimal, amount: Decimal) -> bool {
        checked_mul(qty, price)
            .and_then(|product| relative_difference(product, amount))
            .map_or(false, |diff| diff <= self.tolerance)
    }

    /// Computes the one missing or zero field from the other two
    ///
    /// A value that rounds to zero is not derived: the field was tiny rather
    /// than missing, and the line is left to the arithmetic check.
    pub fn derive_missing(&self, line: &InvoiceLine) -> Option<RecoveryOutcome> {
        let missing = |value: Option<Decimal>| is_effectively_zero(value);
        let (q, p, a) = (line.quantity, line.unit_price, line.line_amount);

        let (field, value) = match (missing(q), missing(p), missing(a)) {
            (false, false, true) => (LineField::LineAmount, round_half_up(checked_mul(q?, p?).ok()?, 2)),
            (true, false, false) => (LineField::Quantity, round_half_up(checked_div(a?, p?).ok()?, 3)),
            (false, true, false) => (LineField::UnitPrice, round_half_up(checked_div(a?, q?).ok()?, 2)),
            _ => return None,
        };
        if value.is_zero() {
            return None;
        }

        Some(RecoveryOutcome::Derived {
            field,
            value: value.normalize(),
        })
    }

    /// Searches price, quantity and amount in that order for a ×10 or ÷10 error
    pub fn rescale(&self, line: &InvoiceLine) -> Option<RecoveryOutcome> {
        let (qty, price, amount) = line.numbers()?;
        if self.reconciles(qty, price, amount) {
            return None;
        }

        let candidates = [
            (LineField::UnitPrice, price.checked_mul(TEN)),
            (LineField::UnitPrice, Some(price / TEN)),
            (LineField::Quantity, qty.checked_mul(TEN)),
            (LineField::Quantity, Some(qty / TEN)),
            (LineField::LineAmount, amount.checked_mul(TEN)),
            (LineField::LineAmount, Some(amount / TEN)),
        ];

        candidates
            .into_iter()
            .filter_map(|(field, value)| Some((field, value?)))
            .find(|(field, value)| match field {
                LineField::UnitPrice => self.reconciles(qty, *value, amount),
                LineField::Quantity => self.reconciles(*value, price, amount),
                LineField::LineAmount => self.reconciles(qty, price, *value),
            })
            .map(|(field, value)| RecoveryOutcome::Rescaled {
                field,
                old: line.field(field).unwrap_or_default(),
                new: value.normalize(),
            })
    }
}
