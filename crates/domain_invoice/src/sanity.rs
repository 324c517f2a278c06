//! Business sanity rules
//!
//! Checks that do not depend on line arithmetic: header dates and names,
//! quantity and price bounds, units of measure, and duplicate positions.
//! Nothing here is fatal; findings become issues and the simple cases
//! (negative values, unit aliases, future dates) are fixed in place when
//! `auto_fix` is enabled.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::temporal::CANONICAL_DATE_FORMAT;
use core_kernel::{parse_invoice_date, Clock, SystemClock};

use crate::issue::{Issue, IssueKind};
use crate::model::{InvoiceHeader, InvoiceLine, ParsedInvoice};

static INVOICE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-/.]{2,20}$").expect("INVOICE_NUMBER should compile"));

/// Units accepted as written
pub const VALID_UNITS: [&str; 14] = [
    "шт", "кг", "г", "л", "мл", "пак", "уп", "box", "pcs", "kg", "g", "l", "ml", "pack",
];

/// Alias to canonical unit, matched in order
pub const UNIT_ALIASES: [(&str, &str); 22] = [
    ("штук", "шт"),
    ("штука", "шт"),
    ("штуки", "шт"),
    ("piece", "pcs"),
    ("pieces", "pcs"),
    ("kilogram", "kg"),
    ("kilo", "kg"),
    ("gram", "g"),
    ("litre", "l"),
    ("liter", "l"),
    ("mililiter", "ml"),
    ("milliliter", "ml"),
    ("package", "pack"),
    ("packet", "pack"),
    ("pc", "pcs"),
    ("pce", "pcs"),
    ("грамм", "г"),
    ("килограмм", "кг"),
    ("литр", "л"),
    ("миллилитр", "мл"),
    ("упаковка", "уп"),
    ("пакет", "пак"),
];

/// Sanity validator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanityConfig {
    /// Quantities above this are flagged
    pub max_qty: Decimal,
    /// Prices below this are flagged
    pub min_price: Decimal,
    /// Apply simple fixes in place
    pub auto_fix: bool,
}

impl Default for SanityConfig {
    fn default() -> Self {
        Self {
            max_qty: dec!(1000),
            min_price: Decimal::ZERO,
            auto_fix: true,
        }
    }
}

/// Looks up the canonical unit for an alias
///
/// Exact alias matches win; otherwise the first alias the unit starts with.
pub fn canonical_unit(unit: &str) -> Option<&'static str> {
    let normalized = unit.trim().to_lowercase();
    UNIT_ALIASES
        .iter()
        .find(|(alias, _)| normalized == *alias)
        .or_else(|| {
            UNIT_ALIASES
                .iter()
                .find(|(alias, _)| normalized.starts_with(alias))
        })
        .map(|(_, canonical)| *canonical)
}

/// Applies header and line business rules
pub struct SanityValidator {
    config: SanityConfig,
    clock: Arc<dyn Clock>,
}

impl Default for SanityValidator {
    fn default() -> Self {
        Self::new(SanityConfig::default())
    }
}

impl SanityValidator {
    pub fn new(config: SanityConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a validator that reads "today" from the given clock
    pub fn with_clock(config: SanityConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &SanityConfig {
        &self.config
    }

    /// Runs all rules over the invoice
    pub fn validate(&self, invoice: &mut ParsedInvoice) -> Vec<Issue> {
        let mut issues = self.check_header(&mut invoice.header);
        for line in invoice.lines.iter_mut() {
            issues.extend(self.check_line(line));
        }
        issues.extend(self.check_duplicates(&invoice.lines));
        issues
    }

    /// Checks date, supplier and invoice number
    pub fn check_header(&self, header: &mut InvoiceHeader) -> Vec<Issue> {
        let mut issues = Vec::new();

        if let Some(raw) = header.invoice_date.clone().filter(|d| !d.trim().is_empty()) {
            match parse_invoice_date(&raw) {
                Ok((date, _)) => {
                    let today = self.clock.today();
                    if date > today {
                        let clamped = today.format(CANONICAL_DATE_FORMAT).to_string();
                        let message = if self.config.auto_fix {
                            header.invoice_date = Some(clamped.clone());
                            format!("Invoice date ({}) is in the future, set to today ({})", raw, clamped)
                        } else {
                            format!("Invoice date ({}) is in the future", raw)
                        };
                        issues.push(Issue::warning(IssueKind::DateFuture, message).with_change(&raw, clamped));
                    }
                }
                Err(_) => {
                    issues.push(Issue::warning(
                        IssueKind::DateInvalid,
                        format!("Unrecognized date format: {}", raw),
                    ));
                }
            }
        }

        match header.supplier.as_deref().map(str::trim) {
            None | Some("") => {
                issues.push(Issue::warning(IssueKind::SupplierMissing, "Supplier is missing"));
            }
            Some(supplier) if supplier.chars().count() < 3 => {
                issues.push(Issue::info(
                    IssueKind::SupplierTooShort,
                    format!("Supplier name is too short: {}", supplier),
                ));
            }
            Some(_) => {}
        }

        if let Some(number) = header.invoice_number.as_deref().map(str::trim) {
            if !number.is_empty() && !INVOICE_NUMBER.is_match(number) {
                issues.push(Issue::info(
                    IssueKind::InvoiceNumberInvalid,
                    format!("Invoice number has a non-standard format: {}", number),
                ));
            }
        }

        issues
    }

    /// Checks name, quantity, price and unit of one line
    pub fn check_line(&self, line: &mut InvoiceLine) -> Vec<Issue> {
        let mut issues = Vec::new();
        let index = line.index;

        let name = line.name.trim();
        if name.is_empty() {
            issues.push(Issue::warning(IssueKind::NameMissing, "Product name is missing").on_line(index));
        } else if name.chars().count() < 2 {
            issues.push(
                Issue::info(IssueKind::NameTooShort, format!("Product name is too short: {}", name))
                    .on_line(index),
            );
        }

        if let Some(qty) = line.quantity {
            if qty < Decimal::ZERO {
                let issue = if self.config.auto_fix {
                    line.quantity = Some(qty.abs());
                    line.auto_fixed = true;
                    Issue::warning(
                        IssueKind::QtyNegative,
                        format!("Negative quantity ({}) changed to {}", qty, qty.abs()),
                    )
                    .with_change(qty, qty.abs())
                } else {
                    Issue::warning(IssueKind::QtyNegative, format!("Negative quantity: {}", qty))
                };
                issues.push(issue.on_line(index));
            } else if qty > self.config.max_qty {
                issues.push(
                    Issue::warning(IssueKind::QtyTooLarge, format!("Suspiciously large quantity: {}", qty))
                        .on_line(index),
                );
            }
        }

        if let Some(price) = line.unit_price {
            if price < Decimal::ZERO {
                let issue = if self.config.auto_fix {
                    line.unit_price = Some(price.abs());
                    line.auto_fixed = true;
                    Issue::warning(
                        IssueKind::PriceNegative,
                        format!("Negative price ({}) changed to {}", price, price.abs()),
                    )
                    .with_change(price, price.abs())
                } else {
                    Issue::warning(IssueKind::PriceNegative, format!("Negative price: {}", price))
                };
                issues.push(issue.on_line(index));
            } else if price < self.config.min_price {
                issues.push(
                    Issue::info(IssueKind::PriceTooLow, format!("Suspiciously low price: {}", price))
                        .on_line(index),
                );
            }
        }

        issues.extend(self.check_unit(line));
        issues
    }

    fn check_unit(&self, line: &mut InvoiceLine) -> Option<Issue> {
        let unit = line.unit.trim().to_string();
        if unit.is_empty() || VALID_UNITS.contains(&unit.to_lowercase().as_str()) {
            return None;
        }

        match canonical_unit(&unit) {
            Some(canonical) => {
                let message = if self.config.auto_fix {
                    debug!(line = line.index, from = %unit, to = canonical, "Normalized unit");
                    line.unit = canonical.to_string();
                    line.auto_fixed = true;
                    format!("Unit corrected: {} -> {}", unit, canonical)
                } else {
                    format!("Unit can be corrected: {} -> {}", unit, canonical)
                };
                Some(
                    Issue::info(IssueKind::UnitFixed, message)
                        .on_line(line.index)
                        .with_change(&unit, canonical),
                )
            }
            None => Some(
                Issue::info(IssueKind::UnitInvalid, format!("Non-standard unit: {}", unit))
                    .on_line(line.index),
            ),
        }
    }

    /// Reports names that occur on more than one line
    pub fn check_duplicates(&self, lines: &[InvoiceLine]) -> Vec<Issue> {
        let mut order: Vec<String> = Vec::new();
        let mut positions: HashMap<String, Vec<usize>> = HashMap::new();

        for line in lines {
            let key = line.name.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            positions
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(line.index);
        }

        order
            .into_iter()
            .filter_map(|name| {
                let indices = positions.get(&name).filter(|i| i.len() > 1)?;
                let listed = indices.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
                Some(Issue::warning(
                    IssueKind::DuplicatePositions,
                    format!("Duplicate positions \"{}\" on lines {}", name, listed),
                ))
            })
            .collect()
    }
}
