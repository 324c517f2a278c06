//! Invoice data model
//!
//! These types carry invoice data as it arrives from OCR and product
//! matching. Each validator stage mutates lines in place and appends issues;
//! lines are never removed mid-pipeline.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::decimal::lenient;

use crate::error::InvoiceError;
use crate::issue::Issue;

/// The three numeric fields of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineField {
    Quantity,
    UnitPrice,
    LineAmount,
}

impl LineField {
    /// Short field name used in issue messages
    pub fn label(&self) -> &'static str {
        match self {
            LineField::Quantity => "qty",
            LineField::UnitPrice => "price",
            LineField::LineAmount => "amount",
        }
    }
}

/// One invoice line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// 1-based position on the invoice
    #[serde(default)]
    pub index: usize,
    /// Product name as recognized
    #[serde(default)]
    pub name: String,
    /// Quantity
    #[serde(default, alias = "qty", deserialize_with = "lenient::deserialize_option")]
    pub quantity: Option<Decimal>,
    /// Unit of measure
    #[serde(default)]
    pub unit: String,
    /// Price per unit
    #[serde(default, alias = "price", deserialize_with = "lenient::deserialize_option")]
    pub unit_price: Option<Decimal>,
    /// Total for the line
    #[serde(
        default,
        alias = "amount",
        alias = "sum",
        deserialize_with = "lenient::deserialize_option"
    )]
    pub line_amount: Option<Decimal>,
    /// Issues found on this line, in the order they were raised
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Whether any stage changed a value on this line
    #[serde(default)]
    pub auto_fixed: bool,
}

impl InvoiceLine {
    /// Creates a line with all three numeric fields present
    pub fn new(
        index: usize,
        name: impl Into<String>,
        quantity: Decimal,
        unit: impl Into<String>,
        unit_price: Decimal,
        line_amount: Decimal,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            quantity: Some(quantity),
            unit: unit.into(),
            unit_price: Some(unit_price),
            line_amount: Some(line_amount),
            issues: Vec::new(),
            auto_fixed: false,
        }
    }

    /// Creates an empty line at the given position
    pub fn blank(index: usize) -> Self {
        Self {
            index,
            name: String::new(),
            quantity: None,
            unit: String::new(),
            unit_price: None,
            line_amount: None,
            issues: Vec::new(),
            auto_fixed: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_quantity(mut self, quantity: Option<Decimal>) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_unit_price(mut self, unit_price: Option<Decimal>) -> Self {
        self.unit_price = unit_price;
        self
    }

    pub fn with_line_amount(mut self, line_amount: Option<Decimal>) -> Self {
        self.line_amount = line_amount;
        self
    }

    /// Reads one of the numeric fields
    pub fn field(&self, field: LineField) -> Option<Decimal> {
        match field {
            LineField::Quantity => self.quantity,
            LineField::UnitPrice => self.unit_price,
            LineField::LineAmount => self.line_amount,
        }
    }

    /// Overwrites one of the numeric fields and marks the line as fixed
    pub fn set_field(&mut self, field: LineField, value: Decimal) {
        match field {
            LineField::Quantity => self.quantity = Some(value),
            LineField::UnitPrice => self.unit_price = Some(value),
            LineField::LineAmount => self.line_amount = Some(value),
        }
        self.auto_fixed = true;
    }

    /// Returns `(quantity, unit_price, line_amount)` when all three are present
    pub fn numbers(&self) -> Option<(Decimal, Decimal, Decimal)> {
        Some((self.quantity?, self.unit_price?, self.line_amount?))
    }
}

/// Invoice header fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceHeader {
    /// Supplier name as printed
    #[serde(default)]
    pub supplier: Option<String>,
    /// Invoice date as printed, normalized to `YYYY-MM-DD` when clamped
    #[serde(default, alias = "date")]
    pub invoice_date: Option<String>,
    /// Supplier's invoice number
    #[serde(default)]
    pub invoice_number: Option<String>,
    /// Optional conception (business unit) name
    #[serde(default)]
    pub conception: Option<String>,
}

/// An invoice as produced by OCR and product matching
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedInvoice {
    /// Header fields
    #[serde(flatten)]
    pub header: InvoiceHeader,
    /// Line items
    #[serde(default, alias = "positions")]
    pub lines: Vec<InvoiceLine>,
}

impl ParsedInvoice {
    pub fn new(header: InvoiceHeader, lines: Vec<InvoiceLine>) -> Self {
        let mut invoice = Self { header, lines };
        invoice.renumber();
        invoice
    }

    /// Decodes an invoice from OCR JSON
    ///
    /// Numeric fields may be numbers or text such as `"1 250,50"`; text that
    /// cannot be read as a number is treated as absent. Lines are numbered by
    /// position unless every line arrives with its own distinct index.
    pub fn from_json(json: &str) -> Result<Self, InvoiceError> {
        let mut invoice: ParsedInvoice = serde_json::from_str(json)?;
        invoice.renumber();
        Ok(invoice)
    }

    /// Numbers lines by position unless every line carries a distinct index
    ///
    /// Issues are attached by index, so a missing or repeated index anywhere
    /// renumbers the whole invoice.
    fn renumber(&mut self) {
        let mut seen = HashSet::with_capacity(self.lines.len());
        if self.lines.iter().all(|line| line.index != 0 && seen.insert(line.index)) {
            return;
        }
        for (position, line) in self.lines.iter_mut().enumerate() {
            line.index = position + 1;
        }
    }

    /// Finds a line by its 1-based index
    pub fn line_mut(&mut self, index: usize) -> Option<&mut InvoiceLine> {
        self.lines.iter_mut().find(|line| line.index == index)
    }

    /// Copies line-scoped issues onto the lines they refer to
    pub fn attach(&mut self, issues: &[Issue]) {
        for issue in issues {
            if let Some(line) = issue.line_ref.and_then(|index| self.line_mut(index)) {
                line.issues.push(issue.clone());
            }
        }
    }
}
