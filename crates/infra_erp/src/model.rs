//! ERP wire-bound invoice model
//!
//! These types mirror the ERP's incoming-invoice document and are distinct
//! from the OCR-side [`domain_invoice::ParsedInvoice`]: every entity is a GUID
//! and every amount is final.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line of an incoming invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// Line number
    pub num: u32,
    /// Product GUID
    pub product_id: String,
    /// Quantity, must be positive
    pub amount: Decimal,
    /// Unit price
    pub price: Decimal,
    /// Line total, `round_half_up(amount × price, 2)`
    pub sum: Decimal,
    /// Destination store GUID, overrides the invoice default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
}

impl InvoiceItem {
    pub fn new(
        num: u32,
        product_id: impl Into<String>,
        amount: Decimal,
        price: Decimal,
        sum: Decimal,
    ) -> Self {
        Self {
            num,
            product_id: product_id.into(),
            amount,
            price,
            sum,
            store_id: None,
        }
    }

    pub fn with_store(mut self, store_id: impl Into<String>) -> Self {
        self.store_id = Some(store_id.into());
        self
    }
}

/// An incoming invoice for import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Line items
    pub items: Vec<InvoiceItem>,
    /// Supplier GUID
    pub supplier_id: String,
    /// Default store GUID
    pub default_store_id: String,
    /// Conception GUID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conception_id: Option<String>,
    /// Document number, generated as `AUTO-YYYYMMDD-XXXXXXXX` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    /// Document date, today when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_incoming: Option<NaiveDate>,
    /// Idempotency key, a random UUID when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl Invoice {
    pub fn new(
        items: Vec<InvoiceItem>,
        supplier_id: impl Into<String>,
        default_store_id: impl Into<String>,
    ) -> Self {
        Self {
            items,
            supplier_id: supplier_id.into(),
            default_store_id: default_store_id.into(),
            conception_id: None,
            document_number: None,
            date_incoming: None,
            external_id: None,
        }
    }

    pub fn with_conception(mut self, conception_id: impl Into<String>) -> Self {
        self.conception_id = Some(conception_id.into());
        self
    }

    pub fn with_document_number(mut self, document_number: impl Into<String>) -> Self {
        self.document_number = Some(document_number.into());
        self
    }

    pub fn with_date_incoming(mut self, date: NaiveDate) -> Self {
        self.date_incoming = Some(date);
        self
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Sum of all line totals, `None` when it leaves the decimal range
    pub fn total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.sum))
    }
}
