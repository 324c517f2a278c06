//! Pre-built Test Fixtures
//!
//! Provides ready-to-use invoices, ERP identifiers and time anchors. All
//! dates are relative to [`TemporalFixtures::today`] so tests can pin the
//! clock and stay deterministic.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use core_kernel::FixedClock;
use domain_invoice::{InvoiceHeader, InvoiceLine, ParsedInvoice};
use infra_erp::{Invoice, InvoiceItem};
use rust_decimal_macros::dec;

/// ERP GUIDs that pass the format check
pub struct IdFixtures;

impl IdFixtures {
    pub const SUPPLIER: &'static str = "5a6b7c8d-1e2f-4a3b-9c4d-5e6f7a8b9c0d";
    pub const STORE: &'static str = "1f2e3d4c-5b6a-4978-8a6b-5c4d3e2f1a0b";
    pub const CONCEPTION: &'static str = "9e8d7c6b-5a49-4837-a261-5f4e3d2c1b0a";
    pub const BEEF: &'static str = "0b1c2d3e-4f50-6172-8394-a5b6c7d8e9f0";
    pub const CUCUMBERS: &'static str = "a0b1c2d3-e4f5-4607-b8c9-d0e1f2a3b4c5";
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// The pinned "today" used throughout the suite (Mar 20, 2024)
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    pub fn yesterday() -> NaiveDate {
        Self::today() - Duration::days(1)
    }

    pub fn in_days(days: i64) -> NaiveDate {
        Self::today() + Duration::days(days)
    }

    /// Clock pinned to midnight UTC of [`TemporalFixtures::today`]
    pub fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::at_date(Self::today()))
    }
}

/// Fixture for OCR-side invoices
pub struct InvoiceFixtures;

impl InvoiceFixtures {
    /// A clean three-line vegetable invoice, prices within the typical range
    pub fn clean() -> ParsedInvoice {
        ParsedInvoice::new(
            Self::header(),
            vec![
                InvoiceLine::new(1, "Cherry tomato", dec!(2.5), "кг", dec!(12000), dec!(30000)),
                InvoiceLine::new(2, "Cucumber", dec!(3), "кг", dec!(9000), dec!(27000)),
                InvoiceLine::new(3, "Red onion", dec!(10), "кг", dec!(15000), dec!(150000)),
            ],
        )
    }

    /// Header with a supplier, today's date and a standard number
    pub fn header() -> InvoiceHeader {
        InvoiceHeader {
            supplier: Some("ООО Овощебаза".to_string()),
            invoice_date: Some(TemporalFixtures::today().format("%d.%m.%Y").to_string()),
            invoice_number: Some("INV-2024/118".to_string()),
            conception: None,
        }
    }

    /// OCR JSON as it arrives from the recognizer, with string numbers, a
    /// price that lost a zero on line 1 and a spelled-out unit on line 2
    pub fn ocr_json() -> String {
        serde_json::json!({
            "supplier": "ООО Овощебаза",
            "date": "20.03.2024",
            "invoice_number": "INV-118",
            "positions": [
                { "name": "Beef tenderloin", "qty": "2", "unit": "кг", "price": "12 000", "amount": "240 000,00" },
                { "name": "Cucumber", "qty": 3, "unit": "килограмм", "price": 9000, "sum": 27000 }
            ]
        })
        .to_string()
    }
}

/// Fixture for ERP wire invoices
pub struct ErpFixtures;

impl ErpFixtures {
    /// One beef line, ready for submission
    pub fn item() -> InvoiceItem {
        InvoiceItem::new(1, IdFixtures::BEEF, dec!(2.5), dec!(120000.33), dec!(300000.83))
    }

    /// A valid invoice with fixed document number, date and external id
    pub fn invoice() -> Invoice {
        Invoice::new(vec![Self::item()], IdFixtures::SUPPLIER, IdFixtures::STORE)
            .with_document_number("INV-118")
            .with_date_incoming(TemporalFixtures::today())
            .with_external_id("ext-0001")
    }
}
