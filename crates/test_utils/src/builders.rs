//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible
//! defaults. Tests specify only the fields they care about.

use chrono::NaiveDate;
use domain_invoice::InvoiceLine;
use infra_erp::{Invoice, InvoiceItem};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{IdFixtures, TemporalFixtures};

/// Builder for OCR invoice lines
///
/// Defaults to an arithmetically exact line: 2 kg at 12 000 = 24 000.
pub struct InvoiceLineBuilder {
    line: InvoiceLine,
}

impl Default for InvoiceLineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceLineBuilder {
    pub fn new() -> Self {
        Self {
            line: InvoiceLine::new(1, "Tomato", dec!(2), "кг", dec!(12000), dec!(24000)),
        }
    }

    pub fn index(mut self, index: usize) -> Self {
        self.line.index = index;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.line.name = name.into();
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.line.unit = unit.into();
        self
    }

    /// Sets quantity, price and amount at once
    pub fn numbers(mut self, quantity: Decimal, unit_price: Decimal, line_amount: Decimal) -> Self {
        self.line.quantity = Some(quantity);
        self.line.unit_price = Some(unit_price);
        self.line.line_amount = Some(line_amount);
        self
    }

    pub fn quantity(mut self, quantity: Option<Decimal>) -> Self {
        self.line.quantity = quantity;
        self
    }

    pub fn unit_price(mut self, unit_price: Option<Decimal>) -> Self {
        self.line.unit_price = unit_price;
        self
    }

    pub fn line_amount(mut self, line_amount: Option<Decimal>) -> Self {
        self.line.line_amount = line_amount;
        self
    }

    pub fn build(self) -> InvoiceLine {
        self.line
    }
}

/// Builder for ERP wire invoices
///
/// Starts with valid GUIDs, today's date and no items.
pub struct ErpInvoiceBuilder {
    invoice: Invoice,
}

impl Default for ErpInvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ErpInvoiceBuilder {
    pub fn new() -> Self {
        Self {
            invoice: Invoice::new(vec![], IdFixtures::SUPPLIER, IdFixtures::STORE)
                .with_date_incoming(TemporalFixtures::today()),
        }
    }

    /// Appends an item whose sum is `amount × price` rounded half-up
    pub fn item(mut self, product_id: &str, amount: Decimal, price: Decimal) -> Self {
        let num = self.invoice.items.len() as u32 + 1;
        let sum = core_kernel::round_half_up(amount * price, 2);
        self.invoice
            .items
            .push(InvoiceItem::new(num, product_id, amount, price, sum));
        self
    }

    pub fn raw_item(mut self, item: InvoiceItem) -> Self {
        self.invoice.items.push(item);
        self
    }

    pub fn supplier(mut self, supplier_id: impl Into<String>) -> Self {
        self.invoice.supplier_id = supplier_id.into();
        self
    }

    pub fn store(mut self, store_id: impl Into<String>) -> Self {
        self.invoice.default_store_id = store_id.into();
        self
    }

    pub fn conception(mut self, conception_id: impl Into<String>) -> Self {
        self.invoice.conception_id = Some(conception_id.into());
        self
    }

    pub fn document_number(mut self, number: Option<&str>) -> Self {
        self.invoice.document_number = number.map(str::to_string);
        self
    }

    pub fn date_incoming(mut self, date: Option<NaiveDate>) -> Self {
        self.invoice.date_incoming = date;
        self
    }

    pub fn build(self) -> Invoice {
        self.invoice
    }
}
