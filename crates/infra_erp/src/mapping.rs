//! Mapping from a validated OCR invoice to the ERP wire model

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{checked_mul, parse_invoice_date, round_half_up, PortError, ProductCatalog};
use domain_invoice::ParsedInvoice;

use crate::error::ErpError;
use crate::model::{Invoice, InvoiceItem};

/// Where a mapped invoice is booked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionTarget {
    pub supplier_id: String,
    pub default_store_id: String,
    #[serde(default)]
    pub conception_id: Option<String>,
    /// Per-line store override applied to every item
    #[serde(default)]
    pub store_id: Option<String>,
}

impl SubmissionTarget {
    pub fn new(supplier_id: impl Into<String>, default_store_id: impl Into<String>) -> Self {
        Self {
            supplier_id: supplier_id.into(),
            default_store_id: default_store_id.into(),
            conception_id: None,
            store_id: None,
        }
    }
}

/// In-memory catalog keyed by lower-cased, trimmed product name
#[derive(Debug, Clone, Default)]
pub struct StaticProductCatalog {
    products: HashMap<String, String>,
}

impl StaticProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.trim().to_lowercase()
    }

    pub fn insert(&mut self, name: &str, product_id: impl Into<String>) {
        self.products.insert(Self::key(name), product_id.into());
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl<N: AsRef<str>, G: Into<String>> FromIterator<(N, G)> for StaticProductCatalog {
    fn from_iter<I: IntoIterator<Item = (N, G)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (name, product_id) in iter {
            catalog.insert(name.as_ref(), product_id);
        }
        catalog
    }
}

#[async_trait]
impl ProductCatalog for StaticProductCatalog {
    async fn resolve_product_id(&self, name: &str) -> Result<Option<String>, PortError> {
        Ok(self.products.get(&Self::key(name)).cloned())
    }
}

/// Builds ERP invoices from pipeline output
pub struct InvoiceMapper {
    catalog: Arc<dyn ProductCatalog>,
}

impl InvoiceMapper {
    pub fn new(catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { catalog }
    }

    /// Maps every line to an [`InvoiceItem`]
    ///
    /// Lines need a quantity and a unit price; the item sum is recomputed as
    /// `round_half_up(quantity × price, 2)`. The header's invoice number and
    /// date carry over when present and parseable.
    pub async fn map(
        &self,
        parsed: &ParsedInvoice,
        target: &SubmissionTarget,
    ) -> Result<Invoice, ErpError> {
        let mut items = Vec::with_capacity(parsed.lines.len());

        for line in &parsed.lines {
            let (Some(quantity), Some(price)) = (line.quantity, line.unit_price) else {
                return Err(ErpError::validation(format!(
                    "Line {}: quantity and price are required",
                    line.index
                )));
            };

            let sum = checked_mul(quantity, price).map_err(|err| {
                ErpError::validation(format!("Line {}: quantity x price cannot be computed: {}", line.index, err))
            })?;

            let product_id = self
                .catalog
                .resolve_product_id(&line.name)
                .await?
                .ok_or_else(|| {
                    ErpError::validation(format!(
                        "Line {}: product \"{}\" not found in catalog",
                        line.index, line.name
                    ))
                })?;

            let mut item = InvoiceItem::new(
                line.index as u32,
                product_id,
                quantity,
                price,
                round_half_up(sum, 2),
            );
            if let Some(store_id) = &target.store_id {
                item = item.with_store(store_id.clone());
            }
            items.push(item);
        }

        let mut invoice = Invoice::new(items, &target.supplier_id, &target.default_store_id);
        invoice.conception_id = target.conception_id.clone();
        invoice.document_number = parsed
            .header
            .invoice_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        invoice.date_incoming = parsed
            .header
            .invoice_date
            .as_deref()
            .and_then(|raw| parse_invoice_date(raw).ok())
            .map(|(date, _)| date);

        debug!(items = invoice.items.len(), total = ?invoice.total(), "Mapped invoice");
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain_invoice::{InvoiceHeader, InvoiceLine};
    use rust_decimal_macros::dec;

    const TOMATO: &str = "0b1c2d3e-4f50-6172-8394-a5b6c7d8e9f0";

    fn mapper() -> InvoiceMapper {
        let catalog: StaticProductCatalog = [("Томаты", TOMATO)].into_iter().collect();
        InvoiceMapper::new(Arc::new(catalog))
    }

    fn target() -> SubmissionTarget {
        SubmissionTarget::new(
            "11111111-2222-3333-4444-555555555555",
            "66666666-7777-8888-9999-000000000000",
        )
    }

    #[tokio::test]
    async fn test_map_line() {
        let header = InvoiceHeader {
            invoice_number: Some("INV-7".into()),
            invoice_date: Some("15.03.2024".into()),
            ..Default::default()
        };
        let line = InvoiceLine::new(0, "  томаты ", dec!(2.5), "кг", dec!(120.33), dec!(300.83));
        let parsed = ParsedInvoice::new(header, vec![line]);

        let invoice = mapper().map(&parsed, &target()).await.unwrap();

        assert_eq!(invoice.items.len(), 1);
        let item = &invoice.items[0];
        assert_eq!(item.num, 1);
        assert_eq!(item.product_id, TOMATO);
        // 2.5 × 120.33 = 300.825
        assert_eq!(item.sum, dec!(300.83));
        assert_eq!(invoice.document_number.as_deref(), Some("INV-7"));
        assert_eq!(invoice.date_incoming, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[tokio::test]
    async fn test_map_unknown_product() {
        let line = InvoiceLine::new(1, "Огурцы", dec!(1), "кг", dec!(90), dec!(90));
        let parsed = ParsedInvoice::new(InvoiceHeader::default(), vec![line]);

        let err = mapper().map(&parsed, &target()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Line 1: product \"Огурцы\" not found in catalog"
        );
    }

    #[tokio::test]
    async fn test_map_requires_quantity_and_price() {
        let line = InvoiceLine::blank(1).with_name("Томаты").with_quantity(Some(dec!(1)));
        let parsed = ParsedInvoice::new(InvoiceHeader::default(), vec![line]);

        let err = mapper().map(&parsed, &target()).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErpErrorKind::Validation);
        assert!(err.to_string().contains("quantity and price are required"));
    }

    #[tokio::test]
    async fn test_map_rejects_line_beyond_decimal_range() {
        let line = InvoiceLine::new(
            1,
            "Томаты",
            dec!(1000000000000000),
            "кг",
            dec!(100000000000000),
            dec!(5),
        );
        let parsed = ParsedInvoice::new(InvoiceHeader::default(), vec![line]);

        let err = mapper().map(&parsed, &target()).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErpErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "Validation error: Line 1: quantity x price cannot be computed: Arithmetic overflow"
        );
    }

    #[tokio::test]
    async fn test_map_unparseable_date_is_dropped() {
        let header = InvoiceHeader {
            invoice_date: Some("sometime".into()),
            ..Default::default()
        };
        let line = InvoiceLine::new(1, "Томаты", dec!(1), "кг", dec!(10), dec!(10));
        let parsed = ParsedInvoice::new(header, vec![line]);

        let invoice = mapper().map(&parsed, &target()).await.unwrap();
        assert_eq!(invoice.date_incoming, None);
        assert_eq!(invoice.document_number, None);
    }
}
