//! Incoming-invoice XML
//!
//! The ERP schema is order-sensitive, so the document is written from
//! explicit ordered `(tag, value)` lists rather than from a map:
//!
//! `items`, `supplier`, `defaultStore`, `conception`?, `documentNumber`?,
//! `dateIncoming`?, `externalId`, with each `item` holding `productId`,
//! `amount`, `price`, `sum`, `storeId`?.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Deserialize;
use tracing::info;

use core_kernel::generate_external_id;
use core_kernel::temporal::CANONICAL_DATE_FORMAT;

use crate::error::ErpError;
use crate::model::{Invoice, InvoiceItem};

type Fields = Vec<(&'static str, String)>;

fn xml_error(err: impl std::fmt::Display) -> ErpError {
    ErpError::validation(format!("XML generation failed: {}", err))
}

struct XmlDocument {
    writer: Writer<Vec<u8>>,
}

impl XmlDocument {
    fn new() -> Result<Self, ErpError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        Ok(Self { writer })
    }

    fn open(&mut self, tag: &str) -> Result<(), ErpError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(tag)))
            .map_err(xml_error)
    }

    fn close(&mut self, tag: &str) -> Result<(), ErpError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(xml_error)
    }

    fn leaves(&mut self, fields: &[(&'static str, String)]) -> Result<(), ErpError> {
        for (tag, value) in fields {
            self.open(tag)?;
            self.writer
                .write_event(Event::Text(BytesText::new(value)))
                .map_err(xml_error)?;
            self.close(tag)?;
        }
        Ok(())
    }

    fn finish(self) -> Result<String, ErpError> {
        let mut xml = String::from_utf8(self.writer.into_inner()).map_err(xml_error)?;
        xml.push('\n');
        Ok(xml)
    }
}

fn item_fields(item: &InvoiceItem) -> Fields {
    let mut fields = vec![
        ("productId", item.product_id.clone()),
        ("amount", item.amount.to_string()),
        ("price", item.price.to_string()),
        ("sum", item.sum.to_string()),
    ];
    if let Some(store_id) = &item.store_id {
        fields.push(("storeId", store_id.clone()));
    }
    fields
}

fn header_fields(invoice: &Invoice, external_id: String) -> Fields {
    let mut fields = vec![
        ("supplier", invoice.supplier_id.clone()),
        ("defaultStore", invoice.default_store_id.clone()),
    ];
    if let Some(conception_id) = &invoice.conception_id {
        fields.push(("conception", conception_id.clone()));
    }
    if let Some(number) = &invoice.document_number {
        fields.push(("documentNumber", number.clone()));
    }
    if let Some(date) = invoice.date_incoming {
        fields.push(("dateIncoming", date.format(CANONICAL_DATE_FORMAT).to_string()));
    }
    fields.push(("externalId", external_id));
    fields
}

/// Writes the import document, 2-space indented
///
/// A missing `external_id` is replaced with a fresh UUID in the document;
/// the invoice itself is not modified.
pub fn generate_invoice_xml(invoice: &Invoice) -> Result<String, ErpError> {
    let external_id = match &invoice.external_id {
        Some(id) => id.clone(),
        None => {
            let generated = generate_external_id();
            info!(external_id = %generated, "Using auto-generated external_id");
            generated
        }
    };

    let mut doc = XmlDocument::new()?;
    doc.open("document")?;

    doc.open("items")?;
    for item in &invoice.items {
        doc.open("item")?;
        doc.leaves(&item_fields(item))?;
        doc.close("item")?;
    }
    doc.close("items")?;

    doc.leaves(&header_fields(invoice, external_id))?;

    doc.close("document")?;
    doc.finish()
}

/// Body of the import endpoint's reply
///
/// `<document><valid>true|false</valid><errorMessage>...</errorMessage></document>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImportResponse {
    #[serde(default)]
    pub valid: Option<String>,
    #[serde(default, rename = "errorMessage")]
    pub error_message: Option<String>,
}

impl ImportResponse {
    pub fn from_xml(body: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(body)
    }

    pub fn is_valid(&self) -> bool {
        self.valid
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    /// Server-side rejection reason
    pub fn rejection_reason(&self) -> String {
        self.error_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("Unknown validation error")
            .to_string()
    }
}

/// Schema check applied to the generated document before sending
///
/// XSD validation is not bundled; install an implementation through
/// [`crate::ErpClient::with_schema_validator`].
pub trait XmlSchemaValidator: Send + Sync {
    fn validate(&self, xml: &str) -> Result<(), ErpError>;
}

/// Accepts every document
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchemaValidation;

impl XmlSchemaValidator for NoSchemaValidation {
    fn validate(&self, _xml: &str) -> Result<(), ErpError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const SUPPLIER: &str = "7b1c2d3e-4f50-6172-8394-a5b6c7d8e9f0";
    const STORE: &str = "0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9";
    const PRODUCT: &str = "11111111-2222-3333-4444-555555555555";

    fn position(xml: &str, tag: &str) -> usize {
        xml.find(&format!("<{}>", tag))
            .unwrap_or_else(|| panic!("missing <{}> in {}", tag, xml))
    }

    #[test]
    fn test_full_document_layout() {
        let invoice = Invoice::new(
            vec![InvoiceItem::new(1, PRODUCT, dec!(10.5), dec!(100.00), dec!(1050.00)).with_store(STORE)],
            SUPPLIER,
            STORE,
        )
        .with_conception("22222222-3333-4444-5555-666666666666")
        .with_document_number("INV-7")
        .with_date_incoming(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        .with_external_id("ext-1");

        let xml = generate_invoice_xml(&invoice).unwrap();

        let expected = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<document>
  <items>
    <item>
      <productId>{PRODUCT}</productId>
      <amount>10.5</amount>
      <price>100.00</price>
      <sum>1050.00</sum>
      <storeId>{STORE}</storeId>
    </item>
  </items>
  <supplier>{SUPPLIER}</supplier>
  <defaultStore>{STORE}</defaultStore>
  <conception>22222222-3333-4444-5555-666666666666</conception>
  <documentNumber>INV-7</documentNumber>
  <dateIncoming>2024-03-15</dateIncoming>
  <externalId>ext-1</externalId>
</document>
"#
        );
        assert_eq!(xml, expected);
    }

    #[test]
    fn test_optional_fields_omitted_and_external_id_generated() {
        let invoice = Invoice::new(
            vec![InvoiceItem::new(1, PRODUCT, dec!(1), dec!(5), dec!(5))],
            SUPPLIER,
            STORE,
        );

        let xml = generate_invoice_xml(&invoice).unwrap();

        assert!(!xml.contains("<conception>"));
        assert!(!xml.contains("<documentNumber>"));
        assert!(!xml.contains("<dateIncoming>"));
        assert!(!xml.contains("<storeId>"));
        assert!(position(&xml, "defaultStore") < position(&xml, "externalId"));
        assert!(invoice.external_id.is_none());
    }

    #[test]
    fn test_text_is_escaped() {
        let invoice = Invoice::new(
            vec![InvoiceItem::new(1, PRODUCT, dec!(1), dec!(5), dec!(5))],
            SUPPLIER,
            STORE,
        )
        .with_document_number("A&B<1>");

        let xml = generate_invoice_xml(&invoice).unwrap();
        assert!(xml.contains("<documentNumber>A&amp;B&lt;1&gt;</documentNumber>"));
    }

    #[test]
    fn test_parse_import_response() {
        let ok = ImportResponse::from_xml("<document><valid>true</valid></document>").unwrap();
        assert!(ok.is_valid());

        let rejected = ImportResponse::from_xml(
            "<document><valid>false</valid><errorMessage>Unknown supplier</errorMessage></document>",
        )
        .unwrap();
        assert!(!rejected.is_valid());
        assert_eq!(rejected.rejection_reason(), "Unknown supplier");

        let bare = ImportResponse::from_xml("<document><valid>FALSE</valid></document>").unwrap();
        assert_eq!(bare.rejection_reason(), "Unknown validation error");
    }
}
