//! OCR invoice to ERP import, end to end

use std::sync::Arc;

use rust_decimal_macros::dec;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use domain_invoice::{PipelineConfig, ValidationPipeline, ValidationStatus};
use infra_erp::{ErpClient, ErpConfig, InvoiceMapper, NoDelay, StaticProductCatalog, SubmissionTarget};
use test_utils::{IdFixtures, InvoiceFixtures, TemporalFixtures};

fn mapper() -> InvoiceMapper {
    let catalog: StaticProductCatalog = [
        ("Beef tenderloin", IdFixtures::BEEF),
        ("Cucumber", IdFixtures::CUCUMBERS),
    ]
    .into_iter()
    .collect();
    InvoiceMapper::new(Arc::new(catalog))
}

fn target() -> SubmissionTarget {
    let mut target = SubmissionTarget::new(IdFixtures::SUPPLIER, IdFixtures::STORE);
    target.conception_id = Some(IdFixtures::CONCEPTION.to_string());
    target
}

#[tokio::test]
async fn test_corrected_invoice_is_submitted() {
    let pipeline = ValidationPipeline::with_clock(PipelineConfig::default(), TemporalFixtures::clock());
    let report = pipeline.run_json(&InvoiceFixtures::ocr_json()).unwrap();
    assert_ne!(report.status, ValidationStatus::Error);

    let invoice = mapper().map(&report.invoice, &target()).await.unwrap();

    // 2 × 12 000 != 240 000, price read back as 120 000
    assert_eq!(invoice.items[0].price, dec!(120000));
    assert_eq!(invoice.items[0].sum, dec!(240000));
    assert_eq!(invoice.items[1].product_id, IdFixtures::CUCUMBERS);
    assert_eq!(invoice.document_number.as_deref(), Some("INV-118"));
    assert_eq!(invoice.date_incoming, Some(TemporalFixtures::today()));

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resto/api/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_string("token-1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resto/api/documents/import/incomingInvoice"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<document><valid>true</valid></document>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ErpClient::new(ErpConfig::new(server.uri(), "api-user", "hash"))
        .unwrap()
        .with_clock(TemporalFixtures::clock())
        .with_backoff(NoDelay);

    assert!(client.send_invoice(invoice).await.unwrap());

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[1].body.clone()).unwrap();
    assert!(body.contains(&format!("<conception>{}</conception>", IdFixtures::CONCEPTION)));
    assert!(body.contains("<price>120000</price>"));
    assert!(body.contains("<sum>240000"));
}

#[tokio::test]
async fn test_unknown_product_stops_mapping() {
    let mut parsed = InvoiceFixtures::clean();
    parsed.lines.truncate(1);

    let err = mapper().map(&parsed, &target()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Validation error: Line 1: product \"Cherry tomato\" not found in catalog"
    );
}
