//! Invoice submission CLI
//!
//! Validates an OCR invoice and, unless validation failed or `--dry-run` is
//! given, submits it to the ERP.
//!
//! ```text
//! invoice-submit <request.json> [--dry-run]
//! ```
//!
//! The request file carries the OCR invoice plus booking targets:
//!
//! ```json
//! {
//!   "invoice": { "supplier": "...", "date": "15.03.2024", "positions": [...] },
//!   "supplier_id": "<guid>",
//!   "default_store_id": "<guid>",
//!   "products": { "Томаты": "<guid>" }
//! }
//! ```
//!
//! Pipeline thresholds come from `VALIDATION_*` variables and ERP settings
//! from `ERP_*` variables; a `.env` file is loaded if present. Logs go to
//! stderr, the validation report to stdout.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_invoice::{ParsedInvoice, PipelineConfig, ValidationPipeline, ValidationStatus};
use infra_erp::{ErpClient, ErpConfig, InvoiceMapper, StaticProductCatalog, SubmissionTarget};

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    invoice: ParsedInvoice,
    #[serde(flatten)]
    target: SubmissionTarget,
    #[serde(default)]
    products: HashMap<String, String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut path = None;
    let mut dry_run = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            _ if path.is_none() => path = Some(arg),
            other => bail!("Unexpected argument: {}", other),
        }
    }
    let Some(path) = path else {
        bail!("Usage: invoice-submit <request.json> [--dry-run]");
    };

    let raw = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let request: SubmitRequest =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path))?;

    let pipeline = ValidationPipeline::new(PipelineConfig::from_env()?);
    let report = pipeline.run(request.invoice);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.status == ValidationStatus::Error {
        tracing::warn!("Validation failed, invoice not submitted");
        return Ok(());
    }
    if dry_run {
        tracing::info!("Dry run, invoice not submitted");
        return Ok(());
    }

    let client = ErpClient::new(ErpConfig::from_env()?)?.with_result_callback(|ok, elapsed, _| {
        tracing::info!(success = ok, elapsed_secs = elapsed, "ERP submission finished");
    });
    let catalog: StaticProductCatalog = request.products.into_iter().collect();
    let mapper = InvoiceMapper::new(Arc::new(catalog));

    let invoice = mapper.map(&report.invoice, &request.target).await?;
    client.send_invoice(invoice).await?;

    tracing::info!("Invoice submitted");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
