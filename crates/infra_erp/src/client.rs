//! ERP submission client
//!
//! [`ErpClient::send_invoice`] runs the full submission in a fixed order:
//! fill defaults, validate locally, generate XML, run the schema hook, send.
//! Any stage's error is returned unchanged.

use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{error, info, instrument, warn};

use core_kernel::{generate_document_number, Clock, SystemClock};

use crate::auth::{AuthSession, TokenState};
use crate::config::ErpConfig;
use crate::error::ErpError;
use crate::model::Invoice;
use crate::retry::{is_retryable_status, Backoff, ExponentialBackoff};
use crate::validation::validate_invoice;
use crate::xml::{generate_invoice_xml, ImportResponse, NoSchemaValidation, XmlSchemaValidator};

/// Called once per [`ErpClient::send_invoice_xml`] with
/// `(success, elapsed_seconds, error)`
pub type ResultCallback = Arc<dyn Fn(bool, f64, Option<&ErpError>) + Send + Sync>;

const APPLICATION_XML: &str = "application/xml";

/// Client for the ERP incoming-invoice import
///
/// Safe to share across tasks; the token cache is synchronized inside
/// [`AuthSession`] and `reqwest::Client` pools connections.
pub struct ErpClient {
    http: reqwest::Client,
    config: ErpConfig,
    auth: AuthSession,
    clock: Arc<dyn Clock>,
    backoff: Arc<dyn Backoff>,
    schema: Arc<dyn XmlSchemaValidator>,
    on_result: Option<ResultCallback>,
}

impl ErpClient {
    /// Creates a client with exponential backoff and the system clock
    pub fn new(config: ErpConfig) -> Result<Self, ErpError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ErpError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(Self {
            http,
            auth: AuthSession::with_clock(&config, clock.clone()),
            config,
            clock,
            backoff: Arc::new(ExponentialBackoff),
            schema: Arc::new(NoSchemaValidation),
            on_result: None,
        })
    }

    /// Replaces the clock used for token expiry and default dates
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.auth = AuthSession::with_clock(&self.config, clock.clone());
        self.clock = clock;
        self
    }

    pub fn with_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    pub fn with_schema_validator(mut self, validator: impl XmlSchemaValidator + 'static) -> Self {
        self.schema = Arc::new(validator);
        self
    }

    pub fn with_result_callback(
        mut self,
        callback: impl Fn(bool, f64, Option<&ErpError>) + Send + Sync + 'static,
    ) -> Self {
        self.on_result = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &ErpConfig {
        &self.config
    }

    /// Returns a usable token, fetching one if needed
    pub async fn token(&self) -> Result<String, ErpError> {
        self.auth.token(&self.http, self.config.base_url()).await
    }

    pub async fn token_state(&self) -> TokenState {
        self.auth.state().await
    }

    /// Checks the invoice against the import rules using today's date
    pub fn validate_invoice(&self, invoice: &Invoice) -> Result<(), ErpError> {
        validate_invoice(invoice, self.clock.today())
    }

    pub fn generate_invoice_xml(&self, invoice: &Invoice) -> Result<String, ErpError> {
        generate_invoice_xml(invoice)
    }

    /// Fills `document_number` and `date_incoming` when absent
    pub fn fill_defaults(&self, invoice: &mut Invoice) {
        let today = self.clock.today();
        if invoice.document_number.is_none() {
            let number = generate_document_number(today);
            info!(document_number = %number, "Using auto-generated document_number");
            invoice.document_number = Some(number);
        }
        if invoice.date_incoming.is_none() {
            invoice.date_incoming = Some(today);
        }
    }

    /// Validates, serializes and submits an invoice
    #[instrument(skip_all, fields(items = invoice.items.len()))]
    pub async fn send_invoice(&self, mut invoice: Invoice) -> Result<bool, ErpError> {
        self.fill_defaults(&mut invoice);
        self.validate_invoice(&invoice)?;
        let xml = self.generate_invoice_xml(&invoice)?;
        self.schema.validate(&xml)?;
        self.send_invoice_xml(&xml).await
    }

    /// Posts an import document, retrying gateway errors
    ///
    /// Returns `Ok(true)` when the server accepts the document. A rejection
    /// is an [`ErpError::Validation`] carrying the server's message. The
    /// result callback, if any, fires exactly once per call.
    pub async fn send_invoice_xml(&self, xml: &str) -> Result<bool, ErpError> {
        let started = Instant::now();
        let result = self.submit(xml).await;

        if let Some(callback) = &self.on_result {
            callback(result.is_ok(), started.elapsed().as_secs_f64(), result.as_ref().err());
        }
        result
    }

    async fn submit(&self, xml: &str) -> Result<bool, ErpError> {
        let token = self.token().await?;
        let url = format!(
            "{}/resto/api/documents/import/incomingInvoice",
            self.config.base_url()
        );
        let max_retries = self.config.max_retries;
        let started = Instant::now();
        let mut retries: u32 = 0;

        loop {
            let sent = self
                .http
                .post(&url)
                .query(&[("key", token.as_str())])
                .header(CONTENT_TYPE, APPLICATION_XML)
                .header(ACCEPT, APPLICATION_XML)
                .body(xml.to_owned())
                .send()
                .await;

            match sent {
                Ok(response) if response.status().is_success() => {
                    let body = response.text().await?;
                    let reply = ImportResponse::from_xml(&body).map_err(|e| ErpError::Http {
                        status: Some(200),
                        request_id: None,
                        message: format!("Malformed import response: {}", e),
                    })?;

                    let elapsed = started.elapsed().as_secs_f64();
                    if reply.is_valid() {
                        info!(elapsed_secs = elapsed, retries, "Invoice imported");
                        return Ok(true);
                    }

                    let reason = reply.rejection_reason();
                    warn!(reason = %reason, "ERP rejected invoice");
                    return Err(ErpError::Validation(reason));
                }
                Ok(response) => {
                    let status = response.status();
                    if is_retryable_status(status) && retries < max_retries {
                        retries += 1;
                        let delay = self.backoff.delay(retries);
                        warn!(
                            status = status.as_u16(),
                            retry = retries,
                            max_retries,
                            delay_secs = delay.as_secs_f64(),
                            "ERP gateway error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    let request_id = response
                        .headers()
                        .get("X-Request-Id")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let body = response.text().await.unwrap_or_default();
                    error!(status = status.as_u16(), body = %body, "ERP HTTP error");
                    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                        warn!("ERP refused the session token, dropping it");
                        self.auth.invalidate().await;
                    }
                    return Err(ErpError::status(status.as_u16(), request_id));
                }
                Err(err) => {
                    if retries < max_retries {
                        retries += 1;
                        let delay = self.backoff.delay(retries);
                        warn!(
                            error = %err,
                            retry = retries,
                            max_retries,
                            delay_secs = delay.as_secs_f64(),
                            "ERP network error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    error!(error = %err, "ERP network error");
                    return Err(ErpError::network(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::FixedClock;

    fn client() -> ErpClient {
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        ErpClient::new(ErpConfig::new("http://erp.local/", "api", "hash"))
            .unwrap()
            .with_clock(Arc::new(FixedClock::at_date(today)))
    }

    #[test]
    fn test_new_rejects_incomplete_config() {
        let err = ErpClient::new(ErpConfig::default()).err().unwrap();
        assert_eq!(err.kind(), crate::ErpErrorKind::Config);
    }

    #[test]
    fn test_fill_defaults() {
        let client = client();
        let mut invoice = Invoice::new(vec![], "s", "d");

        client.fill_defaults(&mut invoice);

        let number = invoice.document_number.clone().unwrap();
        assert!(number.starts_with("AUTO-20240320-"));
        assert_eq!(number.len(), "AUTO-20240320-".len() + 8);
        assert_eq!(invoice.date_incoming, NaiveDate::from_ymd_opt(2024, 3, 20));
    }

    #[test]
    fn test_fill_defaults_keeps_given_values() {
        let client = client();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut invoice = Invoice::new(vec![], "s", "d")
            .with_document_number("INV-1")
            .with_date_incoming(date);

        client.fill_defaults(&mut invoice);

        assert_eq!(invoice.document_number.as_deref(), Some("INV-1"));
        assert_eq!(invoice.date_incoming, Some(date));
    }

    #[tokio::test]
    async fn test_local_validation_fails_before_network() {
        // base_url points nowhere; validation must fail first
        let err = client()
            .send_invoice(Invoice::new(vec![], "bad", "bad"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid supplier_id format: bad");
    }
}
