//! Webhook client - blocking HTTP transport for the order backend
//!
//! Talks to the n8n webhooks that front the order system. One request
//! per call, no retries; tracking failures are logged and dropped.

use quotepage_core::backend::{
    decode_envelope, decode_payment_response, payment_url, quotation_url, tracking_url,
};
use quotepage_core::config::BackendConfig;
use quotepage_core::{BackendError, OrderBackend, PaymentRequest, Quotation, QuotationId, TrackingEvent};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Order backend reached over HTTP
pub struct WebhookClient {
    agent: ureq::Agent,
    /// Webhook host without trailing slash; None when not configured
    base_url: Option<String>,
    tracking_base_url: Option<String>,
}

impl WebhookClient {
    pub fn new(config: &BackendConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(&format!("quotepage/{}", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent,
            base_url: config.webhook_base(),
            tracking_base_url: config.tracking_base(),
        }
    }

    fn base(&self) -> Result<&str, BackendError> {
        self.base_url.as_deref().ok_or(BackendError::NotConfigured)
    }

    fn get(&self, url: &str) -> Result<String, BackendError> {
        debug!(url, "GET");
        read_response(self.agent.get(url).call())
    }

    fn post_json<T: serde::Serialize>(&self, url: &str, body: &T) -> Result<String, BackendError> {
        let payload =
            serde_json::to_string(body).map_err(|e| BackendError::Parse(e.to_string()))?;
        debug!(url, "POST");
        read_response(
            self.agent
                .post(url)
                .set("Content-Type", "application/json")
                .send_string(&payload),
        )
    }
}

/// Turn a ureq result into the body text or a BackendError
fn read_response(result: Result<ureq::Response, ureq::Error>) -> Result<String, BackendError> {
    match result {
        Ok(response) => response
            .into_string()
            .map_err(|e| BackendError::Network(e.to_string())),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(BackendError::Http { status, body })
        }
        Err(ureq::Error::Transport(transport)) => Err(BackendError::Network(transport.to_string())),
    }
}

impl OrderBackend for WebhookClient {
    fn fetch_quotation(&self, id: &QuotationId) -> Result<Option<Quotation>, BackendError> {
        let url = quotation_url(self.base()?, id);
        let body = self.get(&url)?;
        if body.trim().is_empty() {
            warn!(offerte_id = %id, "empty response from backend");
        }
        decode_envelope(&body)
    }

    fn create_payment_link(&self, request: &PaymentRequest) -> Result<String, BackendError> {
        let url = payment_url(self.base()?);
        let body = self.post_json(&url, request).map_err(|e| {
            error!(offerte_id = %request.offerte_id, "payment link creation failed: {e}");
            e
        })?;
        decode_payment_response(&body)
    }

    fn track(&self, event: &TrackingEvent) {
        let Some(base) = self.tracking_base_url.as_deref() else {
            warn!("tracking base URL not configured, dropping event");
            return;
        };

        if let Err(e) = self.post_json(&tracking_url(base), event) {
            warn!(kind = ?event.kind, offerte_id = %event.offerte_id, "tracking delivery failed: {e}");
        }
    }

    fn name(&self) -> &str {
        "n8n-webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotepage_core::TrackingKind;

    #[test]
    fn test_unconfigured_client_reports_not_configured() {
        let client = WebhookClient::new(&BackendConfig::default());
        let result = client.fetch_quotation(&QuotationId::new("434"));
        assert!(matches!(result, Err(BackendError::NotConfigured)));

        let request = PaymentRequest::new(QuotationId::new("434"), "434", "https://quote.example.com");
        assert!(matches!(
            client.create_payment_link(&request),
            Err(BackendError::NotConfigured)
        ));
    }

    #[test]
    fn test_unconfigured_tracking_is_silent() {
        let client = WebhookClient::new(&BackendConfig::default());
        // Must return without panicking or blocking
        client.track(&TrackingEvent::new(TrackingKind::View, QuotationId::new("434")));
        assert_eq!(client.name(), "n8n-webhook");
    }

    #[test]
    fn test_base_url_is_normalized() {
        let config = BackendConfig {
            base_url: Some("https://n8n.example.com/".to_string()),
            ..Default::default()
        };
        let client = WebhookClient::new(&config);
        assert_eq!(client.base().unwrap(), "https://n8n.example.com");
        assert_eq!(client.tracking_base_url.as_deref(), Some("https://n8n.example.com"));
    }
}
