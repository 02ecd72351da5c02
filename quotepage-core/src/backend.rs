// Order backend abstraction
//
// The order-management system (Odoo, reached through n8n webhooks) owns
// quotations, payments and tracking. This module defines the boundary:
// request/response shapes, URL construction and envelope decoding. The
// HTTP transport lives with the caller so the core stays free of I/O.

use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// How many characters of an unparseable body end up in the error
const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend base URL is not configured (set N8N_BASE_URL)")]
    NotConfigured,

    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse backend response: {0}")]
    Parse(String),

    #[error("Payment response did not contain a url")]
    MissingUrl,
}

/// Backend seam used by the pages and the CLI.
pub trait OrderBackend {
    /// Fetch a quotation by id. `Ok(None)` means the backend had nothing
    /// for this id (empty body or empty envelope).
    fn fetch_quotation(&self, id: &QuotationId) -> Result<Option<Quotation>, BackendError>;

    /// Ask the backend for a payment-provider redirect URL. Not retried.
    fn create_payment_link(&self, request: &PaymentRequest) -> Result<String, BackendError>;

    /// Deliver a tracking event. Best effort: implementations log and
    /// swallow delivery failures.
    fn track(&self, event: &TrackingEvent);

    /// Get backend name for debugging/logging
    fn name(&self) -> &str;
}

/// `GET` endpoint for a quotation. The id is sent both as `offerte_id`
/// (what the workflow reads today) and as `uuid`.
pub fn quotation_url(base: &str, id: &QuotationId) -> String {
    let encoded = encode_query_value(id.as_str());
    format!(
        "{}/webhook/offerte?offerte_id={}&uuid={}",
        base.trim_end_matches('/'),
        encoded,
        encoded
    )
}

pub fn payment_url(base: &str) -> String {
    format!("{}/webhook/create-payment", base.trim_end_matches('/'))
}

pub fn tracking_url(base: &str) -> String {
    format!("{}/webhook/offerte-tracking", base.trim_end_matches('/'))
}

/// Percent-encode a query value (RFC 3986 unreserved characters pass through)
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Decode the webhook response body into a quotation.
///
/// n8n wraps results in several ways: a bare object, an array of items,
/// or items carrying the payload under `json`. An empty body or an empty
/// array is "not found", not an error.
pub fn decode_envelope(body: &str) -> Result<Option<Quotation>, BackendError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        BackendError::Parse(format!("{e}; body: {preview}"))
    })?;

    let first = match value {
        Value::Array(items) => match items.into_iter().next() {
            Some(item) => item,
            None => return Ok(None),
        },
        other => other,
    };

    let item = match first {
        Value::Object(mut map) => match map.remove("json") {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        Value::Null => return Ok(None),
        other => other,
    };

    if item.is_null() {
        return Ok(None);
    }

    serde_json::from_value(item)
        .map(Some)
        .map_err(|e| BackendError::Parse(e.to_string()))
}

/// Body sent to the payment webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub offerte_id: QuotationId,
    pub uuid: String,
    /// Where the payment provider sends the customer afterwards
    pub return_url: String,
}

impl PaymentRequest {
    /// The return URL lands on the receipt view of the same quotation.
    pub fn new(offerte_id: QuotationId, uuid: &str, origin: &str) -> Self {
        let return_url = format!(
            "{}/{}?status=success",
            origin.trim_end_matches('/'),
            uuid
        );
        Self {
            offerte_id,
            uuid: uuid.to_string(),
            return_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Extract the redirect URL from the payment webhook response (`{"url": ...}`)
pub fn decode_payment_response(body: &str) -> Result<String, BackendError> {
    let response: PaymentResponse =
        serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))?;
    response
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or(BackendError::MissingUrl)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingKind {
    View,
    Exit,
    Click,
}

impl std::str::FromStr for TrackingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(TrackingKind::View),
            "exit" => Ok(TrackingKind::Exit),
            "click" => Ok(TrackingKind::Click),
            other => Err(format!("unknown tracking event '{other}'")),
        }
    }
}

/// Page interaction forwarded to the tracking webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub event_id: Uuid,
    pub kind: TrackingKind,
    pub offerte_id: QuotationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TrackingEvent {
    pub fn new(kind: TrackingKind, offerte_id: QuotationId) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            offerte_id,
            uuid: None,
            occurred_at: Utc::now(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotation_url_encodes_id() {
        let url = quotation_url("https://n8n.example.com/", &QuotationId::new("S 591/a"));
        assert_eq!(
            url,
            "https://n8n.example.com/webhook/offerte?offerte_id=S%20591%2Fa&uuid=S%20591%2Fa"
        );
    }

    #[test]
    fn test_endpoint_urls() {
        assert_eq!(
            payment_url("https://n8n.example.com"),
            "https://n8n.example.com/webhook/create-payment"
        );
        assert_eq!(
            tracking_url("https://n8n.example.com/"),
            "https://n8n.example.com/webhook/offerte-tracking"
        );
    }

    #[test]
    fn test_decode_envelope_shapes() {
        let bare = decode_envelope(r#"{"offerte_id": 1, "klant_naam": "A"}"#).unwrap().unwrap();
        assert_eq!(bare.offerte_id.as_str(), "1");

        let array = decode_envelope(r#"[{"offerte_id": 2}, {"offerte_id": 3}]"#).unwrap().unwrap();
        assert_eq!(array.offerte_id.as_str(), "2");

        let wrapped = decode_envelope(r#"[{"json": {"offerte_id": "S00591"}}]"#).unwrap().unwrap();
        assert_eq!(wrapped.offerte_id.as_str(), "S00591");

        let object_wrapped = decode_envelope(r#"{"json": {"offerte_id": 4}}"#).unwrap().unwrap();
        assert_eq!(object_wrapped.offerte_id.as_str(), "4");
    }

    #[test]
    fn test_decode_envelope_not_found() {
        assert!(decode_envelope("").unwrap().is_none());
        assert!(decode_envelope("   \n").unwrap().is_none());
        assert!(decode_envelope("[]").unwrap().is_none());
        assert!(decode_envelope("null").unwrap().is_none());
        assert!(decode_envelope(r#"[{"json": null}]"#).unwrap().is_none());
    }

    #[test]
    fn test_decode_envelope_parse_error_previews_body() {
        let body = format!("<html>{}</html>", "x".repeat(500));
        match decode_envelope(&body) {
            Err(BackendError::Parse(msg)) => {
                assert!(msg.contains("<html>"));
                assert!(!msg.contains("</html>"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_payment_request_return_url() {
        let req = PaymentRequest::new(QuotationId::new("434"), "abc-123", "https://quote.example.com/");
        assert_eq!(req.return_url, "https://quote.example.com/abc-123?status=success");

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["offerte_id"], "434");
        assert_eq!(body["uuid"], "abc-123");
    }

    #[test]
    fn test_decode_payment_response() {
        assert_eq!(
            decode_payment_response(r#"{"url": "https://pay.example.com/x"}"#).unwrap(),
            "https://pay.example.com/x"
        );
        assert!(matches!(
            decode_payment_response(r#"{"url": ""}"#),
            Err(BackendError::MissingUrl)
        ));
        assert!(matches!(
            decode_payment_response("{}"),
            Err(BackendError::MissingUrl)
        ));
        assert!(matches!(
            decode_payment_response("oops"),
            Err(BackendError::Parse(_))
        ));
    }

    #[test]
    fn test_tracking_event_serialization() {
        let event = TrackingEvent::new(TrackingKind::Click, QuotationId::new("434"))
            .with_detail("secure_build");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "click");
        assert_eq!(value["offerte_id"], "434");
        assert_eq!(value["detail"], "secure_build");
        assert!(value.get("uuid").is_none());
        assert_eq!("VIEW".parse::<TrackingKind>().unwrap(), TrackingKind::View);
        assert!("scroll".parse::<TrackingKind>().is_err());
    }
}
