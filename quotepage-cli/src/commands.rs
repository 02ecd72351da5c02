//! Command implementations behind the `quotepage` binary.
//!
//! Everything here takes an `&dyn OrderBackend`, so the binary wires in
//! the webhook client and tests wire in a stub.

use anyhow::{Context, Result};
use chrono::Utc;
use quotepage_core::backend::decode_envelope;
use quotepage_core::{
    BackendError, ClassifiedLineItem, LineItem, LineItemClassifier, Locale, OrderBackend,
    OutputFormat, PageRequest, PaymentRequest, QuotationId, QuotationPage, ReceiptPage,
    TrackingEvent, TrackingKind,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input contains neither a quotation nor line items")]
    Empty,

    #[error(transparent)]
    Envelope(#[from] BackendError),
}

/// Read line items from a quotation, a webhook envelope or a bare
/// line-item array.
pub fn parse_line_items(text: &str) -> Result<Vec<LineItem>, InputError> {
    let value: Value = serde_json::from_str(text)?;

    if let Value::Array(items) = &value {
        if items.is_empty() {
            return Err(InputError::Empty);
        }
        if items.iter().all(is_line_item) {
            return Ok(serde_json::from_value(value)?);
        }
    }

    match decode_envelope(text)? {
        Some(quotation) => Ok(quotation.line_items),
        None => Err(InputError::Empty),
    }
}

fn is_line_item(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.contains_key("product_naam") && !map.contains_key("json"))
}

/// Classify line items read from `input_path`.
pub fn classify_file(input_path: &str, classifier: &LineItemClassifier) -> Result<Vec<ClassifiedLineItem>> {
    let text = std::fs::read_to_string(input_path)
        .with_context(|| format!("Failed to read input file: {}", input_path))?;
    let items = parse_line_items(&text)
        .with_context(|| format!("Failed to parse input file: {}", input_path))?;
    debug!(count = items.len(), "parsed line items");
    Ok(classifier.classify(&items))
}

pub fn render_classified(items: &[ClassifiedLineItem], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(items)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for c in items {
                let kind = if c.is_wheel { "wheel" } else { "other" };
                let profile = c
                    .concave_profile
                    .map(|p| format!(" ({} Concave)", p))
                    .unwrap_or_default();
                out.push_str(&format!("[{}] {}  {}{}\n", c.parsed.code, c.parsed.title, kind, profile));
            }
            Ok(out)
        }
    }
}

/// What `show` ended up with
#[derive(Debug, PartialEq)]
pub enum ShowOutcome {
    Rendered(String),
    NotFound(QuotationId),
    Ignored,
    Missing,
}

/// Fetch the quotation behind `request` and render the page it asks for.
/// A rendered sales page records a view event.
pub fn show(
    backend: &dyn OrderBackend,
    request: &PageRequest,
    classifier: &LineItemClassifier,
    format: OutputFormat,
    locale: Locale,
) -> Result<ShowOutcome> {
    let id = match request {
        PageRequest::Ignored => return Ok(ShowOutcome::Ignored),
        PageRequest::Missing => return Ok(ShowOutcome::Missing),
        PageRequest::Quotation(id) | PageRequest::Receipt(id) => id,
    };

    info!(backend = backend.name(), offerte_id = %id, "fetching quotation");
    let Some(quotation) = backend
        .fetch_quotation(id)
        .with_context(|| format!("Failed to fetch quotation {}", id))?
    else {
        return Ok(ShowOutcome::NotFound(id.clone()));
    };

    let rendered = match request {
        PageRequest::Receipt(_) => ReceiptPage::build(&quotation).render(format, locale)?,
        _ => {
            if quotation.is_expired(Utc::now()) {
                warn!(offerte_id = %id, valid_until = %quotation.valid_until, "quotation has expired");
            }
            let page = QuotationPage::build(&quotation, classifier).render(format, locale)?;
            backend.track(&TrackingEvent::new(TrackingKind::View, id.clone()));
            page
        }
    };

    Ok(ShowOutcome::Rendered(rendered))
}

/// Request a payment link. The uuid defaults to the quotation id.
pub fn pay(
    backend: &dyn OrderBackend,
    id: &QuotationId,
    uuid: Option<&str>,
    origin: &str,
) -> Result<String, BackendError> {
    let uuid = uuid.unwrap_or(id.as_str());
    let request = PaymentRequest::new(id.clone(), uuid, origin);
    debug!(return_url = %request.return_url, "creating payment link");
    backend.create_payment_link(&request)
}
