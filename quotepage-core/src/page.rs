//! Page view-models
//!
//! Turns a backend quotation into what the sales page and the
//! post-payment receipt display. All amounts come from the backend;
//! this module only picks and formats them.

use crate::classifier::LineItemClassifier;
use crate::config::Locale;
use crate::types::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Path segments that browsers request on their own and that must never
/// be looked up as quotation ids.
pub const RESERVED_IDS: [&str; 3] = ["favicon.ico", "robots.txt", "sitemap.xml"];

/// Code shown on the main row when the product name carries none
pub const MAIN_ROW_FALLBACK_CODE: &str = "WHEEL-SET";
/// Code shown on accessory rows when the product name carries none
pub const ROW_FALLBACK_CODE: &str = "ENG-OPT";

/// Which page an incoming request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// Sales page for an open quotation
    Quotation(QuotationId),
    /// Confirmation page after the payment provider redirected back
    Receipt(QuotationId),
    /// A reserved path such as `favicon.ico`; render nothing
    Ignored,
    /// No identifier could be found anywhere
    Missing,
}

impl PageRequest {
    /// Resolve the quotation id from, in order: the path parameter, the
    /// query parameter, and the last segment of a forwarded URL.
    pub fn resolve(
        path_id: Option<&str>,
        query_id: Option<&str>,
        forwarded_url: Option<&str>,
        status: Option<&str>,
    ) -> Self {
        let id = non_blank(path_id)
            .or_else(|| non_blank(query_id))
            .or_else(|| forwarded_url.and_then(last_path_segment));

        let Some(id) = id else {
            return PageRequest::Missing;
        };

        if RESERVED_IDS.contains(&id.as_str()) {
            return PageRequest::Ignored;
        }

        let id = QuotationId::new(id);
        if status == Some("success") {
            PageRequest::Receipt(id)
        } else {
            PageRequest::Quotation(id)
        }
    }

    pub fn id(&self) -> Option<&QuotationId> {
        match self {
            PageRequest::Quotation(id) | PageRequest::Receipt(id) => Some(id),
            PageRequest::Ignored | PageRequest::Missing => None,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Last non-empty path segment of an absolute URL (query and fragment ignored)
fn last_path_segment(url: &str) -> Option<String> {
    let (_, after_scheme) = url.split_once("://")?;
    let path = after_scheme
        .split_once('/')
        .map(|(_, path)| path)
        .unwrap_or("");
    let path = path.split(['?', '#']).next().unwrap_or("");

    path.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// One rendered line of the build configuration table.
#[derive(Debug, Clone, Serialize)]
pub struct LineRow {
    pub code: String,
    pub title: String,
    pub description: String,
    pub size: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub included: bool,
    pub is_wheel: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concave_profile: Option<ConcaveProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axle: Option<AxleRole>,
}

impl LineRow {
    fn from_classified(
        classified: ClassifiedLineItem,
        axle: Option<AxleRole>,
        fallback_code: &str,
    ) -> Self {
        let ClassifiedLineItem {
            item,
            parsed,
            is_wheel,
            concave_profile,
        } = classified;

        let code = if parsed.code.is_empty() {
            fallback_code.to_string()
        } else {
            parsed.code
        };

        Self {
            code,
            title: parsed.title,
            description: parsed.description,
            size: item.size_hint.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            included: item.is_included(),
            is_wheel,
            concave_profile,
            axle,
        }
    }
}

/// Everything the sales page shows for one quotation.
#[derive(Debug, Clone, Serialize)]
pub struct QuotationPage {
    pub offerte_id: QuotationId,
    pub first_name: String,
    pub vehicle: String,
    pub currency: String,
    /// First row after classification; None for an empty quotation
    pub main: Option<LineRow>,
    pub rows: Vec<LineRow>,
    pub total_excl: f64,
    pub deposit: f64,
    pub image_url: String,
}

impl QuotationPage {
    pub fn build(quotation: &Quotation, classifier: &LineItemClassifier) -> Self {
        let mut classified = classifier
            .classify_with_roles(&quotation.line_items)
            .into_iter();

        let main = classified.next();
        let image_url = main
            .as_ref()
            .map(|(c, _)| c.item.image_url.clone())
            .unwrap_or_default();
        let main = main.map(|(c, axle)| LineRow::from_classified(c, axle, MAIN_ROW_FALLBACK_CODE));

        let rows = classified
            .map(|(c, axle)| LineRow::from_classified(c, axle, ROW_FALLBACK_CODE))
            .collect();

        Self {
            offerte_id: quotation.offerte_id.clone(),
            first_name: quotation.first_name().to_string(),
            vehicle: quotation.vehicle.clone(),
            currency: quotation.currency.clone(),
            main,
            rows,
            total_excl: quotation.total_excl,
            deposit: quotation.deposit,
            image_url,
        }
    }
}

/// What was paid, as shown on the receipt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentSummary {
    pub is_full_payment: bool,
    pub paid_amount: f64,
    pub label: &'static str,
    /// Only present for deposit payments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_balance: Option<f64>,
}

impl PaymentSummary {
    /// A payment is full when the backend says so, or when the deposit
    /// already covers the total.
    pub fn from_quotation(quotation: &Quotation) -> Self {
        let is_full_payment = quotation.payment_mode == Some(PaymentMode::Full)
            || quotation.deposit >= quotation.total_excl;

        if is_full_payment {
            Self {
                is_full_payment,
                paid_amount: quotation.total_excl,
                label: "Total Paid",
                remaining_balance: None,
            }
        } else {
            Self {
                is_full_payment,
                paid_amount: quotation.deposit,
                label: "Deposit Paid",
                remaining_balance: Some(quotation.total_excl - quotation.deposit),
            }
        }
    }
}

/// Post-payment confirmation page.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptPage {
    pub display_id: String,
    pub customer_name: String,
    pub first_name: String,
    pub vehicle: String,
    pub currency: String,
    pub payment: PaymentSummary,
    pub auth_reference: String,
}

impl ReceiptPage {
    pub fn build(quotation: &Quotation) -> Self {
        let display_id = if quotation.name.trim().is_empty() {
            warn!(offerte_id = %quotation.offerte_id, "quotation has no order reference");
            "—".to_string()
        } else {
            quotation.name.clone()
        };

        Self {
            display_id,
            customer_name: quotation.customer_name.clone(),
            first_name: quotation.first_name().to_string(),
            vehicle: quotation.vehicle.clone(),
            currency: quotation.currency.clone(),
            payment: PaymentSummary::from_quotation(quotation),
            auth_reference: auth_reference(quotation),
        }
    }
}

/// Stable 9-character reference printed on the receipt
pub fn auth_reference(quotation: &Quotation) -> String {
    let mut hasher = Sha256::new();
    hasher.update(quotation.offerte_id.as_str());
    hasher.update(b"\n");
    hasher.update(&quotation.name);
    let digest = format!("{:x}", hasher.finalize());
    digest[..9].to_uppercase()
}

/// Format an amount in whole currency units.
///
/// `Locale::Nl` gives `€ 5.348`, `Locale::En` gives `€5,348`.
pub fn format_currency(amount: f64, currency: &str, locale: Locale) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let separator = match locale {
        Locale::Nl => '.',
        Locale::En => ',',
    };
    let grouped = group_thousands(&digits, separator);

    let code = currency.trim().to_uppercase();
    let symbol = match code.as_str() {
        "EUR" => "€",
        "USD" => "$",
        "GBP" => "£",
        _ => "",
    };

    let body = match (symbol, locale) {
        ("", _) => format!("{} {}", code, grouped),
        (symbol, Locale::Nl) => format!("{} {}", symbol, grouped),
        (symbol, Locale::En) => format!("{}{}", symbol, grouped),
    };

    if negative {
        format!("-{}", body)
    } else {
        body
    }
}

fn group_thousands(digits: &str, separator: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_precedence() {
        let req = PageRequest::resolve(Some("S00591"), Some("ignored"), None, None);
        assert_eq!(req, PageRequest::Quotation(QuotationId::new("S00591")));

        let req = PageRequest::resolve(Some("  "), Some("434"), None, None);
        assert_eq!(req, PageRequest::Quotation(QuotationId::new("434")));

        let req = PageRequest::resolve(
            None,
            None,
            Some("https://quote.example.com/offerte/S00591?status=success"),
            Some("success"),
        );
        assert_eq!(req, PageRequest::Receipt(QuotationId::new("S00591")));
    }

    #[test]
    fn test_resolve_reserved_and_missing() {
        assert_eq!(
            PageRequest::resolve(Some("favicon.ico"), None, None, None),
            PageRequest::Ignored
        );
        assert_eq!(
            PageRequest::resolve(None, None, Some("https://quote.example.com/"), None),
            PageRequest::Missing
        );
        assert_eq!(PageRequest::resolve(None, None, Some("not a url"), None), PageRequest::Missing);
        assert_eq!(PageRequest::Missing.id(), None);
    }

    #[test]
    fn test_payment_summary_deposit() {
        let quotation = Quotation {
            total_excl: 5348.0,
            deposit: 1337.0,
            ..Default::default()
        };
        let summary = PaymentSummary::from_quotation(&quotation);
        assert!(!summary.is_full_payment);
        assert_eq!(summary.paid_amount, 1337.0);
        assert_eq!(summary.label, "Deposit Paid");
        assert_eq!(summary.remaining_balance, Some(4011.0));
    }

    #[test]
    fn test_payment_summary_full() {
        let by_mode = Quotation {
            total_excl: 5348.0,
            deposit: 1337.0,
            payment_mode: Some(PaymentMode::Full),
            ..Default::default()
        };
        let summary = PaymentSummary::from_quotation(&by_mode);
        assert!(summary.is_full_payment);
        assert_eq!(summary.paid_amount, 5348.0);
        assert_eq!(summary.label, "Total Paid");
        assert_eq!(summary.remaining_balance, None);

        let by_amount = Quotation {
            total_excl: 1000.0,
            deposit: 1000.0,
            ..Default::default()
        };
        assert!(PaymentSummary::from_quotation(&by_amount).is_full_payment);
    }

    #[test]
    fn test_receipt_display_id_fallback() {
        let receipt = ReceiptPage::build(&Quotation::default());
        assert_eq!(receipt.display_id, "—");

        let quotation = Quotation {
            name: "S00591".to_string(),
            offerte_id: QuotationId::new("434"),
            ..Default::default()
        };
        let receipt = ReceiptPage::build(&quotation);
        assert_eq!(receipt.display_id, "S00591");
        assert_eq!(receipt.auth_reference.len(), 9);
        assert_eq!(receipt.auth_reference, auth_reference(&quotation));
        assert_eq!(receipt.auth_reference, receipt.auth_reference.to_uppercase());
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(5348.0, "EUR", Locale::Nl), "€ 5.348");
        assert_eq!(format_currency(5348.0, "EUR", Locale::En), "€5,348");
        assert_eq!(format_currency(1337.4, "USD", Locale::En), "$1,337");
        assert_eq!(format_currency(0.0, "EUR", Locale::Nl), "€ 0");
        assert_eq!(format_currency(1234567.0, "GBP", Locale::Nl), "£ 1.234.567");
        assert_eq!(format_currency(-250.0, "EUR", Locale::Nl), "-€ 250");
        assert_eq!(format_currency(999.0, "chf", Locale::En), "CHF 999");
    }

    #[test]
    fn test_page_rows_use_fallback_codes() {
        let quotation = Quotation {
            line_items: vec![
                LineItem::new("Shipping Mainfreight\nCalculated afterwards"),
                LineItem::new("PS20 Satin Grey 23 inch").with_price(1337.0),
            ],
            ..Default::default()
        };
        let page = QuotationPage::build(&quotation, &LineItemClassifier::default());
        let main = page.main.expect("main row");
        assert_eq!(main.code, MAIN_ROW_FALLBACK_CODE);
        assert!(main.is_wheel);
        assert!(!main.included);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].code, ROW_FALLBACK_CODE);
        assert!(page.rows[0].included);
    }
}
