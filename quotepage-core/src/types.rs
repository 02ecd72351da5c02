use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

// ===== WIRE HELPERS =====
// The order backend (Odoo behind an n8n webhook) is loose with types:
// empty text arrives as `false` or `null`, ids as numbers or strings,
// quantities as floats. Every field degrades to its default instead of
// failing the whole quotation.

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    if value.is_finite() && value > 0.0 {
        Ok(value.round().min(u32::MAX as f64) as u32)
    } else {
        Ok(0)
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_payment_mode<'de, D>(deserializer: D) -> Result<Option<PaymentMode>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "deposit" => Some(PaymentMode::Deposit),
            "full" => Some(PaymentMode::Full),
            _ => None,
        },
        _ => None,
    })
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn lenient_currency<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let currency = lenient_string(deserializer)?;
    if currency.trim().is_empty() {
        Ok(default_currency())
    } else {
        Ok(currency)
    }
}

// ===== LINE ITEMS =====

/// One quotation line as delivered by the order backend.
///
/// Only `name`, `size_hint`, `category` and `color` feed the classifier;
/// the remaining fields are passed through to the page untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Free text. First line is the title (optionally `[CODE] Title`),
    /// the following lines are the description.
    #[serde(rename = "product_naam", default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Free-text size specification such as `10.5J x 23`
    #[serde(rename = "size", default, deserialize_with = "lenient_string")]
    pub size_hint: String,
    /// Category or model label, last-resort text for offset extraction
    #[serde(rename = "model", default, deserialize_with = "lenient_string")]
    pub category: String,
    /// Secondary text, used as description when the name has one line
    #[serde(default, deserialize_with = "lenient_string")]
    pub color: String,
    #[serde(rename = "prijs_per_stuk", default, deserialize_with = "lenient_f64")]
    pub unit_price: f64,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub quantity: u32,
    #[serde(rename = "product_id", default, deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub product_code: String,
    #[serde(rename = "afbeelding", default, deserialize_with = "lenient_string")]
    pub image_url: String,
}

impl LineItem {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            quantity: 1,
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size_hint: &str) -> Self {
        self.size_hint = size_hint.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    pub fn with_price(mut self, unit_price: f64) -> Self {
        self.unit_price = unit_price;
        self
    }

    /// Zero-priced lines are shown as "Included" rather than a price
    pub fn is_included(&self) -> bool {
        self.unit_price == 0.0
    }
}

/// Display fields derived from a line item's free-text name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLineItem {
    pub title: String,
    pub description: String,
    pub code: String,
}

/// Concave depth badge for a wheel, derived from its offset (ET).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConcaveProfile {
    Performance,
    Medium,
    Deep,
    #[serde(rename = "Super Deep")]
    SuperDeep,
}

impl ConcaveProfile {
    /// Tier 1..=4 map to increasing depth; 0 (undetermined) has no badge.
    pub fn from_tier(tier: u8) -> Option<Self> {
        match tier {
            1 => Some(ConcaveProfile::Performance),
            2 => Some(ConcaveProfile::Medium),
            3 => Some(ConcaveProfile::Deep),
            4 => Some(ConcaveProfile::SuperDeep),
            _ => None,
        }
    }

    pub fn tier(&self) -> u8 {
        match self {
            ConcaveProfile::Performance => 1,
            ConcaveProfile::Medium => 2,
            ConcaveProfile::Deep => 3,
            ConcaveProfile::SuperDeep => 4,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ConcaveProfile::Performance => "Performance",
            ConcaveProfile::Medium => "Medium",
            ConcaveProfile::Deep => "Deep",
            ConcaveProfile::SuperDeep => "Super Deep",
        }
    }
}

impl fmt::Display for ConcaveProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Position of a wheel on a staggered (two-wheel) set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxleRole {
    Front,
    Rear,
}

/// Classifier output: the original item plus its derived display data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLineItem {
    pub item: LineItem,
    #[serde(flatten)]
    pub parsed: ParsedLineItem,
    pub is_wheel: bool,
    /// Absent for accessories and for wheels without a usable offset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concave_profile: Option<ConcaveProfile>,
}

// ===== QUOTATION =====

/// Quotation identifier. The backend sends numbers (`434`), order
/// references (`S00591`) or UUIDs, so it is kept as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct QuotationId(pub String);

impl QuotationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for QuotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for QuotationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        lenient_string(deserializer).map(QuotationId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Deposit,
    Full,
}

/// A quotation record as returned by the order webhook.
///
/// Monetary values are authoritative backend data; nothing here
/// recomputes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    #[serde(default)]
    pub offerte_id: QuotationId,
    /// Order reference (e.g. `S00591`), shown on the receipt
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub offerte_url: String,
    #[serde(rename = "klant_naam", default, deserialize_with = "lenient_string")]
    pub customer_name: String,
    #[serde(rename = "voertuig", default, deserialize_with = "lenient_string")]
    pub vehicle: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub priority: String,
    #[serde(rename = "producten", default)]
    pub line_items: Vec<LineItem>,
    #[serde(rename = "totaal_excl", default, deserialize_with = "lenient_f64")]
    pub total_excl: f64,
    #[serde(rename = "aantal_regels", default, deserialize_with = "lenient_u32")]
    pub line_count: u32,
    #[serde(rename = "aanbetaling", default, deserialize_with = "lenient_f64")]
    pub deposit: f64,
    #[serde(
        rename = "valuta",
        default = "default_currency",
        deserialize_with = "lenient_currency"
    )]
    pub currency: String,
    #[serde(
        default,
        deserialize_with = "lenient_payment_mode",
        skip_serializing_if = "Option::is_none"
    )]
    pub payment_mode: Option<PaymentMode>,
    #[serde(rename = "geldig_tot", default, deserialize_with = "lenient_string")]
    pub valid_until: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_tax: Option<bool>,
    #[serde(
        rename = "totaal_incl",
        default,
        deserialize_with = "lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_incl: Option<f64>,
}

impl Quotation {
    /// First word of the customer name, used in greetings
    pub fn first_name(&self) -> &str {
        self.customer_name.split_whitespace().next().unwrap_or("")
    }

    /// Parse `valid_until`. Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`
    /// (UTC) and bare dates, which stay valid through the end of that day.
    pub fn valid_until_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.valid_until.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Some(naive.and_utc());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(23, 59, 59))
            .map(|naive| naive.and_utc())
    }

    /// True only when a validity timestamp exists and lies before `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until_at().is_some_and(|until| until < now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_line_item_tolerates_backend_falsy_values() {
        let json = r#"{
            "product_naam": "[AO1] Vehicle Tailored Engineering",
            "size": false,
            "model": null,
            "prijs_per_stuk": "0",
            "quantity": 4.0,
            "product_id": 224
        }"#;
        let item: LineItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.size_hint, "");
        assert_eq!(item.category, "");
        assert_eq!(item.color, "");
        assert_eq!(item.unit_price, 0.0);
        assert_eq!(item.quantity, 4);
        assert_eq!(item.id, 224);
        assert!(item.is_included());
    }

    #[test]
    fn test_quotation_id_accepts_numbers_and_strings() {
        let numeric: Quotation = serde_json::from_str(r#"{"offerte_id": 434}"#).unwrap();
        assert_eq!(numeric.offerte_id.as_str(), "434");

        let reference: Quotation = serde_json::from_str(r#"{"offerte_id": "S00591"}"#).unwrap();
        assert_eq!(reference.offerte_id.as_str(), "S00591");
        assert_eq!(reference.currency, "EUR");
    }

    #[test]
    fn test_concave_profile_serializes_display_names() {
        let json = serde_json::to_string(&ConcaveProfile::SuperDeep).unwrap();
        assert_eq!(json, "\"Super Deep\"");
        assert_eq!(ConcaveProfile::from_tier(0), None);
        assert_eq!(ConcaveProfile::from_tier(2), Some(ConcaveProfile::Medium));
        assert_eq!(ConcaveProfile::Deep.tier(), 3);
    }

    #[test]
    fn test_classified_item_omits_missing_badge() {
        let classified = ClassifiedLineItem {
            item: LineItem::new("Shipping Mainfreight"),
            parsed: ParsedLineItem {
                title: "Shipping Mainfreight".to_string(),
                description: String::new(),
                code: String::new(),
            },
            is_wheel: false,
            concave_profile: None,
        };
        let value = serde_json::to_value(&classified).unwrap();
        assert!(value.get("concave_profile").is_none());
        assert_eq!(value["title"], "Shipping Mainfreight");
        assert_eq!(value["is_wheel"], false);
    }

    #[test]
    fn test_first_name_and_validity() {
        let quotation = Quotation {
            customer_name: "Doris cipi".to_string(),
            valid_until: "2026-03-01".to_string(),
            ..Default::default()
        };
        assert_eq!(quotation.first_name(), "Doris");

        let before = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        assert!(!quotation.is_expired(before));
        assert!(quotation.is_expired(after));

        let undated = Quotation::default();
        assert!(!undated.is_expired(after));
    }
}
