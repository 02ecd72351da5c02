use crate::config::Locale;
use crate::page::{format_currency, LineRow, QuotationPage, ReceiptPage};
use crate::types::AxleRole;
use anyhow::Result;
use std::fmt::Write as _;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

impl OutputFormat {
    /// Unknown names fall back to JSON with a warning
    pub fn parse_or_default(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "text" | "txt" => OutputFormat::Text,
            other => {
                warn!("Unknown output format '{}', using json", other);
                OutputFormat::Json
            }
        }
    }
}

impl QuotationPage {
    pub fn render(&self, format: OutputFormat, locale: Locale) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.to_text(locale)),
        }
    }

    pub fn to_text(&self, locale: Locale) -> String {
        let money = |amount: f64| format_currency(amount, &self.currency, locale);
        let mut out = String::new();

        let _ = writeln!(out, "Configuration ID: {}", self.offerte_id);
        let _ = writeln!(out, "Prepared for {}", self.first_name);
        if !self.vehicle.is_empty() {
            let _ = writeln!(out, "Vehicle: {}", self.vehicle);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Build Configuration");

        for row in self.main.iter().chain(self.rows.iter()) {
            write_row(&mut out, row, &money);
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Total Value (Excl. VAT): {}", money(self.total_excl));
        let _ = writeln!(out, "Deposit Required: {}", money(self.deposit));
        out
    }
}

fn write_row(out: &mut String, row: &LineRow, money: &dyn Fn(f64) -> String) {
    let price = if row.included {
        "Included".to_string()
    } else {
        money(row.unit_price)
    };
    let _ = writeln!(
        out,
        "  [{}] {}  x{}  {}",
        row.code, row.title, row.quantity, price
    );

    let mut tags = Vec::new();
    if let Some(axle) = row.axle {
        tags.push(match axle {
            AxleRole::Front => "Front".to_string(),
            AxleRole::Rear => "Rear".to_string(),
        });
    }
    if let Some(profile) = row.concave_profile {
        tags.push(format!("{} Concave", profile));
    }
    if !row.size.is_empty() {
        tags.push(row.size.clone());
    }
    if !tags.is_empty() {
        let _ = writeln!(out, "      {}", tags.join(" | "));
    }

    for line in row.description.lines().filter(|l| !l.trim().is_empty()) {
        let _ = writeln!(out, "      {}", line.trim_end());
    }
}

impl ReceiptPage {
    pub fn render(&self, format: OutputFormat, locale: Locale) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.to_text(locale)),
        }
    }

    pub fn to_text(&self, locale: Locale) -> String {
        let money = |amount: f64| format_currency(amount, &self.currency, locale);
        let mut out = String::new();

        let _ = writeln!(out, "Production Slot Secured");
        let _ = writeln!(out, "Thank you, {}.", self.first_name);
        let _ = writeln!(out);
        let _ = writeln!(out, "Receipt for: {}", self.customer_name);
        let _ = writeln!(out, "Configuration ID: {}", self.display_id);
        let _ = writeln!(out, "Vehicle: {}", self.vehicle);
        let _ = writeln!(
            out,
            "{}: {}",
            self.payment.label,
            money(self.payment.paid_amount)
        );
        if let Some(remaining) = self.payment.remaining_balance {
            let _ = writeln!(out, "Remaining Balance: {}", money(remaining));
        }
        let _ = writeln!(out, "AUTH: {}", self.auth_reference);
        out
    }
}

/// Write a rendered page to a file or stdout (`-` or None)
pub fn write_output(rendered: &str, path: Option<&str>) -> Result<()> {
    match path {
        Some(p) if p != "-" => std::fs::write(p, rendered)?,
        _ => println!("{}", rendered),
    }
    Ok(())
}
