use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Environment variable that points at the n8n instance
pub const BASE_URL_ENV: &str = "N8N_BASE_URL";

// Default value functions for serde
fn default_timeout_secs() -> u64 {
    20
}

fn default_wheel_keywords() -> Vec<String> {
    vec!["inch".to_string()]
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Order backend (n8n webhooks) connection settings
    #[serde(default)]
    pub backend: BackendConfig,
    /// Line-item classification settings
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Presentation settings
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the webhook host, e.g. `https://n8n.example.com`
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Separate host for tracking events (falls back to `base_url`)
    #[serde(default)]
    pub tracking_base_url: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            tracking_base_url: None,
        }
    }
}

impl BackendConfig {
    /// Base URL with any trailing slash removed; None when unset or blank
    pub fn webhook_base(&self) -> Option<String> {
        normalize_base(self.base_url.as_deref())
    }

    /// Tracking host, falling back to the main webhook host
    pub fn tracking_base(&self) -> Option<String> {
        normalize_base(self.tracking_base_url.as_deref()).or_else(|| self.webhook_base())
    }
}

fn normalize_base(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.trim_end_matches('/').to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Case-insensitive substrings that mark a line item as a wheel
    #[serde(default = "default_wheel_keywords")]
    pub wheel_keywords: Vec<String>,
    /// Offset (ET) boundaries of the concave tiers
    #[serde(default)]
    pub concave: ConcaveThresholds,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            wheel_keywords: default_wheel_keywords(),
            concave: ConcaveThresholds::default(),
        }
    }
}

/// Inclusive offset boundaries. Lower offset means deeper concave:
///
/// - `performance_min..=performance_max` -> Performance
/// - `medium_min..performance_min` -> Medium
/// - `deep_min..medium_min` -> Deep
/// - `..deep_min` -> Super Deep (open ended, negatives included)
///
/// Anything above `performance_max` has no tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcaveThresholds {
    pub performance_max: i32,
    pub performance_min: i32,
    pub medium_min: i32,
    pub deep_min: i32,
}

impl Default for ConcaveThresholds {
    fn default() -> Self {
        Self {
            performance_max: 100,
            performance_min: 41,
            medium_min: 31,
            deep_min: 21,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Dutch number formatting (`€ 5.348`)
    #[default]
    Nl,
    /// English number formatting (`€5,348`)
    En,
}

impl std::str::FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nl" | "nl-nl" => Ok(Locale::Nl),
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            other => Err(anyhow::anyhow!("Unknown locale '{other}' (expected nl or en)")),
        }
    }
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::Nl => "nl",
            Locale::En => "en",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub locale: Locale,
}

impl AppConfig {
    /// Load config from file path (functional approach)
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!("Failed to load config from {}, using defaults ({})", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Default location: `<config dir>/quotepage/config.yaml`
    pub fn default_path(config_dir: Option<PathBuf>) -> Option<PathBuf> {
        config_dir.map(|dir| dir.join("quotepage").join("config.yaml"))
    }

    /// Apply `N8N_BASE_URL` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_base_url_override(std::env::var(BASE_URL_ENV).ok());
    }

    /// Environment values win over the file; blank values are ignored
    pub fn apply_base_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.backend.base_url = Some(url);
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
