use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, error, warn};

// Import from quotepage-core
use quotepage_core::render::write_output;
use quotepage_core::{
    AppConfig, LineItemClassifier, Locale, OrderBackend, OutputFormat, PageRequest, QuotationId,
    TrackingEvent, TrackingKind,
};

// Import CLI utilities
use quotepage_cli::commands::{self, ShowOutcome};
use quotepage_cli::WebhookClient;

#[derive(Parser)]
#[command(name = "quotepage")]
#[command(about = "Fetch, classify and render wheel quotations")]
struct Args {
    /// Path to custom config file (YAML format)
    /// Defaults to <config dir>/quotepage/config.yaml when present
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: json or text
    #[arg(short = 'f', long, global = true, default_value = "json")]
    format: String,

    /// Number formatting: nl or en (overrides config)
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Output file path (stdout when not specified or "-")
    #[arg(short, long, global = true)]
    output: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify the line items of a quotation JSON file
    Classify {
        /// Quotation, webhook envelope, or bare line-item array
        #[arg(short, long)]
        input: String,
    },

    /// Fetch a quotation and render its page
    Show {
        /// Quotation id (or a page URL ending in the id)
        id: String,

        /// "success" renders the post-payment receipt
        #[arg(long)]
        status: Option<String>,
    },

    /// Create a payment link for a quotation
    Pay {
        id: String,

        /// Origin of the quotation site, used for the return URL
        #[arg(long)]
        origin: String,

        /// Page identifier in the return URL (defaults to the id)
        #[arg(long)]
        uuid: Option<String>,
    },

    /// Send a tracking event (view, exit, click)
    Track {
        kind: String,
        id: String,

        #[arg(long)]
        detail: Option<String>,
    },

    /// Print the effective configuration as YAML
    ShowConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref());
    let format = OutputFormat::parse_or_default(&args.format);
    let locale = match args.locale.as_deref() {
        Some(code) => code.parse::<Locale>()?,
        None => config.display.locale,
    };
    debug!(format = ?format, locale = locale.code(), "effective output settings");

    match &args.command {
        Command::Classify { input } => {
            let classifier = LineItemClassifier::new(&config.classifier)?;
            eprintln!("📄 Classifying: {}", input);
            let classified = commands::classify_file(input, &classifier)?;
            let wheels = classified.iter().filter(|c| c.is_wheel).count();
            eprintln!("✅ {} line items, {} wheels", classified.len(), wheels);
            emit(&commands::render_classified(&classified, format)?, args.output.as_deref())?;
        }

        Command::Show { id, status } => {
            let classifier = LineItemClassifier::new(&config.classifier)?;
            let backend = WebhookClient::new(&config.backend);
            let request = if id.contains("://") {
                PageRequest::resolve(None, None, Some(id.as_str()), status.as_deref())
            } else {
                PageRequest::resolve(Some(id.as_str()), None, None, status.as_deref())
            };

            match commands::show(&backend, &request, &classifier, format, locale) {
                Ok(ShowOutcome::Rendered(page)) => emit(&page, args.output.as_deref())?,
                Ok(ShowOutcome::NotFound(id)) => {
                    eprintln!("⚠️  Configuration not found: {}", id);
                    std::process::exit(1);
                }
                Ok(ShowOutcome::Ignored) => {
                    debug!(id = %id, "reserved path, nothing to render");
                }
                Ok(ShowOutcome::Missing) => {
                    eprintln!("⚠️  No configuration ID found");
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("show failed: {:#}", e);
                    eprintln!("❌ Something went wrong. Please try again or contact us.");
                    std::process::exit(1);
                }
            }
        }

        Command::Pay { id, origin, uuid } => {
            let backend = WebhookClient::new(&config.backend);
            let id = QuotationId::new(id.as_str());
            match commands::pay(&backend, &id, uuid.as_deref(), origin) {
                Ok(url) => {
                    eprintln!("💳 Payment link created");
                    emit(&url, args.output.as_deref())?;
                }
                Err(e) => {
                    debug!("payment link error: {e}");
                    eprintln!("❌ Failed to create payment. Please try again or contact us.");
                    std::process::exit(1);
                }
            }
        }

        Command::Track { kind, id, detail } => {
            // Tracking never fails the caller
            match kind.parse::<TrackingKind>() {
                Ok(kind) => {
                    let backend = WebhookClient::new(&config.backend);
                    let mut event = TrackingEvent::new(kind, QuotationId::new(id.as_str()));
                    if let Some(detail) = detail {
                        event = event.with_detail(detail.as_str());
                    }
                    backend.track(&event);
                    eprintln!("📡 Tracking event sent: {:?}", kind);
                }
                Err(e) => warn!("{e}, event dropped"),
            }
        }

        Command::ShowConfig => {
            emit(&config.to_yaml()?, args.output.as_deref())?;
        }
    }

    Ok(())
}

/// Status lines and diagnostics go to stderr; stdout carries rendered output
fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Explicit --config, else the default path when it exists; then env overrides
fn load_config(explicit: Option<&str>) -> AppConfig {
    let default_path = AppConfig::default_path(dirs::config_dir()).filter(|p| p.exists());

    let mut config = match (explicit, &default_path) {
        (Some(path), _) => {
            eprintln!("📋 Loaded config from: {}", path);
            AppConfig::load_with_fallback(Some(path))
        }
        (None, Some(path)) => {
            let path = path.to_string_lossy();
            eprintln!("📋 Loaded config from: {}", path);
            AppConfig::load_with_fallback(Some(&path))
        }
        (None, None) => {
            eprintln!("📋 Using default config");
            AppConfig::default()
        }
    };

    config.apply_env();
    config
}

fn emit(rendered: &str, output: Option<&str>) -> Result<()> {
    write_output(rendered, output)
        .with_context(|| format!("Failed to write output to {}", output.unwrap_or("stdout")))?;
    if let Some(path) = output.filter(|p| *p != "-") {
        eprintln!("💾 Saved to: {}", PathBuf::from(path).display());
    }
    Ok(())
}
