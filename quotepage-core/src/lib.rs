// Quotepage Core Library
//
// Classifies quotation line items (wheels vs. accessories, concave
// profiles) and builds the sales and receipt page view-models.
// The order backend is reached through the OrderBackend trait.

pub mod types;
pub mod classifier;
pub mod config;
pub mod page;
pub mod render;
pub mod backend;

// Re-export main types and functions for easy use
pub use types::*;
pub use classifier::LineItemClassifier;
pub use config::{AppConfig, ClassifierConfig, ConcaveThresholds, Locale};
pub use page::{format_currency, PageRequest, PaymentSummary, QuotationPage, ReceiptPage};
pub use render::OutputFormat;
pub use backend::{BackendError, OrderBackend, PaymentRequest, TrackingEvent, TrackingKind};
