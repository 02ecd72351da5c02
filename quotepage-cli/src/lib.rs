// All classification and page logic is in quotepage-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod commands;
pub mod webhook;

// Re-export core types for convenience
pub use quotepage_core::*;

// Re-export CLI utilities
pub use webhook::WebhookClient;
