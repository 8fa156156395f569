// IconPack - alternate icon artwork installer for Steam games
//
// This is the library crate containing the matching and application engine.
// The binary crate (main.rs) provides a headless runner on top of it.

pub mod batch;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use batch::{BatchEvent, BatchHandle, BatchRunner, BatchSummary, spawn_batch};
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{Catalog, OperationOutcome, Session, UserSettings};
pub use services::{ApplyError, IconApplier};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
