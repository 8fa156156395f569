//! Data models for the IconPack application.
//!
//! - [`Catalog`]: styles and the game mapping loaded from `IconPack Catalog.yaml`
//! - [`StyleDefinition`] / [`GameEntry`]: read-only entries of the catalog
//! - [`UserSettings`]: user preferences loaded from `IconPack Settings.yaml`
//! - [`Session`]: the style and roots a single apply run works against
//! - [`OperationOutcome`]: one result line produced by the apply pipeline

pub mod catalog;
pub mod outcome;
pub mod settings;

pub use catalog::{Catalog, CatalogError, GameEntry, StyleDefinition};
pub use outcome::{ApplyStep, OperationOutcome};
pub use settings::{Session, UserSettings};
