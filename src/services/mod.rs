//! Services module - the icon matching and application engine.
//!
//! Everything here works on plain paths and catalog data; no presentation
//! code. All inputs (style, install root, asset root) are explicit parameters
//! carried by a [`Session`](crate::models::Session).
//!
//! # Components
//!
//! - [`matcher`]: finds style icons and live target files, pairs them by file type
//! - [`paths`]: default Steam install root and the list of installed games
//! - [`extractor`]: copies the bundled `icons/` tree somewhere else
//! - [`thumbnail`]: replaces the cached Steam library image of a game
//! - [`shortcuts`]: points `.url` / `.desktop` shortcuts at the new icon
//! - [`IconApplier`]: runs the per-game pipeline and reports [`OperationOutcome`](crate::models::OperationOutcome)s
//!
//! # Failure model
//!
//! Failures are local to the game and step they happen in. Each becomes an
//! [`ApplyError`], which the applier turns into a failure outcome; the batch
//! always runs to the end. There is no rollback: an icon copied before a
//! thumbnail or shortcut failure stays copied.
//!
//! # Usage Example
//!
//! ```ignore
//! use iconpack::models::Session;
//! use iconpack::services::IconApplier;
//!
//! let applier = IconApplier::new(catalog);
//! let session = Session::new(1, install_root, asset_root);
//! for outcome in applier.apply(&session, &[1, 2]) {
//!     println!("{}", outcome);
//! }
//! ```

pub mod applier;
pub mod error;
pub mod extractor;
pub mod matcher;
pub mod paths;
pub mod shortcuts;
pub mod thumbnail;

pub use applier::{AppliedIcons, IconApplier};
pub use error::ApplyError;
pub use extractor::{ExtractResult, extract};
pub use matcher::{IconAsset, MatchedPair, TargetAsset, find_icons, find_targets, match_pairs};
pub use paths::{available_games, default_root};
pub use shortcuts::{ShortcutEdit, ShortcutFormat, ShortcutUpdater};
pub use thumbnail::{LibraryThumbnailUpdater, ThumbnailUpdate};
