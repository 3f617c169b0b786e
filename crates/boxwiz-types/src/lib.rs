//! # boxwiz Types
//!
//! Core types, traits, and enums shared across all boxwiz crates.
//!
//! This crate provides the fundamental building blocks for the configuration
//! wizard, including:
//!
//! - Validated identifiers for saved states and runtime platforms
//! - Common enums for overlay modes, required levels, link kinds and build modes
//! - Collaborator traits for link classification and subscription fetching
//! - Error types and result aliases
//! - Shared limits and well-known outbound names
//!
//! ## Example
//!
//! ```
//! use boxwiz_types::{Platform, StateId};
//!
//! let id = StateId::new("travel").unwrap();
//! assert_eq!(id.file_name(), "travel.json");
//!
//! let linux = Platform::new("linux");
//! assert!(linux.matches(&[], false));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod errors;
pub mod identifiers;
pub mod enums;
pub mod traits;

// Re-export common types for convenience
pub use errors::{WizardError, Result};
pub use identifiers::{StateId, Platform, DARWIN_TUN_ALIAS, MAX_STATE_ID_LENGTH};
pub use enums::{LogLevel, OverlayMode, RequiredLevel, LinkKind, BuildMode};
pub use traits::{LinkClassifier, SubscriptionFetcher};
pub use constants::{DEFAULT_OUTBOUND_TAG, DROP_METHOD, REJECT_ACTION};
