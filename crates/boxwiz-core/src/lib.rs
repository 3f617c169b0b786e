//! # boxwiz Core
//!
//! Core utilities, configuration management, logging, and common functionality
//! for the boxwiz configuration wizard.
//!
//! This crate provides:
//!
//! - **Configuration**: Layered settings (defaults, file, programmatic, environment)
//! - **Logging**: `tracing` bootstrap with optional JSON and file output
//! - **Process Execution**: Running external checkers on generated documents
//! - **File Operations**: Size-limited reads, atomic writes, path expansion
//! - **Time Utilities**: Timestamps, fuzzy ages, duration parsing
//! - **Task Supervision**: Single-flight runs and debounced triggers
//!
//! ## Example
//!
//! ```no_run
//! use boxwiz_core::{config::WizardSettings, log};
//!
//! let settings = WizardSettings::load(None)?;
//! let _guard = log::init(&settings.log)?;
//! # Ok::<(), boxwiz_types::WizardError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod log;
pub mod util;
pub mod time;
pub mod supervisor;

// Re-export commonly used items
pub use config::{Config, LogSettings, WizardSettings};
pub use supervisor::{Admission, Debouncer, RunToken, TaskSupervisor, TriggerPolicy};
pub use boxwiz_types::{WizardError, Result};

/// boxwiz application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// boxwiz application name
pub const APP_NAME: &str = "boxwiz";
