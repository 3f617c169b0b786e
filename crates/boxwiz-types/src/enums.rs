//! Common enumerations used throughout boxwiz.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{WizardError, Result};

/// Log level enumeration for the logging system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    #[default]
    Info,
    /// Debug messages
    Debug,
    /// Detailed trace messages
    Trace,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(WizardError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_directive())
    }
}

/// How a platform overlay combines its value with the existing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    /// Overwrite the existing value (the default when no mode is given)
    #[default]
    Replace,
    /// Concatenate overlay-then-existing arrays
    Prepend,
    /// Concatenate existing-then-overlay arrays
    Append,
}

impl FromStr for OverlayMode {
    type Err = WizardError;

    /// An empty mode string means `replace`; anything unrecognized is a
    /// structural error.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "replace" => Ok(OverlayMode::Replace),
            "prepend" => Ok(OverlayMode::Prepend),
            "append" => Ok(OverlayMode::Append),
            other => Err(WizardError::Structural(format!("unknown overlay mode: {}", other))),
        }
    }
}

impl fmt::Display for OverlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayMode::Replace => write!(f, "replace"),
            OverlayMode::Prepend => write!(f, "prepend"),
            OverlayMode::Append => write!(f, "append"),
        }
    }
}

/// Enforcement level of a template outbound, read from `wizard.required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequiredLevel {
    /// Not enforced (`required <= 0` or absent)
    None,
    /// Seeded once when the tag is missing; user edits win afterwards
    IfMissing,
    /// Overwritten from the template on every load
    Always,
}

impl From<i64> for RequiredLevel {
    fn from(level: i64) -> Self {
        match level {
            i64::MIN..=0 => RequiredLevel::None,
            1 => RequiredLevel::IfMissing,
            _ => RequiredLevel::Always,
        }
    }
}

/// Classification of one line of subscription input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    /// An http(s) URL whose content lists connections
    Subscription,
    /// A single proxy connection link (vless://, trojan://, ...)
    Direct,
    /// Anything else; dropped by the reconciler
    Unknown,
}

/// Which flavor of document build is being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Interactive preview; large outbound lists collapse into a summary
    Preview,
    /// Final save; refreshes the parser-config timestamp
    Save,
}

impl BuildMode {
    /// Whether this build refreshes `parser.last_updated`.
    pub fn refreshes_timestamp(&self) -> bool {
        matches!(self, BuildMode::Save)
    }

    /// Whether this build may summarize the generated outbounds.
    pub fn is_preview(&self) -> bool {
        matches!(self, BuildMode::Preview)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Preview => write!(f, "preview"),
            BuildMode::Save => write!(f, "save"),
        }
    }
}
