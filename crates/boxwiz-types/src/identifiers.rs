//! Type-safe identifiers.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{WizardError, Result};

/// Maximum length of a saved wizard state identifier.
pub const MAX_STATE_ID_LENGTH: usize = 50;

/// A validated name for a saved wizard state.
///
/// State IDs double as file names inside the state directory, so they are
/// limited to ASCII letters, digits, hyphens and underscores.
///
/// # Example
///
/// ```
/// use boxwiz_types::StateId;
///
/// let id = StateId::new("home-office_2").unwrap();
/// assert_eq!(id.as_str(), "home-office_2");
///
/// assert!(StateId::new("../escape").is_err());
/// assert!(StateId::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(String);

impl StateId {
    /// Create a new validated state ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is empty, too long, or contains
    /// characters outside `[a-zA-Z0-9_-]`.
    pub fn new(id: impl AsRef<str>) -> Result<Self> {
        let id = id.as_ref();
        if id.is_empty() {
            return Err(WizardError::Validation("state ID cannot be empty".to_string()));
        }
        if id.len() > MAX_STATE_ID_LENGTH {
            return Err(WizardError::Validation(format!(
                "state ID exceeds maximum length of {} characters",
                MAX_STATE_ID_LENGTH
            )));
        }
        let pattern = Regex::new(r"^[a-zA-Z0-9_-]+$")
            .map_err(|e| WizardError::Bug(format!("Invalid regex: {}", e)))?;
        if !pattern.is_match(id) {
            return Err(WizardError::Validation(
                "state ID can only contain letters (a-z, A-Z), numbers (0-9), hyphen (-), and underscore (_)"
                    .to_string(),
            ));
        }
        Ok(Self(id.to_string()))
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name used to persist this state.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StateId {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Platform alias that only matches on darwin while TUN mode is enabled.
pub const DARWIN_TUN_ALIAS: &str = "darwin-tun";

/// Runtime platform identifier as used by template platform scopes.
///
/// Templates name platforms the way Go's `GOOS` does (`windows`, `linux`,
/// `darwin`), so Rust's `macos` is reported as `darwin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Platform(String);

impl Platform {
    /// Create a platform from an explicit identifier.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == "macos" {
            return Self("darwin".to_string());
        }
        Self(name)
    }

    /// Platform of the running process.
    pub fn current() -> Self {
        Self::new(std::env::consts::OS)
    }

    /// Get the platform name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the platform whose overlays depend on the TUN flag.
    pub fn is_darwin(&self) -> bool {
        self.0 == "darwin"
    }

    /// Check a platform scope list against this platform.
    ///
    /// An empty scope matches everything. Otherwise the scope must name this
    /// platform, or contain [`DARWIN_TUN_ALIAS`] while running on darwin with
    /// `enable_tun` set.
    pub fn matches(&self, scope: &[String], enable_tun: bool) -> bool {
        if scope.is_empty() {
            return true;
        }
        scope.iter().any(|p| {
            p == &self.0 || (self.is_darwin() && enable_tun && p == DARWIN_TUN_ALIAS)
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Platform {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(WizardError::Validation("platform cannot be empty".to_string()));
        }
        Ok(Self::new(s.trim()))
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}
