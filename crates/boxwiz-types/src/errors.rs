//! Error types for boxwiz operations.

use thiserror::Error;

/// The main error type for wizard operations.
///
/// Variants follow the failure taxonomy of the merge engine: structural
/// problems with documents, validation failures on user input, and errors
/// surfaced by external collaborators.
#[derive(Error, Debug)]
pub enum WizardError {
    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Template file could not be loaded or understood
    #[error("Template error: {0}")]
    Template(String),

    /// Malformed JSON, wrong top-level shape, or an overlay type mismatch
    #[error("Structural error: {0}")]
    Structural(String),

    /// Oversized input, empty required field, malformed URL or tag problems
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure reported by the outbound generator
    #[error("Outbound generation failed: {0}")]
    Generator(String),

    /// Subscription fetch failure
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Wizard state persistence error
    #[error("State error: {0}")]
    State(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal bug - should never happen in production
    #[error("Bug detected: {0}\n\nThis is an internal error. Please report this issue at:\nhttps://github.com/boxwiz/boxwiz/issues")]
    Bug(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl WizardError {
    /// Whether this error came from a malformed document rather than bad input.
    pub fn is_structural(&self) -> bool {
        matches!(self, WizardError::Structural(_) | WizardError::Json(_))
    }
}

/// A specialized Result type for wizard operations.
pub type Result<T> = std::result::Result<T, WizardError>;

/// Helper macro to create and return a WizardError::Bug
///
/// This should be used for conditions that should never occur
/// in normal operation.
///
/// # Example
///
/// ```ignore
/// if some_impossible_condition {
///     bug!("This should never happen: {:?}", condition);
/// }
/// ```
#[macro_export]
macro_rules! bug {
    ($msg:expr) => {
        return Err($crate::WizardError::Bug($msg.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::WizardError::Bug(format!($fmt, $($arg)*)))
    };
}

/// Helper macro to bail out with a WizardError
///
/// # Example
///
/// ```ignore
/// if text.is_empty() {
///     bail!(Validation, "ParserConfig is empty");
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($variant:ident, $msg:expr) => {
        return Err($crate::WizardError::$variant($msg.to_string()))
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::WizardError::$variant(format!($fmt, $($arg)*)))
    };
    ($msg:expr) => {
        return Err($crate::WizardError::Other($msg.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::WizardError::Other(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fails_validation(len: usize) -> Result<()> {
        if len > 3 {
            bail!(Validation, "length {} exceeds {}", len, 3);
        }
        Ok(())
    }

    #[test]
    fn test_bail_formats_variant() {
        let err = fails_validation(5).unwrap_err();
        assert!(matches!(err, WizardError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: length 5 exceeds 3");
        assert!(fails_validation(2).is_ok());
    }

    #[test]
    fn test_json_errors_are_structural() {
        let err: WizardError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(err.is_structural());
        assert!(!WizardError::Validation("x".into()).is_structural());
    }
}
