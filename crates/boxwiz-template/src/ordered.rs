//! Order-preserving parsing of the configuration document.
//!
//! Section order is part of the output contract, so the top-level object is
//! decoded into an insertion-ordered map of raw sub-documents.

use boxwiz_types::{WizardError, Result};
use indexmap::IndexMap;
use serde_json::value::RawValue;
use serde_json::Value;

/// Top-level sections of a document in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct OrderedSections {
    sections: IndexMap<String, Box<RawValue>>,
}

impl OrderedSections {
    /// Section names in document order.
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Raw JSON text of a section.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(|raw| raw.get())
    }

    /// Iterate `(name, raw text)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v.get()))
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether there are no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Parse a section as a JSON value.
    pub fn value(&self, name: &str) -> Option<Result<Value>> {
        self.get(name)
            .map(|raw| serde_json::from_str(raw).map_err(WizardError::from))
    }
}

/// Parse a JSON object, keeping its keys in document order.
///
/// A duplicated key keeps its first position and its last value.
pub fn parse_ordered(text: &str) -> Result<OrderedSections> {
    let trimmed = text.trim_start();
    match trimmed.chars().next() {
        Some('{') => {}
        Some(c) => {
            return Err(WizardError::Structural(format!(
                "expected a JSON object, found '{}'",
                c
            )))
        }
        None => return Err(WizardError::Structural("document is empty".to_string())),
    }

    let sections: IndexMap<String, Box<RawValue>> = serde_json::from_str(trimmed)
        .map_err(|e| WizardError::Structural(format!("invalid document: {}", e)))?;

    Ok(OrderedSections { sections })
}

/// Serialize `value` and parse it back into ordered sections.
pub fn sections_from_value(value: &Value) -> Result<OrderedSections> {
    let text = serde_json::to_string(value)?;
    parse_ordered(&text)
}
