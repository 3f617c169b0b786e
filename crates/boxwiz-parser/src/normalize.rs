//! Normalization and stable serialization of parser configurations.

use boxwiz_core::time::now_rfc3339;
use boxwiz_types::constants::{DEFAULT_RELOAD, PARSER_CONFIG_VERSION};
use boxwiz_types::{Result, WizardError};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::model::{ParserConfig, ParserConfigFile};

/// Stamp the version, fill parser defaults and optionally refresh the
/// `last_updated` timestamp.
pub fn normalize(config: &mut ParserConfig, refresh: bool) {
    if config.version == 0 {
        config.version = PARSER_CONFIG_VERSION;
    }
    if config.parser.reload.is_empty() {
        config.parser.reload = DEFAULT_RELOAD.to_string();
    }
    if refresh {
        config.parser.last_updated = now_rfc3339();
    }
}

/// Serialize with a 2-space indent inside the `ParserConfig` wrapper.
///
/// The configuration is normalized first, without a timestamp refresh.
pub fn serialize(config: &ParserConfig) -> Result<String> {
    let mut config = config.clone();
    normalize(&mut config, false);
    to_pretty(&ParserConfigFile { parser_config: config })
}

/// Parse wrapped parser-config text.
pub fn parse(text: &str) -> Result<ParserConfig> {
    let file: ParserConfigFile = serde_json::from_str(text)
        .map_err(|e| WizardError::Structural(format!("failed to parse ParserConfig: {}", e)))?;
    Ok(file.parser_config)
}

/// Parse, normalize and re-serialize parser-config text.
///
/// Returns `None` when the text does not parse; callers pass it through
/// unchanged so the user can fix it.
pub fn normalize_text(text: &str, refresh: bool) -> Option<String> {
    let mut config = match parse(text) {
        Ok(config) => config,
        Err(e) => {
            debug!(error = %e, "parser config left as written");
            return None;
        }
    };
    normalize(&mut config, refresh);
    to_pretty(&ParserConfigFile { parser_config: config }).ok()
}

fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"  "));
    value.serialize(&mut ser)?;
    String::from_utf8(out).map_err(|e| WizardError::Bug(format!("serializer produced invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProxySource;

    #[test]
    fn test_normalize_fills_defaults() {
        let mut config = ParserConfig::default();
        normalize(&mut config, false);
        assert_eq!(config.version, 3);
        assert_eq!(config.parser.reload, "4h");
        assert!(config.parser.last_updated.is_empty());

        normalize(&mut config, true);
        assert!(boxwiz_core::time::parse_rfc3339(&config.parser.last_updated).is_some());
    }

    #[test]
    fn test_keeps_explicit_values() {
        let mut config = ParserConfig {
            version: 2,
            ..Default::default()
        };
        config.parser.reload = "30m".to_string();
        normalize(&mut config, false);
        assert_eq!(config.version, 2);
        assert_eq!(config.parser.reload, "30m");
    }

    #[test]
    fn test_serialize_layout() {
        let config = ParserConfig {
            proxies: vec![ProxySource::subscription("https://example.com/sub")],
            ..Default::default()
        };
        let text = serialize(&config).unwrap();
        assert_eq!(
            text,
            "{\n  \"ParserConfig\": {\n    \"version\": 3,\n    \"proxies\": [\n      {\n        \"source\": \"https://example.com/sub\"\n      }\n    ],\n    \"outbounds\": [],\n    \"parser\": {\n      \"reload\": \"4h\"\n    }\n  }\n}"
        );
    }

    #[test]
    fn test_normalize_text_is_idempotent_without_refresh() {
        let input = r#"{"ParserConfig": {"proxies": [{"connections": ["vless://a@b:1"]}], "outbounds": [{"tag": "x", "type": "selector"}]}}"#;
        let once = normalize_text(input, false).unwrap();
        let twice = normalize_text(&once, false).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_text_passes_on_garbage() {
        assert!(normalize_text("{ not json", true).is_none());
        assert!(parse("[]").unwrap_err().is_structural());
    }
}
