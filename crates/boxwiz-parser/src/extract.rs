//! Reading the `@ParserConfig` block back out of a generated document.

use boxwiz_core::util::slurp_limited;
use boxwiz_types::constants::{MAX_JSON_CONFIG_SIZE, PARSER_CONFIG_VERSION};
use boxwiz_types::{bail, Result, WizardError};
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::model::ParserConfig;
use crate::normalize::{parse, serialize};
use crate::required::ensure_required_from_text;

/// Opening text of the parser-config comment block.
pub const PARSER_CONFIG_MARKER: &str = "/** @ParserConfig";

/// Where [`load_existing`] found its parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// The `@ParserConfig` block of an existing document
    Document,
    /// The template, because no document exists yet
    Template,
    /// Neither; the caller keeps its defaults
    Empty,
}

/// Parser configuration recovered for a new wizard session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingConfig {
    /// Where the configuration came from
    pub origin: ConfigOrigin,
    /// Serialized, wrapped parser configuration
    pub parser_config: String,
    /// Source URLs and direct links, one per line
    pub source_lines: String,
}

/// Raw JSON text inside the `/** @ParserConfig ... */` comment.
pub fn extract_block(document: &str) -> Result<String> {
    let pattern = Regex::new(r"/\*\*\s*@ParserConfig\s*\n([\s\S]*?)\*/")
        .map_err(|e| WizardError::Bug(format!("Invalid regex: {}", e)))?;
    match pattern.captures(document).and_then(|caps| caps.get(1)) {
        Some(block) => Ok(block.as_str().trim().to_string()),
        None => bail!(Structural, "@ParserConfig block not found"),
    }
}

/// Parse the parser configuration embedded in a generated document.
///
/// Only unversioned and current-version blocks are accepted.
pub fn extract_parser_config(document: &str) -> Result<ParserConfig> {
    let block = extract_block(document)?;
    let config = parse(&block)?;
    if config.version != 0 && config.version != PARSER_CONFIG_VERSION {
        bail!(
            Validation,
            "unsupported ParserConfig version {} (expected {})",
            config.version,
            PARSER_CONFIG_VERSION
        );
    }
    Ok(config)
}

/// Source URLs followed by their direct links, one per line.
pub fn source_lines(config: &ParserConfig) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for proxy in &config.proxies {
        if !proxy.source.is_empty() {
            lines.push(&proxy.source);
        }
        lines.extend(proxy.connections.iter().map(String::as_str));
    }
    lines.join("\n")
}

/// Recover the parser configuration from `config_path`, or from the
/// template when the document does not exist yet.
///
/// Required outbounds from the template are enforced on a recovered
/// configuration. A document whose block is missing or broken is an error
/// rather than a silent fallback, so the user's data is never replaced.
pub fn load_existing(config_path: impl AsRef<Path>, template_parser_config: &str) -> Result<ExistingConfig> {
    let config_path = config_path.as_ref();

    if config_path.exists() {
        let bytes = slurp_limited(config_path, MAX_JSON_CONFIG_SIZE as u64)?;
        let text = String::from_utf8_lossy(&bytes);
        let mut config = extract_parser_config(&text).map_err(|e| {
            WizardError::Structural(format!(
                "error in @ParserConfig block of {}: {}",
                config_path.display(),
                e
            ))
        })?;
        ensure_required_from_text(&mut config, template_parser_config)?;
        info!(path = %config_path.display(), sources = config.proxies.len(), "loaded existing parser config");

        return Ok(ExistingConfig {
            origin: ConfigOrigin::Document,
            parser_config: serialize(&config)?,
            source_lines: source_lines(&config),
        });
    }

    if template_parser_config.trim().is_empty() {
        debug!("no document and no template parser config");
        return Ok(ExistingConfig {
            origin: ConfigOrigin::Empty,
            parser_config: String::new(),
            source_lines: String::new(),
        });
    }

    match parse(template_parser_config) {
        Ok(config) => Ok(ExistingConfig {
            origin: ConfigOrigin::Template,
            parser_config: serialize(&config)?,
            source_lines: String::new(),
        }),
        Err(e) => {
            warn!(error = %e, "template parser config unreadable");
            Ok(ExistingConfig {
                origin: ConfigOrigin::Empty,
                parser_config: String::new(),
                source_lines: String::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DOCUMENT: &str = "{\n/** @ParserConfig\n{\n  \"ParserConfig\": {\n    \"version\": 3,\n    \"proxies\": [{\"source\": \"https://a.example/sub\"}, {\"connections\": [\"vless://x@h:1\", \"ss://y@h:2\"]}],\n    \"outbounds\": [{\"tag\": \"proxy-out\", \"type\": \"direct\"}]\n  }\n}\n*/\n  \"log\": {}\n}\n";

    const TEMPLATE_PARSER: &str = r#"{"ParserConfig": {"proxies": [{}], "outbounds": [{"tag": "proxy-out", "type": "selector", "wizard": {"required": 2}}, {"tag": "auto", "type": "urltest", "wizard": {"required": 1}}]}}"#;

    #[test]
    fn test_extract_block_and_versions() {
        let config = extract_parser_config(DOCUMENT).unwrap();
        assert_eq!(config.proxies.len(), 2);

        assert!(extract_block("{\"log\": {}}").unwrap_err().is_structural());

        let legacy = DOCUMENT.replace("\"version\": 3", "\"version\": 2");
        assert!(extract_parser_config(&legacy).unwrap_err().to_string().contains("unsupported"));

        let unversioned = DOCUMENT.replace("\"version\": 3,", "");
        assert_eq!(extract_parser_config(&unversioned).unwrap().version, 0);
    }

    #[test]
    fn test_load_existing_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, DOCUMENT).unwrap();

        let loaded = load_existing(&path, TEMPLATE_PARSER).unwrap();
        assert_eq!(loaded.origin, ConfigOrigin::Document);
        assert_eq!(loaded.source_lines, "https://a.example/sub\nvless://x@h:1\nss://y@h:2");

        let config = parse(&loaded.parser_config).unwrap();
        assert_eq!(config.outbounds.len(), 2);
        assert_eq!(config.outbounds[0].kind, "selector");
        assert_eq!(config.outbounds[1].tag, "auto");
    }

    #[test]
    fn test_load_existing_fallbacks() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("config.json");

        let from_template = load_existing(&missing, TEMPLATE_PARSER).unwrap();
        assert_eq!(from_template.origin, ConfigOrigin::Template);
        assert!(from_template.parser_config.contains("\"version\": 3"));
        assert!(from_template.source_lines.is_empty());

        assert_eq!(load_existing(&missing, "").unwrap().origin, ConfigOrigin::Empty);
        assert_eq!(load_existing(&missing, "{bad").unwrap().origin, ConfigOrigin::Empty);

        fs::write(&missing, "{\"log\": {}}").unwrap();
        assert!(load_existing(&missing, TEMPLATE_PARSER).is_err());
    }
}
