//! Input validation for URLs, links, outbounds, rules and parser configs.
//!
//! Every failure is a [`WizardError::Validation`] with a human-readable
//! reason; nothing here coerces bad input into good.

use boxwiz_types::constants::{
    MAX_JSON_CONFIG_SIZE, MAX_SUBSCRIPTION_SIZE, MAX_TAG_LENGTH, MAX_URI_LENGTH, MIN_URI_LENGTH,
};
use boxwiz_core::time::parse_duration;
use boxwiz_types::{bail, Result, WizardError};
use serde_json::{Map, Value};
use std::collections::HashSet;
use url::Url;

use crate::model::{OutboundConfig, ParserConfig, PARSER_CONFIG_WRAPPER};

fn check_length(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        bail!(Validation, "{} is empty", kind);
    }
    if value.len() > MAX_URI_LENGTH {
        bail!(Validation, "{} length ({}) exceeds maximum ({})", kind, value.len(), MAX_URI_LENGTH);
    }
    if value.len() < MIN_URI_LENGTH {
        bail!(Validation, "{} length ({}) is less than minimum ({})", kind, value.len(), MIN_URI_LENGTH);
    }
    Ok(())
}

/// Validate a subscription URL.
pub fn validate_url(input: &str) -> Result<()> {
    check_length("URL", input)?;
    let parsed = Url::parse(input).map_err(|e| WizardError::Validation(format!("invalid URL format: {}", e)))?;
    if parsed.scheme().is_empty() {
        bail!(Validation, "URL must have a scheme");
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        bail!(Validation, "URL must have a host");
    }
    Ok(())
}

/// Validate a direct connection link.
pub fn validate_uri(input: &str) -> Result<()> {
    check_length("URI", input)?;
    if !input.contains("://") {
        bail!(Validation, "URI must contain protocol (e.g., vless://, vmess://)");
    }
    Ok(())
}

/// Validate a single outbound declaration.
pub fn validate_outbound(outbound: &OutboundConfig) -> Result<()> {
    if outbound.tag.is_empty() {
        bail!(Validation, "outbound tag is empty");
    }
    if outbound.kind.is_empty() {
        bail!(Validation, "outbound type is empty");
    }
    if outbound.tag.len() > MAX_TAG_LENGTH {
        bail!(
            Validation,
            "outbound tag length ({}) exceeds maximum ({})",
            outbound.tag.len(),
            MAX_TAG_LENGTH
        );
    }
    Ok(())
}

/// Validate a routing rule body.
pub fn validate_rule(rule: &Map<String, Value>) -> Result<()> {
    if rule.is_empty() {
        bail!(Validation, "rule is empty");
    }
    Ok(())
}

/// Reject JSON documents larger than the configuration limit.
pub fn validate_json_size(bytes: &[u8]) -> Result<()> {
    if bytes.len() > MAX_JSON_CONFIG_SIZE {
        bail!(
            Validation,
            "JSON size ({} bytes) exceeds maximum ({} bytes)",
            bytes.len(),
            MAX_JSON_CONFIG_SIZE
        );
    }
    Ok(())
}

/// Reject subscription responses larger than the fetch limit.
pub fn validate_response_size(bytes: &[u8]) -> Result<()> {
    if bytes.len() > MAX_SUBSCRIPTION_SIZE {
        bail!(
            Validation,
            "HTTP response size ({} bytes) exceeds maximum ({} bytes)",
            bytes.len(),
            MAX_SUBSCRIPTION_SIZE
        );
    }
    Ok(())
}

fn check_unique_tags<'a>(scope: &str, outbounds: impl IntoIterator<Item = &'a OutboundConfig>) -> Result<()> {
    let mut seen = HashSet::new();
    for outbound in outbounds {
        if !seen.insert(outbound.tag.as_str()) {
            bail!(Validation, "{}: duplicate outbound tag '{}'", scope, outbound.tag);
        }
    }
    Ok(())
}

/// Validate every source, connection and outbound of a parser config.
pub fn validate_parser_config(config: &ParserConfig) -> Result<()> {
    for (i, proxy) in config.proxies.iter().enumerate() {
        if !proxy.source.is_empty() {
            validate_url(&proxy.source)
                .map_err(|e| WizardError::Validation(format!("proxy source {}: invalid URL: {}", i, reason(e))))?;
        }
        for (j, conn) in proxy.connections.iter().enumerate() {
            validate_uri(conn).map_err(|e| {
                WizardError::Validation(format!("proxy {} connection {}: invalid URI: {}", i, j, reason(e)))
            })?;
        }
        for (j, outbound) in proxy.outbounds.iter().enumerate() {
            validate_outbound(outbound)
                .map_err(|e| WizardError::Validation(format!("proxy {} outbound {}: {}", i, j, reason(e))))?;
        }
        check_unique_tags(&format!("proxy {}", i), &proxy.outbounds)?;
    }

    for (i, outbound) in config.outbounds.iter().enumerate() {
        validate_outbound(outbound)
            .map_err(|e| WizardError::Validation(format!("global outbound {}: {}", i, reason(e))))?;
    }
    check_unique_tags("global outbounds", &config.outbounds)?;

    let reload = &config.parser.reload;
    if !reload.is_empty() && parse_duration(reload).is_none() {
        bail!(Validation, "parser.reload: invalid interval '{}'", reload);
    }
    Ok(())
}

/// Validate wrapped parser-config text: size, syntax, shape, then content.
pub fn validate_parser_config_text(text: &str) -> Result<ParserConfig> {
    if text.trim().is_empty() {
        bail!(Validation, "ParserConfig JSON is empty");
    }
    validate_json_size(text.as_bytes())?;

    let value: Value = serde_json::from_str(text)
        .map_err(|e| WizardError::Structural(format!("invalid JSON: {}", e)))?;
    match value.get(PARSER_CONFIG_WRAPPER) {
        Some(Value::Object(inner)) => {
            if !matches!(inner.get("proxies"), Some(Value::Array(_))) {
                bail!(Structural, "ParserConfig.proxies must be an array");
            }
        }
        _ => bail!(Structural, "missing ParserConfig object"),
    }

    let config = crate::normalize::parse(text)?;
    validate_parser_config(&config)?;
    Ok(config)
}

// Strip the variant prefix when nesting one validation message in another.
fn reason(err: WizardError) -> String {
    match err {
        WizardError::Validation(msg) => msg,
        other => other.to_string(),
    }
}
