//! Link classification and subscription content decoding.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use boxwiz_types::{LinkClassifier, Result, WizardError};

/// Schemes recognised as direct connection links.
pub const DIRECT_SCHEMES: &[&str] = &["vless://", "vmess://", "trojan://", "ss://", "hysteria2://", "hy2://", "ssh://"];

/// Prefix-based [`LinkClassifier`]: `http(s)://` lines are subscriptions,
/// known proxy schemes are direct links.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemeClassifier;

impl LinkClassifier for SchemeClassifier {
    fn is_subscription_url(&self, line: &str) -> bool {
        let line = line.trim();
        line.starts_with("http://") || line.starts_with("https://")
    }

    fn is_direct_link(&self, line: &str) -> bool {
        let line = line.trim();
        DIRECT_SCHEMES.iter().any(|scheme| line.starts_with(scheme))
    }
}

/// Decode subscription content into newline-separated links.
///
/// Base64 (URL-safe, then standard, padded or not) is tried first; content
/// that already contains links is returned as-is. A JSON body means the
/// server returned a client configuration instead of a subscription.
pub fn decode_subscription(content: &[u8]) -> Result<Vec<u8>> {
    if content.is_empty() {
        return Err(WizardError::Validation("subscription content is empty".to_string()));
    }

    let text = String::from_utf8_lossy(content);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(content.to_vec());
    }

    if let Some(decoded) = try_base64(trimmed) {
        if decoded.is_empty() {
            return Err(WizardError::Validation("decoded content is empty".to_string()));
        }
        if std::str::from_utf8(&decoded).is_err() {
            return Err(WizardError::Validation(
                "decoded content contains invalid UTF-8 sequences".to_string(),
            ));
        }
        return Ok(decoded);
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Err(WizardError::Validation(
            "subscription URL returned JSON configuration instead of subscription list".to_string(),
        ));
    }

    if trimmed.contains("://") {
        return Ok(content.to_vec());
    }

    Err(WizardError::Validation("failed to decode base64 content".to_string()))
}

fn try_base64(text: &str) -> Option<Vec<u8>> {
    // Some providers wrap the encoded body across lines.
    let joined: String = text.split_whitespace().collect();
    [URL_SAFE, STANDARD, URL_SAFE_NO_PAD, STANDARD_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(&joined).ok())
}

/// Non-empty trimmed lines of decoded content.
pub fn content_lines(decoded: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(decoded)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
