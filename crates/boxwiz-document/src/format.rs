//! Text formatting helpers for the generated document.

use boxwiz_core::util::indent_json;
use serde_json::Value;

/// One indentation step.
pub const INDENT_BASE: &str = "  ";

/// Indentation for nesting `level`.
pub fn indent(level: usize) -> String {
    INDENT_BASE.repeat(level)
}

/// Prefix every line of `text` with `prefix`.
pub fn indent_multiline(text: &str, prefix: &str) -> String {
    if text.is_empty() {
        return prefix.to_string();
    }
    text.split('\n')
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Re-indent a raw JSON section to sit at `level`, or return it unchanged
/// when it does not parse.
pub fn format_section(raw: &str, level: usize) -> String {
    indent_json(raw, &indent(level), INDENT_BASE).unwrap_or_else(|_| raw.to_string())
}

/// `  "key": value` line used for every top-level section. The key is
/// written as an escaped JSON string.
pub fn section_entry(key: &str, formatted: &str) -> String {
    format!("{}{}: {}", indent(1), Value::String(key.to_string()), formatted)
}
