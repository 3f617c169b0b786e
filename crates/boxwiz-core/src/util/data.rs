//! JSON data handling utilities.

use boxwiz_types::{WizardError, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

/// UTF-8 byte-order mark.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Deep merge two values.
/// Recursively merges objects, with overlay values taking precedence.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay_val) => overlay_val,
    }
}

/// Get value at a path in dotted notation.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;

    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                current = arr.get(index)?;
            }
            _ => return None,
        }
    }

    Some(current)
}

/// Set value at a path in dotted notation, creating intermediate objects.
///
/// Fails if an intermediate segment exists but is not an object.
pub fn set_path(value: &mut Value, path: &str, new_value: Value) -> Result<()> {
    if path.is_empty() {
        return Err(WizardError::Config("Empty path".to_string()));
    }

    let parts: Vec<&str> = path.split('.').collect();
    let (last, parents) = match parts.split_last() {
        Some(split) => split,
        None => return Err(WizardError::Config("Empty path".to_string())),
    };

    let mut current = value;
    for part in parents {
        let map = current
            .as_object_mut()
            .ok_or_else(|| WizardError::Config(format!("Invalid path: {}", path)))?;
        current = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    match current.as_object_mut() {
        Some(map) => {
            map.insert(last.to_string(), new_value);
            Ok(())
        }
        None => Err(WizardError::Config(format!("Cannot set value at path: {}", path))),
    }
}

/// String value at a dotted path, if present and a string.
pub fn string_at<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    get_path(value, path).and_then(Value::as_str)
}

/// Strip a UTF-8 byte-order mark from the start and from the end of `bytes`.
pub fn strip_utf8_bom(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    bytes.strip_suffix(UTF8_BOM).unwrap_or(bytes)
}

/// Re-indent a JSON text.
///
/// Nested levels use `indent`; every line after the first is additionally
/// prefixed with `prefix`, so the result can be embedded at an existing
/// indentation level. Key order is preserved.
pub fn indent_json(raw: &str, prefix: &str, indent: &str) -> Result<String> {
    let value: Value = serde_json::from_str(raw)?;
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
    value.serialize(&mut ser)?;
    let text = String::from_utf8(buf)
        .map_err(|e| WizardError::Bug(format!("serializer produced invalid UTF-8: {}", e)))?;

    if prefix.is_empty() {
        return Ok(text);
    }
    Ok(text.replace('\n', &format!("\n{}", prefix)))
}

/// Re-serialize a JSON text without insignificant whitespace.
pub fn compact_json(raw: &str) -> Result<String> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(serde_json::to_string(&value)?)
}
