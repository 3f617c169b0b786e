//! Platform-conditional overlays on the base configuration document.
//!
//! An overlay names a key (dot-addressed for nested objects) and a value to
//! combine with whatever the base document holds there. Only overlays whose
//! platform scope matches the runtime platform are applied, in declaration
//! order.

use boxwiz_types::{OverlayMode, Platform, WizardError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// One entry of the template's `params` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    /// Target key, e.g. `inbounds` or `route.rules`
    pub name: String,

    /// Platforms the overlay applies to; empty means all
    #[serde(default)]
    pub platforms: Vec<String>,

    /// Value to combine with the target; absent values act as JSON `null`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// `replace` (default), `prepend` or `append`
    #[serde(default)]
    pub mode: String,
}

impl Overlay {
    /// Parsed combination mode.
    pub fn mode(&self) -> Result<OverlayMode> {
        self.mode.parse()
    }
}

/// Apply every matching overlay to a copy of `base`.
///
/// `base` must be a JSON object. The input is left untouched.
pub fn apply_overlays(
    base: &Value,
    overlays: &[Overlay],
    platform: &Platform,
    enable_tun: bool,
) -> Result<Value> {
    let mut doc = match base {
        Value::Object(map) => map.clone(),
        other => {
            return Err(WizardError::Structural(format!(
                "template config must be an object, found {}",
                type_name(other)
            )))
        }
    };

    for overlay in overlays {
        if !platform.matches(&overlay.platforms, enable_tun) {
            continue;
        }
        let mode = overlay.mode()?;
        debug!(overlay = %overlay.name, %mode, %platform, "applying overlay");

        apply_at_path(&mut doc, &overlay.name, overlay.value.as_ref(), mode).map_err(|e| {
            WizardError::Structural(format!("overlay '{}': {}", overlay.name, e))
        })?;
    }

    Ok(Value::Object(doc))
}

fn apply_at_path(
    doc: &mut Map<String, Value>,
    path: &str,
    value: Option<&Value>,
    mode: OverlayMode,
) -> std::result::Result<(), String> {
    match path.split_once('.') {
        None => apply_value(doc, path, value, mode),
        Some((key, rest)) => {
            let section = doc
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match section {
                Value::Object(nested) => apply_at_path(nested, rest, value, mode),
                _ => Err(format!("section '{}' is not an object", key)),
            }
        }
    }
}

fn apply_value(
    doc: &mut Map<String, Value>,
    key: &str,
    value: Option<&Value>,
    mode: OverlayMode,
) -> std::result::Result<(), String> {
    let existing = doc.get(key).filter(|v| !v.is_null());

    let merged = match (mode, existing, value) {
        (OverlayMode::Replace, _, value) => value.cloned().unwrap_or(Value::Null),
        // Nothing to combine with: the overlay value lands as-is.
        (_, None, value) => value.cloned().unwrap_or(Value::Null),
        // Absent overlay value leaves an existing array alone.
        (_, Some(_), None) => return Ok(()),
        (OverlayMode::Prepend, Some(existing), Some(value)) => concat_arrays(key, value, existing)?,
        (OverlayMode::Append, Some(existing), Some(value)) => concat_arrays(key, existing, value)?,
    };

    doc.insert(key.to_string(), merged);
    Ok(())
}

fn concat_arrays(key: &str, first: &Value, second: &Value) -> std::result::Result<Value, String> {
    let (Value::Array(head), Value::Array(tail)) = (first, second) else {
        return Err(format!(
            "'{}' requires arrays on both sides, found {} and {}",
            key,
            type_name(first),
            type_name(second)
        ));
    };
    Ok(Value::Array(head.iter().chain(tail.iter()).cloned().collect()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overlay(name: &str, platforms: &[&str], value: Option<Value>, mode: &str) -> Overlay {
        Overlay {
            name: name.to_string(),
            platforms: platforms.iter().map(|s| s.to_string()).collect(),
            value,
            mode: mode.to_string(),
        }
    }

    fn linux() -> Platform {
        Platform::new("linux")
    }

    #[test]
    fn test_replace_top_level_and_input_untouched() {
        let base = json!({"log": {"level": "info"}, "dns": {}});
        let overlays = vec![overlay("log", &[], Some(json!({"level": "warn"})), "")];

        let out = apply_overlays(&base, &overlays, &linux(), false).unwrap();
        assert_eq!(out, json!({"log": {"level": "warn"}, "dns": {}}));
        assert_eq!(base, json!({"log": {"level": "info"}, "dns": {}}));
    }

    #[test]
    fn test_prepend_and_append_order() {
        let base = json!({"route": {"rules": [{"b": 1}]}});
        let overlays = vec![
            overlay("route.rules", &["linux"], Some(json!([{"a": 1}])), "prepend"),
            overlay("route.rules", &["linux"], Some(json!([{"c": 1}])), "append"),
        ];

        let out = apply_overlays(&base, &overlays, &linux(), false).unwrap();
        assert_eq!(out["route"]["rules"], json!([{"a": 1}, {"b": 1}, {"c": 1}]));
    }

    #[test]
    fn test_missing_key_is_created() {
        let base = json!({});
        let overlays = vec![
            overlay("experimental.cache_file", &[], Some(json!({"enabled": true})), "replace"),
            overlay("inbounds", &[], Some(json!([{"type": "tun"}])), "append"),
        ];

        let out = apply_overlays(&base, &overlays, &linux(), false).unwrap();
        assert_eq!(out["experimental"]["cache_file"], json!({"enabled": true}));
        assert_eq!(out["inbounds"], json!([{"type": "tun"}]));
    }

    #[test]
    fn test_prepend_non_array_is_structural() {
        let base = json!({"inbounds": {"type": "mixed"}});
        let overlays = vec![overlay("inbounds", &[], Some(json!([{"type": "tun"}])), "prepend")];

        let err = apply_overlays(&base, &overlays, &linux(), false).unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("inbounds"));
    }

    #[test]
    fn test_nested_through_scalar_is_structural() {
        let base = json!({"route": "auto"});
        let overlays = vec![overlay("route.final", &[], Some(json!("proxy")), "")];

        let err = apply_overlays(&base, &overlays, &linux(), false).unwrap_err();
        assert!(err.to_string().contains("section 'route' is not an object"));
    }

    #[test]
    fn test_unknown_mode_is_structural() {
        let base = json!({"inbounds": []});
        let overlays = vec![overlay("inbounds", &[], Some(json!([])), "merge")];
        assert!(apply_overlays(&base, &overlays, &linux(), false)
            .unwrap_err()
            .is_structural());
    }

    #[test]
    fn test_absent_value_asymmetry() {
        let base = json!({"inbounds": [1], "dns": {"servers": []}});
        let overlays = vec![
            overlay("inbounds", &[], None, "append"),
            overlay("dns", &[], None, "replace"),
        ];

        let out = apply_overlays(&base, &overlays, &linux(), false).unwrap();
        assert_eq!(out["inbounds"], json!([1]));
        assert_eq!(out["dns"], Value::Null);
    }

    #[test]
    fn test_darwin_tun_gate() {
        let base = json!({"inbounds": []});
        let overlays = vec![overlay("inbounds", &["darwin-tun"], Some(json!([{"type": "tun"}])), "append")];
        let darwin = Platform::new("darwin");

        let with_tun = apply_overlays(&base, &overlays, &darwin, true).unwrap();
        let without_tun = apply_overlays(&base, &overlays, &darwin, false).unwrap();
        let on_linux = apply_overlays(&base, &overlays, &linux(), true).unwrap();

        assert_eq!(with_tun["inbounds"], json!([{"type": "tun"}]));
        assert_eq!(without_tun["inbounds"], json!([]));
        assert_eq!(on_linux["inbounds"], json!([]));
    }

    proptest::proptest! {
        #[test]
        fn test_concat_preserves_both_sides(existing in proptest::collection::vec(0i64..100, 0..8),
                                            added in proptest::collection::vec(0i64..100, 0..8)) {
            let base = json!({"route": {"rules": existing.clone()}});
            let overlays = vec![overlay("route.rules", &[], Some(json!(added.clone())), "append")];
            let out = apply_overlays(&base, &overlays, &linux(), false).unwrap();

            let expected: Vec<i64> = existing.iter().chain(added.iter()).copied().collect();
            proptest::prop_assert_eq!(&out["route"]["rules"], &json!(expected));
        }
    }

    #[test]
    fn test_non_object_base_rejected() {
        let err = apply_overlays(&json!([1, 2]), &[], &linux(), false).unwrap_err();
        assert!(err.is_structural());
    }
}
