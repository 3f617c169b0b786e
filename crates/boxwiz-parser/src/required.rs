//! Enforcing template-required global outbounds on a loaded config.

use boxwiz_types::{RequiredLevel, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::model::ParserConfig;
use crate::normalize::parse;
use crate::validate::validate_json_size;

/// Counts of what enforcement changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Enforcement {
    /// Outbounds appended because their tag was missing
    pub added: usize,
    /// Existing outbounds overwritten from the template
    pub replaced: usize,
}

/// Apply the template's `wizard.required` levels to `config.outbounds`.
///
/// Level 1 seeds a missing tag and otherwise leaves the user's entry alone.
/// Level 2 and above overwrite the entry on every call. Entries are cloned,
/// so nothing in `config` aliases the template.
pub fn ensure_required_outbounds(config: &mut ParserConfig, template: &ParserConfig) -> Enforcement {
    let mut by_tag: HashMap<String, usize> = config
        .outbounds
        .iter()
        .enumerate()
        .filter(|(_, o)| !o.tag.is_empty())
        .map(|(i, o)| (o.tag.clone(), i))
        .collect();

    let mut result = Enforcement::default();
    for required in &template.outbounds {
        if required.tag.is_empty() {
            continue;
        }
        let existing = by_tag.get(&required.tag).copied();
        match (required.required(), existing) {
            (RequiredLevel::None, _) => {}
            (RequiredLevel::IfMissing, Some(_)) => {}
            (RequiredLevel::Always, Some(idx)) => {
                config.outbounds[idx] = required.clone();
                result.replaced += 1;
            }
            (RequiredLevel::IfMissing | RequiredLevel::Always, None) => {
                by_tag.insert(required.tag.clone(), config.outbounds.len());
                config.outbounds.push(required.clone());
                result.added += 1;
            }
        }
    }

    if result != Enforcement::default() {
        debug!(added = result.added, replaced = result.replaced, "required outbounds enforced");
    }
    result
}

/// Enforce from the template's wrapped parser-config text.
///
/// An oversized template is an error; one that does not parse is logged and
/// skipped so the user's config still loads.
pub fn ensure_required_from_text(config: &mut ParserConfig, template_text: &str) -> Result<Enforcement> {
    if template_text.trim().is_empty() {
        return Ok(Enforcement::default());
    }
    validate_json_size(template_text.as_bytes())?;
    match parse(template_text) {
        Ok(template) => Ok(ensure_required_outbounds(config, &template)),
        Err(e) => {
            warn!(error = %e, "template parser config unreadable; required outbounds not enforced");
            Ok(Enforcement::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OutboundConfig, WizardAnnotation};

    fn required(tag: &str, kind: &str, level: i64) -> OutboundConfig {
        OutboundConfig {
            wizard: Some(WizardAnnotation::Settings { required: level, hide: false }),
            ..OutboundConfig::new(tag, kind)
        }
    }

    fn template() -> ParserConfig {
        ParserConfig {
            outbounds: vec![
                required("seeded", "selector", 1),
                required("enforced", "urltest", 2),
                required("optional", "selector", 0),
                required("", "selector", 3),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_required_boundary() {
        let mut config = ParserConfig {
            outbounds: vec![
                OutboundConfig::new("seeded", "direct"),
                OutboundConfig::new("enforced", "direct"),
            ],
            ..Default::default()
        };

        let result = ensure_required_outbounds(&mut config, &template());
        assert_eq!(result, Enforcement { added: 0, replaced: 1 });
        assert_eq!(config.outbounds[0].kind, "direct");
        assert_eq!(config.outbounds[1].kind, "urltest");
        assert_eq!(config.outbounds.len(), 2);
    }

    #[test]
    fn test_missing_tags_are_appended() {
        let mut config = ParserConfig::default();
        let result = ensure_required_outbounds(&mut config, &template());

        assert_eq!(result.added, 2);
        let tags: Vec<&str> = config.outbounds.iter().map(|o| o.tag.as_str()).collect();
        assert_eq!(tags, vec!["seeded", "enforced"]);

        // A second pass only re-syncs the enforced entry.
        let again = ensure_required_outbounds(&mut config, &template());
        assert_eq!(again, Enforcement { added: 0, replaced: 1 });
    }

    #[test]
    fn test_from_text_tolerates_bad_template() {
        let mut config = ParserConfig::default();
        assert_eq!(ensure_required_from_text(&mut config, "{oops").unwrap(), Enforcement::default());
        assert_eq!(ensure_required_from_text(&mut config, "").unwrap(), Enforcement::default());

        let text = r#"{"ParserConfig": {"outbounds": [{"tag": "proxy-out", "type": "selector", "wizard": {"required": 1}}]}}"#;
        assert_eq!(ensure_required_from_text(&mut config, text).unwrap().added, 1);
        assert_eq!(config.outbounds[0].tag, "proxy-out");
    }
}
