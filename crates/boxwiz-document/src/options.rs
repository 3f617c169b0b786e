//! Outbound choices offered for rules and `route.final`.

use boxwiz_parser::{OutboundConfig, ParserConfig};
use boxwiz_types::{DEFAULT_OUTBOUND_TAG, DROP_METHOD, REJECT_ACTION};
use std::collections::BTreeSet;

/// Every outbound a rule may route to, sorted.
///
/// Always includes `direct-out`, `reject` and `drop`, plus the tags of
/// visible global and per-source outbounds and whatever they add.
pub fn available_outbounds(config: Option<&ParserConfig>) -> Vec<String> {
    let mut tags: BTreeSet<String> = [DEFAULT_OUTBOUND_TAG, REJECT_ACTION, DROP_METHOD]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let Some(config) = config else {
        return tags.into_iter().collect();
    };

    let mut add = |outbound: &OutboundConfig| {
        if outbound.hidden() {
            return;
        }
        if !outbound.tag.is_empty() {
            tags.insert(outbound.tag.clone());
        }
        tags.extend(outbound.add_outbounds.iter().filter(|t| !t.is_empty()).cloned());
    };
    config.outbounds.iter().for_each(&mut add);
    config
        .proxies
        .iter()
        .flat_map(|p| p.outbounds.iter())
        .for_each(&mut add);

    tags.into_iter().collect()
}

/// Pick a valid `route.final` from `options`.
///
/// Keeps `current` when it is offered, then tries the template default,
/// then `direct-out`, then the first option.
pub fn ensure_final_selected(current: &str, options: &[String], default_final: &str) -> String {
    let fallback;
    let options = if options.is_empty() {
        fallback = vec![DEFAULT_OUTBOUND_TAG.to_string(), REJECT_ACTION.to_string()];
        &fallback[..]
    } else {
        options
    };
    let offered = |tag: &str| !tag.is_empty() && options.iter().any(|o| o == tag);

    let preferred = [current, default_final, DEFAULT_OUTBOUND_TAG]
        .into_iter()
        .find(|t| !t.is_empty())
        .unwrap_or(DEFAULT_OUTBOUND_TAG);

    if offered(preferred) {
        preferred.to_string()
    } else if offered(default_final) {
        default_final.to_string()
    } else if offered(DEFAULT_OUTBOUND_TAG) {
        DEFAULT_OUTBOUND_TAG.to_string()
    } else {
        options[0].clone()
    }
}
