//! Merging enabled rule states into the template's `route` section.

use boxwiz_types::{bail, Result, WizardError};
use serde_json::Value;
use tracing::debug;

use crate::rules::RuleState;

/// Merge catalog rules, then custom rules, into a `route` object.
///
/// Existing `rules` and `rule_set` entries come first. A list is only
/// written back when something was added to it, and `final` only when
/// `final_outbound` is non-empty, so untouched keys stay as the template
/// had them.
pub fn merge_route(
    route: &Value,
    catalog: &[RuleState],
    custom: &[RuleState],
    final_outbound: &str,
) -> Result<Value> {
    let Value::Object(route) = route else {
        bail!(Structural, "route section must be an object");
    };
    let mut route = route.clone();

    let mut rules: Vec<Value> = match route.get("rules") {
        Some(Value::Array(items)) => items.clone(),
        Some(single @ Value::Object(_)) => vec![single.clone()],
        _ => Vec::new(),
    };
    let mut rule_sets: Vec<Value> = match route.get("rule_set") {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let (rules_before, sets_before) = (rules.len(), rule_sets.len());

    for state in catalog.iter().chain(custom.iter()).filter(|s| s.enabled) {
        rule_sets.extend(state.rule.rule_sets.iter().cloned());
        rules.extend(state.emitted_rules().into_iter().map(Value::Object));
    }

    debug!(
        added_rules = rules.len() - rules_before,
        added_rule_sets = rule_sets.len() - sets_before,
        "route merged"
    );

    if !rules.is_empty() {
        route.insert("rules".to_string(), Value::Array(rules));
    }
    if !rule_sets.is_empty() {
        route.insert("rule_set".to_string(), Value::Array(rule_sets));
    }
    if !final_outbound.is_empty() {
        route.insert("final".to_string(), Value::from(final_outbound));
    }
    Ok(Value::Object(route))
}

/// [`merge_route`] over raw section text.
pub fn merge_route_text(raw: &str, catalog: &[RuleState], custom: &[RuleState], final_outbound: &str) -> Result<Value> {
    let route: Value = serde_json::from_str(raw)
        .map_err(|e| WizardError::Structural(format!("route merge failed: {}", e)))?;
    merge_route(&route, catalog, custom, final_outbound).map_err(|e| match e {
        WizardError::Structural(msg) => WizardError::Structural(format!("route merge failed: {}", msg)),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxwiz_template::{CatalogRule, RuleBody, RuleMap};
    use proptest::prelude::*;
    use serde_json::json;

    fn map(value: Value) -> RuleMap {
        value.as_object().cloned().unwrap()
    }

    fn enabled(body: Value, selected: &str) -> RuleState {
        let mut state = RuleState::from_catalog(CatalogRule::new("r", RuleBody::Single(map(body))));
        state.enabled = true;
        state.selected_outbound = selected.to_string();
        state
    }

    #[test]
    fn test_reject_merge_scenario() {
        let route = json!({"rules": [], "final": "direct-out"});
        let catalog = vec![enabled(json!({"domain": ["blocked.com"]}), "reject")];

        let merged = merge_route(&route, &catalog, &[], "").unwrap();
        let rules = merged["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0], json!({"domain": ["blocked.com"], "action": "reject"}));
        assert_eq!(merged["final"], "direct-out");
    }

    #[test]
    fn test_three_rule_merge_count() {
        let route = json!({"rules": [{"protocol": "dns", "action": "hijack-dns"}], "final": "direct-out"});
        let catalog = vec![enabled(json!({"domain_suffix": [".ru"]}), "direct-out")];
        let custom = vec![RuleState::custom("mine", map(json!({"ip_cidr": ["10.0.0.0/8"], "outbound": "proxy"})))];

        let merged = merge_route(&route, &catalog, &custom, "final-out").unwrap();
        assert_eq!(merged["rules"].as_array().unwrap().len(), 3);
        assert_eq!(merged["final"], "final-out");
        assert_eq!(merged["rules"][2]["outbound"], "proxy");
    }

    #[test]
    fn test_untouched_route_stays_as_is() {
        let route = json!({"rules": [], "auto_detect_interface": true});
        let mut disabled = enabled(json!({"domain": ["x"]}), "proxy");
        disabled.enabled = false;

        let merged = merge_route(&route, &[disabled], &[], "").unwrap();
        assert_eq!(merged, route);
    }

    #[test]
    fn test_rule_sets_and_single_object_rules() {
        let route = json!({"rules": {"protocol": "dns", "action": "hijack-dns"}, "rule_set": [{"tag": "base"}]});
        let mut state = enabled(json!({"rule_set": "ads", "action": "reject"}), "");
        state.rule.rule_sets = vec![json!({"tag": "ads", "type": "remote"}), json!("geosite-ads")];

        let merged = merge_route(&route, &[state], &[], "").unwrap();
        assert_eq!(merged["rules"].as_array().unwrap().len(), 2);
        assert_eq!(
            merged["rule_set"],
            json!([{"tag": "base"}, {"tag": "ads", "type": "remote"}, "geosite-ads"])
        );
        assert!(merged.get("final").is_none());
    }

    #[test]
    fn test_non_object_route_is_structural() {
        assert!(merge_route(&json!([]), &[], &[], "").unwrap_err().is_structural());
        assert!(merge_route_text("{", &[], &[], "").unwrap_err().is_structural());
    }

    fn arb_rule() -> impl Strategy<Value = Value> {
        (
            proptest::option::of("[a-z]{1,6}"),
            proptest::option::of(prop_oneof![Just("reject"), Just("route")]),
            proptest::option::of(Just("drop")),
        )
            .prop_map(|(outbound, action, method)| {
                let mut rule = json!({"domain": ["example.com"]});
                if let Some(o) = outbound {
                    rule["outbound"] = json!(o);
                }
                if let Some(a) = action {
                    rule["action"] = json!(a);
                }
                if let Some(m) = method {
                    rule["method"] = json!(m);
                }
                rule
            })
    }

    proptest! {
        #[test]
        fn test_rule_exclusivity(bodies in proptest::collection::vec(arb_rule(), 1..6),
                                 selections in proptest::collection::vec(
                                     prop_oneof![Just("reject".to_string()), Just("drop".to_string()), "[a-z]{1,6}"], 6)) {
            let states: Vec<RuleState> = bodies
                .into_iter()
                .zip(selections)
                .map(|(body, selected)| enabled(body, &selected))
                .collect();

            let merged = merge_route(&json!({}), &states, &[], "").unwrap();
            for rule in merged["rules"].as_array().unwrap() {
                let has_outbound = rule.get("outbound").is_some();
                let has_action = rule.get("action").is_some();
                prop_assert!(!(has_outbound && has_action));
                if rule.get("method").is_some() {
                    prop_assert_eq!(&rule["action"], &json!("reject"));
                    prop_assert_eq!(&rule["method"], &json!("drop"));
                }
            }
        }

        #[test]
        fn test_disabled_rules_contribute_nothing(count in 1usize..8) {
            let states: Vec<RuleState> = (0..count)
                .map(|i| {
                    let mut s = enabled(json!({"domain": [format!("d{}.com", i)]}), "proxy");
                    s.enabled = false;
                    s
                })
                .collect();
            let merged = merge_route(&json!({"rules": [{"x": 1}]}), &states, &states, "").unwrap();
            prop_assert_eq!(merged["rules"].as_array().unwrap().len(), 1);
        }
    }
}
