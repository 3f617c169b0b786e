//! Per-session routing-rule state.

use boxwiz_template::{CatalogRule, RuleBody, RuleMap};
use boxwiz_types::{DROP_METHOD, REJECT_ACTION};
use serde_json::Value;

/// Rule type label for CIDR rules.
pub const RULE_TYPE_IPS: &str = "IP Addresses (CIDR)";
/// Rule type label for domain rules.
pub const RULE_TYPE_DOMAINS: &str = "Domains/URLs";
/// Rule type label for process rules.
pub const RULE_TYPE_PROCESSES: &str = "Processes";
/// Rule type label for anything else.
pub const RULE_TYPE_SYSTEM: &str = "System";
/// Rule type label for a rule with no body.
pub const RULE_TYPE_CUSTOM_JSON: &str = "Custom JSON";

/// A catalog or custom rule plus the user's choices for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleState {
    /// The rule definition
    pub rule: CatalogRule,
    /// Emitted into the route when true
    pub enabled: bool,
    /// User override of the rule's outbound; empty means the default
    pub selected_outbound: String,
}

impl RuleState {
    /// State for a catalog rule, enabled per its `default` flag.
    pub fn from_catalog(rule: CatalogRule) -> Self {
        Self {
            enabled: rule.is_default,
            rule,
            selected_outbound: String::new(),
        }
    }

    /// A user-authored rule, enabled.
    pub fn custom(label: impl Into<String>, body: RuleMap) -> Self {
        Self {
            rule: CatalogRule::new(label, RuleBody::Single(body)),
            enabled: true,
            selected_outbound: String::new(),
        }
    }

    /// The selection, or the rule's default when nothing is selected.
    pub fn effective_outbound(&self) -> &str {
        if self.selected_outbound.is_empty() {
            &self.rule.default_outbound
        } else {
            &self.selected_outbound
        }
    }

    /// Fill an empty selection from the default or the first option.
    pub fn ensure_default_outbound(&mut self, available: &[String]) {
        if !self.selected_outbound.is_empty() {
            return;
        }
        if !self.rule.default_outbound.is_empty() {
            self.selected_outbound = self.rule.default_outbound.clone();
        } else if let Some(first) = available.first() {
            self.selected_outbound = first.clone();
        }
    }

    /// Display category derived from the rule body's match keys.
    pub fn rule_type(&self) -> &'static str {
        let Some(rule) = self.rule.body.primary() else {
            return RULE_TYPE_CUSTOM_JSON;
        };
        if rule.contains_key("ip_cidr") {
            RULE_TYPE_IPS
        } else if ["domain_regex", "domain", "domain_suffix", "domain_keyword"]
            .iter()
            .any(|key| rule.contains_key(*key))
        {
            RULE_TYPE_DOMAINS
        } else if rule.contains_key("process_name") {
            RULE_TYPE_PROCESSES
        } else {
            RULE_TYPE_SYSTEM
        }
    }

    /// Route rules this state contributes, with its outbound applied.
    ///
    /// Disabled states contribute nothing.
    pub fn emitted_rules(&self) -> Vec<RuleMap> {
        if !self.enabled {
            return Vec::new();
        }
        let outbound = self.effective_outbound();
        match &self.rule.body {
            RuleBody::Single(rule) => vec![apply_outbound(rule, outbound)],
            RuleBody::Many(rules) => rules.iter().map(|r| apply_outbound(r, outbound)).collect(),
            RuleBody::Empty => Vec::new(),
        }
    }
}

/// Copy `rule` with `outbound` applied.
///
/// `reject` and `drop` become reject actions; any other non-empty value
/// routes to that outbound. A rule never carries both an `outbound` and an
/// `action`. An empty selection leaves the copy as it was.
pub fn apply_outbound(rule: &RuleMap, outbound: &str) -> RuleMap {
    let mut cloned = rule.clone();
    match outbound {
        "" => {}
        REJECT_ACTION => {
            cloned.remove("outbound");
            cloned.remove("method");
            cloned.insert("action".to_string(), Value::from(REJECT_ACTION));
        }
        DROP_METHOD => {
            cloned.remove("outbound");
            cloned.insert("action".to_string(), Value::from(REJECT_ACTION));
            cloned.insert("method".to_string(), Value::from(DROP_METHOD));
        }
        other => {
            cloned.remove("action");
            cloned.remove("method");
            cloned.insert("outbound".to_string(), Value::from(other));
        }
    }
    cloned
}

/// Render a rule with its outbound applied, 2-space indented.
pub fn format_rule(rule: &RuleMap, outbound: &str) -> boxwiz_types::Result<String> {
    Ok(serde_json::to_string_pretty(&apply_outbound(rule, outbound))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> RuleMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_apply_outbound_exclusivity() {
        let rule = map(json!({"domain": ["a.com"], "outbound": "proxy", "action": "route", "method": "x"}));

        let reject = apply_outbound(&rule, "reject");
        assert_eq!(reject.get("action"), Some(&json!("reject")));
        assert!(!reject.contains_key("outbound") && !reject.contains_key("method"));

        let drop = apply_outbound(&rule, "drop");
        assert_eq!(drop.get("method"), Some(&json!("drop")));
        assert!(!drop.contains_key("outbound"));

        let routed = apply_outbound(&map(json!({"action": "reject", "method": "drop"})), "direct-out");
        assert_eq!(routed, map(json!({"outbound": "direct-out"})));

        assert_eq!(apply_outbound(&rule, ""), rule);
        assert_eq!(rule["outbound"], "proxy");
    }

    #[test]
    fn test_effective_and_default_outbound() {
        let mut state = RuleState::custom("mine", map(json!({"domain": ["a.com"]})));
        assert_eq!(state.effective_outbound(), "");

        state.ensure_default_outbound(&["direct-out".to_string(), "proxy".to_string()]);
        assert_eq!(state.selected_outbound, "direct-out");

        let mut seeded = RuleState::custom("ads", map(json!({"domain": ["ads.com"], "action": "reject"})));
        assert_eq!(seeded.effective_outbound(), "reject");
        seeded.ensure_default_outbound(&["direct-out".to_string()]);
        assert_eq!(seeded.selected_outbound, "reject");

        seeded.selected_outbound = "proxy".into();
        seeded.ensure_default_outbound(&[]);
        assert_eq!(seeded.effective_outbound(), "proxy");
    }

    #[test]
    fn test_rule_type_labels() {
        let of = |v: Value| RuleState::custom("r", map(v)).rule_type();
        assert_eq!(of(json!({"ip_cidr": ["10.0.0.0/8"]})), RULE_TYPE_IPS);
        assert_eq!(of(json!({"domain_suffix": [".ru"]})), RULE_TYPE_DOMAINS);
        assert_eq!(of(json!({"process_name": ["curl"]})), RULE_TYPE_PROCESSES);
        assert_eq!(of(json!({"protocol": "dns"})), RULE_TYPE_SYSTEM);
        assert_eq!(RuleState::default().rule_type(), RULE_TYPE_CUSTOM_JSON);
    }

    #[test]
    fn test_emitted_rules() {
        let many = CatalogRule::new(
            "multi",
            RuleBody::Many(vec![map(json!({"domain": ["a"]})), map(json!({"ip_cidr": ["1.1.1.1/32"]}))]),
        );
        let mut state = RuleState::from_catalog(many);
        assert!(state.emitted_rules().is_empty());

        state.enabled = true;
        state.selected_outbound = "proxy".into();
        let rules = state.emitted_rules();
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|r| r["outbound"] == "proxy"));
    }

    #[test]
    fn test_format_rule() {
        let text = format_rule(&map(json!({"domain": ["a"]})), "drop").unwrap();
        assert!(text.contains("\"method\": \"drop\""));
    }
}
