//! The routing-rule catalog offered by a template.
//!
//! Each catalog rule carries either one route rule or a list of them, plus
//! optional `rule_set` definitions the rule depends on. The outbound a rule
//! routes to by default is derived from its body.

use boxwiz_types::{Platform, DROP_METHOD, REJECT_ACTION};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object used as a route rule body.
pub type RuleMap = Map<String, Value>;

/// Body of a catalog or custom rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RuleBody {
    /// A single route rule
    Single(RuleMap),
    /// Several route rules sharing one outbound selection
    Many(Vec<RuleMap>),
    /// No rule body at all
    #[default]
    Empty,
}

impl RuleBody {
    /// Build a body from the two optional template fields.
    ///
    /// A non-empty `rules` list wins over `rule` when both are given.
    pub fn from_parts(rule: Option<RuleMap>, rules: Option<Vec<RuleMap>>) -> Self {
        match (rule, rules) {
            (_, Some(rules)) if !rules.is_empty() => RuleBody::Many(rules),
            (Some(rule), _) => RuleBody::Single(rule),
            _ => RuleBody::Empty,
        }
    }

    /// The rule inspected for outbound information.
    pub fn primary(&self) -> Option<&RuleMap> {
        match self {
            RuleBody::Single(rule) => Some(rule),
            RuleBody::Many(rules) => rules.first(),
            RuleBody::Empty => None,
        }
    }

    /// Whether there is nothing to emit.
    pub fn is_empty(&self) -> bool {
        matches!(self, RuleBody::Empty)
    }
}

/// Default outbound and selectability derived from a rule body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutboundInfo {
    /// Outbound (or `reject`/`drop`) the rule uses as shipped
    pub default_outbound: String,
    /// Whether the user may pick an outbound for this rule
    pub has_outbound: bool,
}

/// Inspect the primary rule's `action`/`outbound` fields.
pub fn compute_outbound_info(body: &RuleBody) -> OutboundInfo {
    let Some(rule) = body.primary() else {
        return OutboundInfo::default();
    };

    if rule.get("action").and_then(Value::as_str) == Some(REJECT_ACTION) {
        let default_outbound = if rule.get("method").and_then(Value::as_str) == Some(DROP_METHOD) {
            DROP_METHOD
        } else {
            REJECT_ACTION
        };
        return OutboundInfo {
            default_outbound: default_outbound.to_string(),
            has_outbound: true,
        };
    }

    match rule.get("outbound") {
        Some(outbound) => OutboundInfo {
            default_outbound: outbound.as_str().unwrap_or_default().to_string(),
            has_outbound: true,
        },
        None => OutboundInfo::default(),
    }
}

/// A catalog entry as written in the template's `selectable_rules`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogRuleRecord {
    /// Display name
    #[serde(default)]
    pub label: String,

    /// Tooltip text
    #[serde(default)]
    pub description: String,

    /// Enabled on first run
    #[serde(default)]
    pub default: bool,

    /// Platforms the rule is offered on; empty means all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,

    /// `rule_set` definitions added to the route when the rule is enabled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_set: Vec<Value>,

    /// Single route rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleMap>,

    /// Multiple route rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RuleMap>>,
}

/// A user-selectable routing rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogRule {
    /// Display name
    pub label: String,
    /// Tooltip text
    pub description: String,
    /// Enabled on first run
    pub is_default: bool,
    /// Platforms the rule is offered on
    pub platforms: Vec<String>,
    /// `rule_set` definitions the rule depends on
    pub rule_sets: Vec<Value>,
    /// Route rule body
    pub body: RuleBody,
    /// Derived default outbound
    pub default_outbound: String,
    /// Derived selectability
    pub has_outbound: bool,
}

impl CatalogRule {
    /// Build a rule from its parts and derive outbound information.
    pub fn new(label: impl Into<String>, body: RuleBody) -> Self {
        let OutboundInfo {
            default_outbound,
            has_outbound,
        } = compute_outbound_info(&body);
        Self {
            label: label.into(),
            body,
            default_outbound,
            has_outbound,
            ..Default::default()
        }
    }

    /// Convert a template record.
    pub fn from_record(record: CatalogRuleRecord) -> Self {
        let body = RuleBody::from_parts(record.rule, record.rules);
        Self {
            description: record.description,
            is_default: record.default,
            platforms: record.platforms,
            rule_sets: record.rule_set,
            ..Self::new(record.label, body)
        }
    }

    /// Rebuild a rule from its flat persisted form.
    ///
    /// A `rules` array inside `raw` yields a multi-rule body and a
    /// `rule_set` array of definition objects is lifted out as
    /// dependencies; everything else is the single rule body.
    pub fn from_raw(label: impl Into<String>, description: impl Into<String>, raw: Option<RuleMap>) -> Self {
        let Some(mut raw) = raw else {
            return Self {
                description: description.into(),
                ..Self::new(label, RuleBody::Empty)
            };
        };

        // Rule-set definitions are objects; a route rule's own `rule_set`
        // field holds tag strings and stays in the body.
        let lift = matches!(
            raw.get("rule_set"),
            Some(Value::Array(items)) if !items.is_empty() && items.iter().all(Value::is_object)
        );
        let rule_sets = match lift.then(|| raw.remove("rule_set")).flatten() {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };

        let many: Option<Vec<RuleMap>> = match raw.get("rules") {
            Some(Value::Array(items)) if raw.len() == 1 => Some(
                items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect(),
            ),
            _ => None,
        };
        let body = match many {
            Some(rules) => RuleBody::from_parts(None, Some(rules)),
            None => RuleBody::Single(raw),
        };

        Self {
            description: description.into(),
            rule_sets,
            ..Self::new(label, body)
        }
    }

    /// Flat persisted form; inverse of [`from_raw`](Self::from_raw).
    pub fn to_raw(&self) -> Option<RuleMap> {
        let mut raw = match &self.body {
            RuleBody::Single(rule) => rule.clone(),
            RuleBody::Many(rules) => {
                let mut map = RuleMap::new();
                map.insert(
                    "rules".to_string(),
                    Value::Array(rules.iter().cloned().map(Value::Object).collect()),
                );
                map
            }
            RuleBody::Empty if self.rule_sets.is_empty() => return None,
            RuleBody::Empty => RuleMap::new(),
        };
        if !self.rule_sets.is_empty() {
            raw.insert("rule_set".to_string(), Value::Array(self.rule_sets.clone()));
        }
        Some(raw)
    }
}

/// Keep the rules offered on `platform` and label any unnamed ones.
///
/// The `darwin-tun` alias always counts as matching on darwin here; TUN
/// gating only applies to overlays.
pub fn filter_catalog(records: Vec<CatalogRuleRecord>, platform: &Platform) -> Vec<CatalogRule> {
    let mut rules: Vec<CatalogRule> = Vec::new();
    for record in records {
        if !platform.matches(&record.platforms, true) {
            continue;
        }
        let mut rule = CatalogRule::from_record(record);
        if rule.label.is_empty() {
            rule.label = format!("Rule {}", rules.len() + 1);
        }
        rules.push(rule);
    }
    rules
}
