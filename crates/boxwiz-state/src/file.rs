//! The on-disk wizard state record.

use boxwiz_core::time::now_rfc3339;
use boxwiz_document::{RuleState, WizardModel};
use boxwiz_parser::{serialize, source_lines, ParserConfig};
use boxwiz_template::{CatalogRule, RuleMap, TemplateData};
use boxwiz_types::constants::WIZARD_STATE_VERSION;
use boxwiz_types::{bail, Result, StateId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Config parameter name holding the chosen `route.final`.
pub const ROUTE_FINAL_PARAM: &str = "route.final";

/// A saved wizard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardStateFile {
    /// Format version
    #[serde(default)]
    pub version: u32,

    /// State name; absent for the current state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StateId>,

    /// Free-text note
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,

    /// RFC 3339 creation time
    #[serde(default)]
    pub created_at: String,

    /// RFC 3339 time of the last save
    #[serde(default)]
    pub updated_at: String,

    /// The parser configuration, unwrapped
    pub parser_config: ParserConfig,

    /// Dotted-path settings such as `route.final`
    #[serde(default)]
    pub config_params: Vec<ConfigParam>,

    /// User choices for template catalog rules
    #[serde(default)]
    pub selectable_rule_states: Vec<PersistedSelection>,

    /// User-authored rules
    #[serde(default)]
    pub custom_rules: Vec<PersistedRuleState>,
}

/// A named setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigParam {
    /// Dotted path
    pub name: String,
    /// Value
    pub value: String,
}

/// Choices made for one catalog rule, matched back by label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSelection {
    /// Catalog label
    pub label: String,
    /// Enabled flag
    pub enabled: bool,
    /// Selected outbound
    #[serde(default)]
    pub selected_outbound: String,
}

/// A full rule state, used for custom rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRuleState {
    /// Display category such as `Domains/URLs`
    #[serde(rename = "type")]
    pub kind: String,
    /// Rule definition
    pub rule: PersistedRule,
    /// Enabled flag
    pub enabled: bool,
    /// Selected outbound
    #[serde(default)]
    pub selected_outbound: String,
}

/// Serialized rule definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedRule {
    /// Display name
    pub label: String,
    /// Tooltip text
    #[serde(default)]
    pub description: String,
    /// Rule body in its flat form
    #[serde(default)]
    pub raw: Option<RuleMap>,
    /// Derived default outbound
    #[serde(default)]
    pub default_outbound: String,
    /// Derived selectability
    #[serde(default)]
    pub has_outbound: bool,
    /// Enabled on first run
    #[serde(default)]
    pub is_default: bool,
}

impl PersistedRuleState {
    /// Capture `state`; the type label is derived from its body.
    pub fn from_state(state: &RuleState) -> Self {
        Self {
            kind: state.rule_type().to_string(),
            rule: PersistedRule {
                label: state.rule.label.clone(),
                description: state.rule.description.clone(),
                raw: state.rule.to_raw(),
                default_outbound: state.rule.default_outbound.clone(),
                has_outbound: state.rule.has_outbound,
                is_default: state.rule.is_default,
            },
            enabled: state.enabled,
            selected_outbound: state.selected_outbound.clone(),
        }
    }

    /// Rebuild the rule state.
    pub fn to_state(&self) -> RuleState {
        let rule = CatalogRule {
            default_outbound: self.rule.default_outbound.clone(),
            has_outbound: self.rule.has_outbound,
            is_default: self.rule.is_default,
            ..CatalogRule::from_raw(&self.rule.label, &self.rule.description, self.rule.raw.clone())
        };
        RuleState {
            rule,
            enabled: self.enabled,
            selected_outbound: self.selected_outbound.clone(),
        }
    }
}

impl WizardStateFile {
    /// An empty record at the current version.
    pub fn new(parser_config: ParserConfig) -> Self {
        Self {
            version: WIZARD_STATE_VERSION,
            id: None,
            comment: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
            parser_config,
            config_params: Vec::new(),
            selectable_rule_states: Vec::new(),
            custom_rules: Vec::new(),
        }
    }

    /// Capture `model`.
    ///
    /// The parser configuration must parse; a state is never saved with
    /// text the user has not finished editing.
    pub fn from_model(model: &WizardModel, default_final: &str) -> Result<Self> {
        let Some(parser_config) = model.parser_config.clone() else {
            bail!(Validation, "parser config does not parse; fix it before saving the state");
        };

        let final_outbound = if model.selected_final.is_empty() {
            default_final
        } else {
            &model.selected_final
        };

        let now = now_rfc3339();
        let mut state = Self::new(parser_config);
        state.created_at = now.clone();
        state.updated_at = now;
        if !final_outbound.is_empty() {
            state.config_params.push(ConfigParam {
                name: ROUTE_FINAL_PARAM.to_string(),
                value: final_outbound.to_string(),
            });
        }
        state.selectable_rule_states = model
            .rule_states
            .iter()
            .map(|s| PersistedSelection {
                label: s.rule.label.clone(),
                enabled: s.enabled,
                selected_outbound: s.selected_outbound.clone(),
            })
            .collect();
        state.custom_rules = model.custom_rules.iter().map(PersistedRuleState::from_state).collect();
        Ok(state)
    }

    /// Value of a config parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.config_params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Rebuild a model for `template` from this record.
    ///
    /// Catalog rules are matched by label. Template rules without a saved
    /// choice get their defaults; saved choices for rules the template no
    /// longer has are dropped.
    pub fn restore(&self, template: &TemplateData) -> Result<WizardModel> {
        let mut model = WizardModel::from_template(template);
        model.set_parser_config_text(&serialize(&self.parser_config)?);
        model.source_text = source_lines(&self.parser_config);

        model.selected_final = self
            .param(ROUTE_FINAL_PARAM)
            .filter(|v| !v.is_empty())
            .unwrap_or(&template.default_final)
            .to_string();

        let saved: HashMap<&str, &PersistedSelection> = self
            .selectable_rule_states
            .iter()
            .map(|s| (s.label.as_str(), s))
            .collect();
        for state in &mut model.rule_states {
            match saved.get(state.rule.label.as_str()) {
                Some(choice) => {
                    state.enabled = choice.enabled;
                    state.selected_outbound = choice.selected_outbound.clone();
                }
                None => {
                    debug!(label = %state.rule.label, "no saved choice, using template default");
                    state.enabled = state.rule.is_default;
                    state.selected_outbound = state.rule.default_outbound.clone();
                }
            }
        }

        model.custom_rules = self.custom_rules.iter().map(PersistedRuleState::to_state).collect();
        model.refresh_outbound_choices(&template.default_final);
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxwiz_types::Platform;
    use serde_json::json;

    const TEMPLATE: &str = r#"{
      "parser_config": {"version": 3, "proxies": [{"source": "https://a.example/sub"}],
                        "outbounds": [{"tag": "proxy-out", "type": "selector"}]},
      "config": {"route": {"rules": [], "final": "proxy-out"}},
      "selectable_rules": [
        {"label": "Block ads", "default": true, "rule": {"domain": ["ads.example"], "action": "reject"}},
        {"label": "Direct RU", "rule": {"domain_suffix": [".ru"], "outbound": "direct-out"}},
        {"label": "New rule", "default": true, "rule": {"ip_is_private": true, "outbound": "direct-out"}}
      ]
    }"#;

    fn template() -> TemplateData {
        TemplateData::from_bytes(TEMPLATE.as_bytes(), &Platform::new("linux")).unwrap()
    }

    #[test]
    fn test_model_round_trip() {
        let template = template();
        let mut model = WizardModel::from_template(&template);
        model.set_rule_enabled("Direct RU", true).unwrap();
        model.rule_states[1].selected_outbound = "proxy-out".into();
        model.selected_final = "direct-out".into();
        model
            .add_custom_rule("work", json!({"domain_suffix": [".corp"], "outbound": "direct-out"}).as_object().cloned().unwrap())
            .unwrap();
        model.refresh_outbound_choices(&template.default_final);

        let state = WizardStateFile::from_model(&model, &template.default_final).unwrap();
        assert_eq!(state.version, WIZARD_STATE_VERSION);
        assert_eq!(state.param(ROUTE_FINAL_PARAM), Some("direct-out"));
        assert_eq!(state.custom_rules[0].kind, "Domains/URLs");

        let restored = state.restore(&template).unwrap();
        assert_eq!(restored.selected_final, "direct-out");
        assert!(restored.rule_states[1].enabled);
        assert_eq!(restored.rule_states[1].selected_outbound, "proxy-out");
        assert_eq!(restored.custom_rules, model.custom_rules);
        assert_eq!(restored.source_text, "https://a.example/sub");
    }

    #[test]
    fn test_restore_matches_by_label() {
        let template = template();
        let mut state = WizardStateFile::new(ParserConfig::default());
        state.selectable_rule_states = vec![
            PersistedSelection {
                label: "Block ads".into(),
                enabled: false,
                selected_outbound: "reject".into(),
            },
            PersistedSelection {
                label: "Removed from template".into(),
                enabled: true,
                selected_outbound: "proxy-out".into(),
            },
        ];

        let model = state.restore(&template).unwrap();
        assert_eq!(model.rule_states.len(), 3);
        assert!(!model.rule_states[0].enabled);
        assert!(model.rule_states[2].enabled);
        assert_eq!(model.rule_states[2].selected_outbound, "direct-out");
        assert_eq!(model.selected_final, "direct-out");
    }

    #[test]
    fn test_unparseable_model_is_not_saved() {
        let mut model = WizardModel::from_template(&template());
        model.set_parser_config_text("{");
        assert!(WizardStateFile::from_model(&model, "").is_err());
    }

    #[test]
    fn test_json_shape() {
        let mut state = WizardStateFile::new(ParserConfig::default());
        state.custom_rules.push(PersistedRuleState::from_state(&RuleState::custom(
            "x",
            json!({"process_name": ["curl"]}).as_object().cloned().unwrap(),
        )));
        let value = serde_json::to_value(&state).unwrap();

        assert_eq!(value["version"], 1);
        assert!(value.get("id").is_none());
        assert_eq!(value["custom_rules"][0]["type"], "Processes");
        assert_eq!(value["custom_rules"][0]["rule"]["raw"], json!({"process_name": ["curl"]}));
    }
}
