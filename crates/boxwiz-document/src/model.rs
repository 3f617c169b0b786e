//! Mutable wizard state for one session.

use boxwiz_parser::{validate_rule, ExistingConfig, GenerationResult, ParserConfig};
use boxwiz_template::{RuleMap, TemplateData};
use boxwiz_types::{bail, Result};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::options::{available_outbounds, ensure_final_selected};
use crate::rules::RuleState;

/// Everything the user can change before a build.
#[derive(Debug, Clone, Default)]
pub struct WizardModel {
    /// Parser configuration as the user edits it, wrapped
    pub parser_config_text: String,
    /// `parser_config_text` parsed, when it parses
    pub parser_config: Option<ParserConfig>,
    /// Subscription URLs and direct links, one per line
    pub source_text: String,
    /// Last generation result
    pub generated: GenerationResult,
    /// Rule states for the template catalog, in catalog order
    pub rule_states: Vec<RuleState>,
    /// User-authored rules, in insertion order
    pub custom_rules: Vec<RuleState>,
    /// Chosen `route.final`
    pub selected_final: String,
    /// Whether the TUN inbound is wanted (darwin only)
    pub enable_tun: bool,
    deselected: BTreeSet<String>,
}

impl WizardModel {
    /// Fresh state seeded from the template.
    pub fn from_template(template: &TemplateData) -> Self {
        let mut model = Self {
            rule_states: template.rules.iter().cloned().map(RuleState::from_catalog).collect(),
            selected_final: template.default_final.clone(),
            enable_tun: true,
            ..Default::default()
        };
        model.set_parser_config_text(&template.parser_config);
        model.refresh_outbound_choices(&template.default_final);
        debug!(rules = model.rule_states.len(), "wizard model initialized");
        model
    }

    /// Adopt a configuration recovered from an existing document.
    pub fn apply_existing(&mut self, existing: &ExistingConfig) {
        if existing.parser_config.is_empty() {
            return;
        }
        self.set_parser_config_text(&existing.parser_config);
        self.source_text = existing.source_lines.clone();
    }

    /// Replace the parser-config text and reparse it.
    ///
    /// Unparseable text is kept as written; the previous parse is dropped.
    pub fn set_parser_config_text(&mut self, text: &str) {
        self.parser_config_text = text.to_string();
        self.parser_config = match boxwiz_parser::parse(text) {
            Ok(config) => Some(config),
            Err(e) => {
                if !text.trim().is_empty() {
                    warn!(error = %e, "parser config does not parse");
                }
                None
            }
        };
    }

    /// Whether `section` goes into the built document.
    pub fn is_section_selected(&self, section: &str) -> bool {
        !self.deselected.contains(section)
    }

    /// Include or exclude a section.
    pub fn set_section_selected(&mut self, section: &str, selected: bool) {
        if selected {
            self.deselected.remove(section);
        } else {
            self.deselected.insert(section.to_string());
        }
    }

    /// Sections explicitly left out, sorted.
    pub fn deselected_sections(&self) -> impl Iterator<Item = &str> {
        self.deselected.iter().map(String::as_str)
    }

    /// Outbounds offered to rules and `route.final`.
    pub fn available_outbounds(&self) -> Vec<String> {
        available_outbounds(self.parser_config.as_ref())
    }

    /// Fill empty rule selections and make sure `route.final` is offered.
    pub fn refresh_outbound_choices(&mut self, default_final: &str) {
        let options = self.available_outbounds();
        for state in self.rule_states.iter_mut().chain(self.custom_rules.iter_mut()) {
            if state.rule.has_outbound {
                state.ensure_default_outbound(&options);
            }
        }
        self.selected_final = ensure_final_selected(&self.selected_final, &options, default_final);
    }

    /// Append a user-authored rule.
    pub fn add_custom_rule(&mut self, label: &str, body: RuleMap) -> Result<()> {
        validate_rule(&body)?;
        if label.trim().is_empty() {
            bail!(Validation, "custom rule label is empty");
        }
        self.custom_rules.push(RuleState::custom(label.trim(), body));
        Ok(())
    }

    /// Remove a custom rule by position.
    pub fn remove_custom_rule(&mut self, index: usize) -> Option<RuleState> {
        (index < self.custom_rules.len()).then(|| self.custom_rules.remove(index))
    }

    /// Enable or disable a catalog rule by label.
    pub fn set_rule_enabled(&mut self, label: &str, enabled: bool) -> Result<()> {
        match self.rule_states.iter_mut().find(|s| s.rule.label == label) {
            Some(state) => {
                state.enabled = enabled;
                Ok(())
            }
            None => bail!(Validation, "no catalog rule labelled '{}'", label),
        }
    }

    /// Enabled rules, catalog and custom.
    pub fn enabled_rule_count(&self) -> usize {
        self.rule_states
            .iter()
            .chain(self.custom_rules.iter())
            .filter(|s| s.enabled)
            .count()
    }
}
