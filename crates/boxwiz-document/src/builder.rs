//! Document builder assembling the final configuration text.

use boxwiz_parser::extract::PARSER_CONFIG_MARKER;
use boxwiz_parser::normalize_text;
use boxwiz_template::TemplateData;
use boxwiz_types::constants::MAX_NODES_FOR_FULL_PREVIEW;
use boxwiz_types::{bail, BuildMode, Result, WizardError};
use std::time::Instant;
use tracing::{debug, info};

use crate::format::{format_section, section_entry};
use crate::merge::merge_route_text;
use crate::model::WizardModel;
use crate::outbounds::assemble_outbounds;

/// Builder for one configuration document.
///
/// Building only reads the template and the model; it never writes files
/// and returns either the whole document or an error.
pub struct DocumentBuilder<'a> {
    template: &'a TemplateData,
    mode: BuildMode,
    preview_limit: usize,
}

impl<'a> DocumentBuilder<'a> {
    /// Create a builder in save mode.
    pub fn new(template: &'a TemplateData) -> Self {
        Self {
            template,
            mode: BuildMode::Save,
            preview_limit: MAX_NODES_FOR_FULL_PREVIEW,
        }
    }

    /// Set the build mode.
    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for preview mode.
    pub fn preview(self) -> Self {
        self.mode(BuildMode::Preview)
    }

    /// Node count above which a preview shows a summary.
    pub fn preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    /// Build the document for `model`.
    pub fn build(&self, model: &WizardModel) -> Result<String> {
        let start = Instant::now();

        if model.parser_config_text.trim().is_empty() {
            bail!(Validation, "ParserConfig is empty");
        }
        let parser_config = normalize_text(&model.parser_config_text, self.mode.refreshes_timestamp())
            .unwrap_or_else(|| model.parser_config_text.clone());

        let sections = self.template.sections_for_build(model.enable_tun)?;

        let mut entries = Vec::with_capacity(sections.len());
        for (key, raw) in sections.iter() {
            if !model.is_section_selected(key) {
                debug!(section = key, "section deselected");
                continue;
            }
            let formatted = match key {
                "outbounds" => assemble_outbounds(raw, &model.generated, self.mode, self.preview_limit),
                "route" => {
                    let merged =
                        merge_route_text(raw, &model.rule_states, &model.custom_rules, &model.selected_final)?;
                    format_section(&serde_json::to_string(&merged)?, 1)
                }
                _ => format_section(raw, 1),
            };
            entries.push(section_entry(key, &formatted));
        }

        if entries.is_empty() {
            return Err(WizardError::Structural("no config sections found".to_string()));
        }

        let document = format!(
            "{{\n{}\n{}\n*/\n{}\n}}\n",
            PARSER_CONFIG_MARKER,
            parser_config,
            entries.join(",\n")
        );

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if self.mode.is_preview() {
            debug!(sections = entries.len(), bytes = document.len(), elapsed_ms, "preview built");
        } else {
            info!(sections = entries.len(), bytes = document.len(), elapsed_ms, "document built");
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxwiz_parser::{extract_parser_config, GenerationResult};
    use boxwiz_types::Platform;
    use serde_json::json;

    const TEMPLATE: &str = r#"{
      "parser_config": {"version": 3, "proxies": [{"source": "https://a.example/sub"}],
                        "outbounds": [{"tag": "proxy-out", "type": "selector"}]},
      "config": {
        "log": {"level": "info"},
        "dns": {"servers": [{"tag": "local", "address": "local"}]},
        "outbounds": [{"type": "direct", "tag": "direct-out"}],
        "route": {"rules": [{"protocol": "dns", "action": "hijack-dns"}], "final": "proxy-out"},
        "experimental": {"cache_file": {"enabled": true}}
      },
      "selectable_rules": [
        {"label": "Block ads", "default": true, "rule": {"domain_suffix": ["ads.example"], "action": "reject"}},
        {"label": "Direct", "rule": {"domain_suffix": [".ru"], "outbound": "direct-out"}}
      ]
    }"#;

    fn setup() -> (TemplateData, WizardModel) {
        let template = TemplateData::from_bytes(TEMPLATE.as_bytes(), &Platform::new("linux")).unwrap();
        let mut model = WizardModel::from_template(&template);
        model.generated = GenerationResult {
            outbounds_json: vec![r#"{"tag":"NL","type":"vless"}"#.to_string()],
            nodes_count: 1,
            ..Default::default()
        };
        (template, model)
    }

    #[test]
    fn test_document_layout() {
        let (template, model) = setup();
        let doc = DocumentBuilder::new(&template).preview().build(&model).unwrap();

        assert!(doc.starts_with("{\n/** @ParserConfig\n{\n  \"ParserConfig\": {\n"));
        assert!(doc.ends_with("\n  }\n}\n"));
        let order: Vec<usize> = ["\"log\"", "\"dns\"", "\"outbounds\"", "\"route\"", "\"experimental\""]
            .iter()
            .map(|k| doc.find(&format!("\n  {}: ", k)).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(doc.contains("    /** @ParserSTART */\n    {\"tag\":\"NL\",\"type\":\"vless\"},\n    /** @ParserEND */\n    {\"type\":\"direct\",\"tag\":\"direct-out\"}\n  ]"));
    }

    #[test]
    fn test_route_is_merged() {
        let (template, mut model) = setup();
        model.set_rule_enabled("Direct", true).unwrap();
        model.selected_final = "direct-out".into();
        // The outbounds array carries marker comments and is not strict JSON.
        model.set_section_selected("outbounds", false);

        let doc = DocumentBuilder::new(&template).build(&model).unwrap();
        let start = doc.find("*/\n").unwrap() + 3;
        let body: serde_json::Value =
            serde_json::from_str(&format!("{{{}", doc[start..].trim_end())).unwrap();

        assert_eq!(body["route"]["rules"].as_array().unwrap().len(), 3);
        assert_eq!(body["route"]["final"], "direct-out");
        assert_eq!(body["route"]["rules"][1], json!({"domain_suffix": ["ads.example"], "action": "reject"}));
    }

    #[test]
    fn test_parser_config_round_trips_through_document() {
        let (template, model) = setup();
        let doc = DocumentBuilder::new(&template).build(&model).unwrap();

        let config = extract_parser_config(&doc).unwrap();
        assert_eq!(config.proxies[0].source, "https://a.example/sub");
        assert!(!config.parser.last_updated.is_empty());

        let preview = DocumentBuilder::new(&template).preview().build(&model).unwrap();
        assert!(extract_parser_config(&preview).unwrap().parser.last_updated.is_empty());
    }

    #[test]
    fn test_deselected_sections_and_raw_passthrough() {
        let (template, mut model) = setup();
        model.set_section_selected("experimental", false);
        model.set_section_selected("dns", false);
        model.set_parser_config_text("{ broken");

        let doc = DocumentBuilder::new(&template).build(&model).unwrap();
        assert!(!doc.contains("\"experimental\""));
        assert!(!doc.contains("\n  \"dns\": "));
        assert!(doc.starts_with("{\n/** @ParserConfig\n{ broken\n*/\n"));
    }

    #[test]
    fn test_failures() {
        let (template, mut model) = setup();
        for section in ["log", "dns", "outbounds", "route", "experimental"] {
            model.set_section_selected(section, false);
        }
        let err = DocumentBuilder::new(&template).build(&model).unwrap_err();
        assert!(err.is_structural());

        model.parser_config_text.clear();
        let err = DocumentBuilder::new(&template).build(&model).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: ParserConfig is empty");
    }
}
