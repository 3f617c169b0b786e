//! # boxwiz Document
//!
//! Turning a template plus wizard choices into the final sing-box document:
//! - Per-rule state and outbound/action exclusivity
//! - Route merging of catalog and custom rules
//! - The `outbounds` array with its `@ParserSTART`/`@ParserEND` region
//! - Section formatting and the document builder
//! - The wizard model and a session coordinating background builds

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod rules;
pub mod format;
pub mod merge;
pub mod outbounds;
pub mod options;
pub mod model;
pub mod builder;
pub mod session;

pub use rules::{apply_outbound, format_rule, RuleState};
pub use format::{format_section, indent, indent_multiline, section_entry};
pub use merge::{merge_route, merge_route_text};
pub use outbounds::{assemble_outbounds, static_outbounds, PARSER_END_MARKER, PARSER_START_MARKER};
pub use options::{available_outbounds, ensure_final_selected};
pub use model::WizardModel;
pub use builder::DocumentBuilder;
pub use session::WizardSession;

use boxwiz_template::TemplateData;
use boxwiz_types::{BuildMode, Result};

/// Document facade for one-shot builds.
pub struct Document;

impl Document {
    /// Build a saved document for `model`.
    pub fn build(template: &TemplateData, model: &WizardModel) -> Result<String> {
        DocumentBuilder::new(template).build(model)
    }

    /// Build a preview of `model`.
    pub fn preview(template: &TemplateData, model: &WizardModel, node_limit: usize) -> Result<String> {
        DocumentBuilder::new(template)
            .mode(BuildMode::Preview)
            .preview_limit(node_limit)
            .build(model)
    }

    /// The generated region of a document, between the two markers.
    pub fn generated_region(document: &str) -> Option<&str> {
        let start = document.find(PARSER_START_MARKER)? + PARSER_START_MARKER.len();
        let end = document[start..].find(PARSER_END_MARKER)? + start;
        Some(&document[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxwiz_parser::GenerationResult;
    use boxwiz_types::Platform;

    #[test]
    fn test_document_facade() {
        let template = TemplateData::from_bytes(
            br#"{"parser_config": {"proxies": [{}]}, "config": {"outbounds": [], "route": {}}}"#,
            &Platform::new("linux"),
        )
        .unwrap();
        let mut model = WizardModel::from_template(&template);
        model.generated = GenerationResult {
            outbounds_json: (0..3).map(|i| format!("{{\"tag\":\"n{}\"}}", i)).collect(),
            nodes_count: 3,
            ..Default::default()
        };

        let saved = Document::build(&template, &model).unwrap();
        let region = Document::generated_region(&saved).unwrap();
        assert!(region.contains("n0") && region.contains("n2"));
        assert!(saved.contains("\"final\": \"direct-out\""));

        let preview = Document::preview(&template, &model, 2).unwrap();
        assert!(Document::generated_region(&preview).unwrap().contains("// Generated: 3 nodes"));
        assert!(Document::generated_region("{}").is_none());
    }
}
