//! Loading the wizard template into [`TemplateData`].
//!
//! The template file has four members:
//!
//! - `parser_config`: the subscription parser configuration fragment
//! - `config`: the base sing-box document
//! - `params`: platform-conditional [`Overlay`]s for `config`
//! - `selectable_rules`: the routing-rule catalog
//!
//! Loading applies matching overlays, splits the result into ordered
//! sections, filters the catalog by platform and reads the default
//! `route.final`.

use boxwiz_core::util::{indent_json, slurp_limited, strip_utf8_bom};
use boxwiz_types::constants::MAX_JSON_CONFIG_SIZE;
use boxwiz_types::{Platform, WizardError, Result};
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info};

use crate::catalog::{filter_catalog, CatalogRule, CatalogRuleRecord};
use crate::ordered::{parse_ordered, sections_from_value, OrderedSections};
use crate::overlay::{apply_overlays, Overlay};

/// File name of the wizard template.
pub const TEMPLATE_FILE_NAME: &str = "wizard_template.json";

/// Top-level key wrapping the parser configuration.
pub const PARSER_CONFIG_KEY: &str = "ParserConfig";

#[derive(Deserialize)]
struct TemplateFile {
    #[serde(default)]
    parser_config: Option<Box<RawValue>>,
    #[serde(default)]
    config: Option<Box<RawValue>>,
    #[serde(default)]
    selectable_rules: Vec<CatalogRuleRecord>,
    #[serde(default)]
    params: Vec<Overlay>,
}

/// A loaded template, read-only for the rest of the wizard session.
#[derive(Debug, Clone)]
pub struct TemplateData {
    /// Parser configuration wrapped as `{"ParserConfig": ...}`
    pub parser_config: String,
    /// Config sections after overlays, in template order
    pub sections: OrderedSections,
    /// The `config` member before any overlay was applied
    pub raw_config: Value,
    /// All overlays, matching or not
    pub overlays: Vec<Overlay>,
    /// Catalog rules offered on the load platform
    pub rules: Vec<CatalogRule>,
    /// `route.final` of the effective config, or empty
    pub default_final: String,
    /// Platform the template was loaded for
    pub platform: Platform,
}

impl TemplateData {
    /// Load a template file.
    pub fn load(path: impl AsRef<Path>, platform: &Platform) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading wizard template");

        let bytes = slurp_limited(path, MAX_JSON_CONFIG_SIZE as u64).map_err(|e| {
            WizardError::Template(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes, platform)
    }

    /// Parse template bytes. Overlays are applied with TUN enabled.
    pub fn from_bytes(bytes: &[u8], platform: &Platform) -> Result<Self> {
        let bytes = strip_utf8_bom(bytes);
        let root: TemplateFile = serde_json::from_slice(bytes)
            .map_err(|e| WizardError::Structural(format!("invalid JSON in {}: {}", TEMPLATE_FILE_NAME, e)))?;

        let parser_config = root
            .parser_config
            .as_deref()
            .map(|raw| wrap_parser_config(raw.get()))
            .unwrap_or_default();
        debug!(len = parser_config.len(), "parser config wrapped");

        let config_text = root
            .config
            .as_deref()
            .map(RawValue::get)
            .ok_or_else(|| WizardError::Template("template has no config member".to_string()))?;

        // Shape check first so a non-object config reports as such.
        parse_ordered(config_text)?;
        let raw_config: Value = serde_json::from_str(config_text)?;

        let sections = effective_sections(&raw_config, &root.params, platform, true)?;
        debug!(sections = ?sections.order().collect::<Vec<_>>(), "config sections");

        let default_final = extract_default_final(&sections);
        let rules = filter_catalog(root.selectable_rules, platform);
        info!(
            rules = rules.len(),
            overlays = root.params.len(),
            %platform,
            "template loaded"
        );

        Ok(Self {
            parser_config,
            sections,
            raw_config,
            overlays: root.params,
            rules,
            default_final,
            platform: platform.clone(),
        })
    }

    /// Sections to build from under the given TUN setting.
    ///
    /// Overlays were applied with TUN enabled at load time. Only darwin has
    /// TUN-gated overlays, so elsewhere the loaded sections are returned
    /// as-is; on darwin the raw config is re-applied and re-parsed.
    pub fn sections_for_build(&self, enable_tun: bool) -> Result<Cow<'_, OrderedSections>> {
        if !self.platform.is_darwin() || self.overlays.is_empty() {
            return Ok(Cow::Borrowed(&self.sections));
        }
        debug!(enable_tun, "re-applying overlays for build");
        effective_sections(&self.raw_config, &self.overlays, &self.platform, enable_tun).map(Cow::Owned)
    }
}

/// Apply overlays to `raw_config` and split the result into sections.
pub fn effective_sections(
    raw_config: &Value,
    overlays: &[Overlay],
    platform: &Platform,
    enable_tun: bool,
) -> Result<OrderedSections> {
    let applied = apply_overlays(raw_config, overlays, platform, enable_tun)?;
    sections_from_value(&applied)
}

/// Wrap the template's parser-config fragment as `{"ParserConfig": ...}`.
///
/// The fragment is re-indented to sit under the wrapper key; if it cannot be
/// parsed it is wrapped verbatim and left for the user to fix.
pub fn wrap_parser_config(raw: &str) -> String {
    match indent_json(raw, "  ", "  ") {
        Ok(indented) => format!("{{\n  \"{}\": {}\n}}", PARSER_CONFIG_KEY, indented),
        Err(_) => format!("{{\n  \"{}\": {}\n}}", PARSER_CONFIG_KEY, raw),
    }
}

/// `route.final` as a string, or empty when missing or not a string.
pub fn extract_default_final(sections: &OrderedSections) -> String {
    match sections.value("route") {
        Some(Ok(route)) => route
            .get("final")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}
