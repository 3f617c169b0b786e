//! # boxwiz Template
//!
//! Loading and interpreting the wizard template:
//! - Platform-conditional overlays on the base config document
//! - Order-preserving section parsing
//! - Routing-rule catalog filtering and outbound classification
//! - The [`TemplateData`] record shared by the rest of the wizard
//!
//! ## Example
//!
//! ```no_run
//! use boxwiz_template::TemplateData;
//! use boxwiz_types::Platform;
//!
//! let template = TemplateData::load("bin/wizard_template.json", &Platform::current())?;
//! for name in template.sections.order() {
//!     println!("{}", name);
//! }
//! # Ok::<(), boxwiz_types::WizardError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod loader;
pub mod ordered;
pub mod overlay;

pub use catalog::{
    compute_outbound_info, filter_catalog, CatalogRule, CatalogRuleRecord, OutboundInfo, RuleBody,
    RuleMap,
};
pub use loader::{
    effective_sections, extract_default_final, wrap_parser_config, TemplateData,
    PARSER_CONFIG_KEY, TEMPLATE_FILE_NAME,
};
pub use ordered::{parse_ordered, sections_from_value, OrderedSections};
pub use overlay::{apply_overlays, Overlay};
