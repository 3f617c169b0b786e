//! # boxwiz Parser
//!
//! The subscription side of the wizard.
//!
//! This crate provides:
//! - **Model**: `ParserConfig`, `ProxySource`, `OutboundConfig`
//! - **Normalization**: version stamping, defaults and stable serialization
//! - **Reconciliation**: rebuilding proxy sources from user input
//! - **Required outbounds**: template-enforced global selectors
//! - **Validation**: URLs, links, outbounds, rules and whole configs
//! - **Import**: reading `@ParserConfig` back out of a generated document
//! - **Fetching**: HTTP subscription download and decoding
//! - **Generation**: the outbound generator seam
//!
//! ## Example
//!
//! ```
//! use boxwiz_parser::{reconcile, SchemeClassifier};
//!
//! let previous = r#"{"ParserConfig": {"proxies": [], "outbounds": []}}"#;
//! let text = reconcile("https://example.com/sub", previous, &SchemeClassifier)?;
//! assert!(text.contains("https://example.com/sub"));
//! # Ok::<(), boxwiz_types::WizardError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod required;
pub mod validate;
pub mod extract;
pub mod links;
pub mod fetch;
pub mod check;
pub mod generator;

pub use model::{OutboundConfig, ParserConfig, ParserConfigFile, ParserSettings, ProxySource, WizardAnnotation};
pub use normalize::{normalize, normalize_text, parse, serialize};
pub use reconcile::{reconcile, reconcile_config, ClassifiedInput};
pub use required::{ensure_required_from_text, ensure_required_outbounds, Enforcement};
pub use validate::{
    validate_json_size, validate_outbound, validate_parser_config, validate_parser_config_text,
    validate_response_size, validate_rule, validate_uri, validate_url,
};
pub use extract::{extract_parser_config, load_existing, source_lines, ConfigOrigin, ExistingConfig};
pub use links::{decode_subscription, SchemeClassifier};
pub use fetch::{FetchConfig, HttpFetcher};
pub use check::{check_input, check_input_with_progress, CheckReport};
pub use generator::{GenerationResult, OutboundGenerator, PregeneratedOutbounds, TagCounts};
