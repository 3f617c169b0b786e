//! The `ParserConfig` data model.
//!
//! A parser configuration lists the proxy sources to fetch, the selector
//! outbounds to generate around them, and the parser's own refresh
//! settings. On disk it is always wrapped in a `{"ParserConfig": ...}`
//! object.

use boxwiz_types::RequiredLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key wrapping the parser configuration in every serialized form.
pub const PARSER_CONFIG_WRAPPER: &str = "ParserConfig";

/// The `{"ParserConfig": ...}` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParserConfigFile {
    /// The wrapped configuration
    #[serde(rename = "ParserConfig")]
    pub parser_config: ParserConfig,
}

/// Subscription parser configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Format version; `0` means unset
    #[serde(default, skip_serializing_if = "is_zero")]
    pub version: u32,

    /// Proxy sources, in user order
    #[serde(default)]
    pub proxies: Vec<ProxySource>,

    /// Global selector outbounds
    #[serde(default)]
    pub outbounds: Vec<OutboundConfig>,

    /// Refresh settings
    #[serde(default)]
    pub parser: ParserSettings,
}

/// The `parser` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserSettings {
    /// Automatic refresh interval, e.g. `4h`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reload: String,

    /// Time of the last refresh, RFC 3339 in UTC
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_updated: String,
}

/// One subscription URL or group of direct links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxySource {
    /// Subscription URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,

    /// Direct connection links
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<String>,

    /// Node filters; a node matching any map is skipped
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip: Vec<BTreeMap<String, String>>,

    /// Selectors scoped to this source
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outbounds: Vec<OutboundConfig>,

    /// Prepended to every node tag
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag_prefix: String,

    /// Appended to every node tag
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag_postfix: String,

    /// Tag template overriding prefix and postfix
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag_mask: String,
}

impl ProxySource {
    /// A source entry for a subscription URL.
    pub fn subscription(url: impl Into<String>) -> Self {
        Self {
            source: url.into(),
            ..Default::default()
        }
    }

    /// A source entry holding direct links.
    pub fn direct(connections: Vec<String>) -> Self {
        Self {
            connections,
            ..Default::default()
        }
    }

    /// Whether neither a URL nor links are set.
    pub fn is_placeholder(&self) -> bool {
        self.source.is_empty() && self.connections.is_empty()
    }
}

/// A selector-style outbound declared by the parser configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboundConfig {
    /// Outbound tag
    #[serde(default)]
    pub tag: String,

    /// Outbound type, e.g. `selector` or `urltest`
    #[serde(default, rename = "type")]
    pub kind: String,

    /// Extra sing-box options copied into the generated outbound
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,

    /// Node filters selecting the members
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub filters: Map<String, Value>,

    /// Tags appended to the member list
    #[serde(default, rename = "addOutbounds", skip_serializing_if = "Vec::is_empty")]
    pub add_outbounds: Vec<String>,

    /// Filter picking the default member
    #[serde(default, rename = "preferredDefault", skip_serializing_if = "Map::is_empty")]
    pub preferred_default: Map<String, Value>,

    /// Free-text note
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,

    /// Wizard-only annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wizard: Option<WizardAnnotation>,
}

impl OutboundConfig {
    /// Create an outbound with a tag and a type.
    pub fn new(tag: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Enforcement level from `wizard.required`.
    pub fn required(&self) -> RequiredLevel {
        match &self.wizard {
            Some(WizardAnnotation::Settings { required, .. }) => RequiredLevel::from(*required),
            _ => RequiredLevel::None,
        }
    }

    /// Whether the wizard hides this outbound from choice lists.
    pub fn hidden(&self) -> bool {
        match &self.wizard {
            Some(WizardAnnotation::Flag(flag)) => flag == "hide",
            Some(WizardAnnotation::Settings { hide, .. }) => *hide,
            None => false,
        }
    }

    /// Field-by-field equality that ignores the `required` level.
    pub fn matches_strict(&self, other: &OutboundConfig) -> bool {
        self.tag == other.tag
            && self.kind == other.kind
            && self.comment == other.comment
            && self.hidden() == other.hidden()
            && self.add_outbounds == other.add_outbounds
            && self.options == other.options
            && self.filters == other.filters
            && self.preferred_default == other.preferred_default
    }
}

/// The `wizard` field: either the bare string `"hide"` or a settings object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WizardAnnotation {
    /// Shorthand flag, `"hide"`
    Flag(String),
    /// Full settings
    Settings {
        /// Enforcement level
        #[serde(default, skip_serializing_if = "is_zero_i64")]
        required: i64,
        /// Hidden from choice lists
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        hide: bool,
    },
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}
