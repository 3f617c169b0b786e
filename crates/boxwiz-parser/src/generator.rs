//! The outbound generator seam.
//!
//! Turning proxy sources into sing-box outbounds is done by an external
//! generator. The wizard only needs its output: one JSON object per
//! generated outbound plus counts for the preview summary.

use async_trait::async_trait;
use boxwiz_core::util::slurp_limited;
use boxwiz_types::constants::MAX_JSON_CONFIG_SIZE;
use boxwiz_types::{bail, Result, WizardError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::model::ParserConfig;

/// Tag occurrence counter shared across one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCounts {
    counts: HashMap<String, usize>,
}

impl TagCounts {
    /// Empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tag` and return a unique spelling of it.
    ///
    /// The first occurrence keeps its name; later ones get `-2`, `-3`, ...
    pub fn unique(&mut self, tag: &str) -> String {
        let count = self.counts.entry(tag.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            tag.to_string()
        } else {
            let renamed = format!("{}-{}", tag, count);
            debug!(tag, renamed = %renamed, "duplicate tag renamed");
            renamed
        }
    }

    /// Times `tag` has been seen.
    pub fn get(&self, tag: &str) -> usize {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    /// Tags seen more than once, sorted.
    pub fn duplicates(&self) -> Vec<(&str, usize)> {
        let mut dups: Vec<(&str, usize)> = self
            .counts
            .iter()
            .filter(|(_, n)| **n > 1)
            .map(|(tag, n)| (tag.as_str(), *n))
            .collect();
        dups.sort();
        dups
    }
}

/// Output of one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
    /// Generated outbounds as JSON objects: nodes, then local, then global selectors
    pub outbounds_json: Vec<String>,
    /// Proxy nodes
    pub nodes_count: usize,
    /// Per-source selectors
    pub local_selectors_count: usize,
    /// Config-wide selectors
    pub global_selectors_count: usize,
}

impl GenerationResult {
    /// Number of generated entries.
    pub fn total(&self) -> usize {
        self.outbounds_json.len()
    }
}

/// Produces outbounds from a parser configuration.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OutboundGenerator: Send + Sync {
    /// Generate outbounds for `config`, deduplicating tags through `tag_counts`.
    async fn generate(&self, config: &ParserConfig, tag_counts: &mut TagCounts) -> Result<GenerationResult>;
}

const SELECTOR_TYPES: &[&str] = &["selector", "urltest"];

/// A generator over outbounds that were produced elsewhere, e.g. by a
/// previous parser run.
#[derive(Debug, Clone, Default)]
pub struct PregeneratedOutbounds {
    outbounds: Vec<Value>,
}

impl PregeneratedOutbounds {
    /// Wrap a list of outbound objects.
    pub fn new(outbounds: Vec<Value>) -> Self {
        Self { outbounds }
    }

    /// Parse a JSON array of outbounds, or an object with an `outbounds` array.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| WizardError::Structural(format!("invalid outbounds JSON: {}", e)))?;
        let list = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("outbounds") {
                Some(Value::Array(items)) => items,
                _ => bail!(Structural, "expected an 'outbounds' array"),
            },
            _ => bail!(Structural, "expected a JSON array of outbounds"),
        };
        Ok(Self::new(list))
    }

    /// Read outbounds from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = slurp_limited(path, MAX_JSON_CONFIG_SIZE as u64)?;
        Self::from_json(&String::from_utf8_lossy(&bytes))
    }
}

#[async_trait]
impl OutboundGenerator for PregeneratedOutbounds {
    async fn generate(&self, config: &ParserConfig, tag_counts: &mut TagCounts) -> Result<GenerationResult> {
        let global: HashSet<&str> = config.outbounds.iter().map(|o| o.tag.as_str()).collect();
        let local: HashSet<&str> = config
            .proxies
            .iter()
            .flat_map(|p| p.outbounds.iter().map(|o| o.tag.as_str()))
            .collect();

        let (mut nodes, mut locals, mut globals) = (Vec::new(), Vec::new(), Vec::new());
        for outbound in &self.outbounds {
            let Value::Object(map) = outbound else {
                warn!("skipping non-object outbound");
                continue;
            };
            let mut map = map.clone();
            let tag = map.get("tag").and_then(Value::as_str).unwrap_or_default().to_string();
            let kind = map.get("type").and_then(Value::as_str).unwrap_or_default();
            let is_selector = SELECTOR_TYPES.contains(&kind);

            let bucket = if is_selector && global.contains(tag.as_str()) {
                &mut globals
            } else if is_selector && local.contains(tag.as_str()) {
                &mut locals
            } else {
                &mut nodes
            };

            if !tag.is_empty() {
                map.insert("tag".to_string(), Value::String(tag_counts.unique(&tag)));
            }
            bucket.push(serde_json::to_string(&Value::Object(map))?);
        }

        let result = GenerationResult {
            nodes_count: nodes.len(),
            local_selectors_count: locals.len(),
            global_selectors_count: globals.len(),
            outbounds_json: nodes.into_iter().chain(locals).chain(globals).collect(),
        };
        debug!(
            nodes = result.nodes_count,
            local = result.local_selectors_count,
            global = result.global_selectors_count,
            "outbounds generated"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OutboundConfig, ProxySource};
    use serde_json::json;

    #[test]
    fn test_tag_counts() {
        let mut counts = TagCounts::new();
        assert_eq!(counts.unique("NL"), "NL");
        assert_eq!(counts.unique("NL"), "NL-2");
        assert_eq!(counts.unique("NL"), "NL-3");
        assert_eq!(counts.unique("DE"), "DE");
        assert_eq!(counts.get("NL"), 3);
        assert_eq!(counts.duplicates(), vec![("NL", 3)]);
    }

    #[tokio::test]
    async fn test_pregenerated_buckets_and_dedup() {
        let mut config = ParserConfig::default();
        config.outbounds.push(OutboundConfig::new("proxy-out", "selector"));
        let mut source = ProxySource::subscription("https://a.example/sub");
        source.outbounds.push(OutboundConfig::new("a-auto", "urltest"));
        config.proxies.push(source);

        let generator = PregeneratedOutbounds::new(vec![
            json!({"tag": "proxy-out", "type": "selector", "outbounds": ["NL", "NL-2"]}),
            json!({"tag": "NL", "type": "vless", "server": "a"}),
            json!({"tag": "a-auto", "type": "urltest"}),
            json!({"tag": "NL", "type": "vless", "server": "b"}),
            json!("junk"),
        ]);

        let mut counts = TagCounts::new();
        let result = generator.generate(&config, &mut counts).await.unwrap();

        assert_eq!((result.nodes_count, result.local_selectors_count, result.global_selectors_count), (2, 1, 1));
        let tags: Vec<String> = result
            .outbounds_json
            .iter()
            .map(|s| serde_json::from_str::<Value>(s).unwrap()["tag"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(tags, vec!["NL", "NL-2", "a-auto", "proxy-out"]);
    }

    #[test]
    fn test_from_json_shapes() {
        assert_eq!(PregeneratedOutbounds::from_json("[{}]").unwrap().outbounds.len(), 1);
        assert_eq!(PregeneratedOutbounds::from_json(r#"{"outbounds": [{}, {}]}"#).unwrap().outbounds.len(), 2);
        assert!(PregeneratedOutbounds::from_json(r#"{"log": {}}"#).unwrap_err().is_structural());
        assert!(PregeneratedOutbounds::from_json("3").is_err());
    }

    #[tokio::test]
    async fn test_mock_generator_errors_propagate() {
        let mut mock = MockOutboundGenerator::new();
        mock.expect_generate()
            .returning(|_, _| Err(WizardError::Generator("no nodes".into())));

        let err = mock.generate(&ParserConfig::default(), &mut TagCounts::new()).await.unwrap_err();
        assert!(matches!(err, WizardError::Generator(_)));
    }
}
