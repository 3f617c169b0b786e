//! Rebuilding the proxy-source list from freeform user input.
//!
//! Each edit of the source text re-derives the whole `proxies` list. Side
//! data the user attached to a source (local outbounds, tag decorations)
//! is carried over by matching subscription URLs exactly and direct-link
//! groups as multisets.

use boxwiz_types::{bail, LinkClassifier, LinkKind, Result};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

use crate::model::{OutboundConfig, ParserConfig, ProxySource};
use crate::normalize::{parse, serialize};

/// Lines of input sorted by kind, unknown lines dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedInput {
    /// Subscription URLs in input order
    pub subscriptions: Vec<String>,
    /// Direct links in input order
    pub connections: Vec<String>,
}

impl ClassifiedInput {
    /// Classify every non-blank trimmed line.
    pub fn from_text(input: &str, classifier: &dyn LinkClassifier) -> Self {
        let mut classified = Self::default();
        for line in input.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match classifier.classify(line) {
                LinkKind::Subscription => classified.subscriptions.push(line.to_string()),
                LinkKind::Direct => classified.connections.push(line.to_string()),
                LinkKind::Unknown => debug!(line, "dropping unrecognized input line"),
            }
        }
        classified
    }
}

/// Tag prefix assigned to the `index`-th subscription (1-based).
pub fn tag_prefix_for(index: usize) -> String {
    format!("{}:", index)
}

#[derive(Default)]
struct SourceMemory {
    outbounds: Vec<OutboundConfig>,
    tag_prefix: Option<String>,
    tag_postfix: Option<String>,
}

/// Rebuild `previous.proxies` from `input`, keeping everything else.
pub fn reconcile_config(input: &str, previous: &ParserConfig, classifier: &dyn LinkClassifier) -> ParserConfig {
    let classified = ClassifiedInput::from_text(input, classifier);

    let mut by_source: HashMap<&str, SourceMemory> = HashMap::new();
    let mut direct_candidates: Vec<&ProxySource> = Vec::new();
    for proxy in &previous.proxies {
        if !proxy.source.is_empty() {
            by_source.insert(
                proxy.source.as_str(),
                SourceMemory {
                    outbounds: proxy.outbounds.clone(),
                    tag_prefix: Some(proxy.tag_prefix.clone()).filter(|s| !s.is_empty()),
                    tag_postfix: Some(proxy.tag_postfix.clone()).filter(|s| !s.is_empty()),
                },
            );
        } else if !proxy.connections.is_empty() {
            direct_candidates.push(proxy);
        }
    }

    let auto_prefix = classified.subscriptions.len() > 1;
    let mut proxies: Vec<ProxySource> = Vec::new();

    for (idx, url) in classified.subscriptions.iter().enumerate() {
        let mut proxy = ProxySource::subscription(url.as_str());
        if let Some(memory) = by_source.get(url.as_str()) {
            proxy.outbounds = memory.outbounds.clone();
            proxy.tag_prefix = memory.tag_prefix.clone().unwrap_or_default();
            proxy.tag_postfix = memory.tag_postfix.clone().unwrap_or_default();
        }
        if proxy.tag_prefix.is_empty() && auto_prefix {
            proxy.tag_prefix = tag_prefix_for(idx + 1);
        }
        proxies.push(proxy);
    }

    if !classified.connections.is_empty() {
        let matched = direct_candidates
            .iter()
            .find(|candidate| same_links(&candidate.connections, &classified.connections));
        let proxy = match matched {
            Some(existing) => {
                debug!(links = classified.connections.len(), "direct links matched previous source");
                ProxySource {
                    connections: classified.connections.clone(),
                    ..(*existing).clone()
                }
            }
            None => ProxySource::direct(classified.connections.clone()),
        };
        proxies.push(proxy);
    }

    if proxies.is_empty() {
        proxies.push(ProxySource::default());
    }

    ParserConfig {
        proxies,
        ..previous.clone()
    }
}

/// Reconcile against serialized parser-config text and serialize the result.
///
/// The previous text must parse; the returned text is normalized without a
/// timestamp refresh.
pub fn reconcile(input: &str, previous_text: &str, classifier: &dyn LinkClassifier) -> Result<String> {
    let start = Instant::now();
    let previous_text = previous_text.trim();
    if previous_text.is_empty() {
        bail!(Validation, "ParserConfig JSON is empty");
    }
    let previous = parse(previous_text)?;
    let updated = reconcile_config(input, &previous, classifier);
    let text = serialize(&updated)?;
    debug!(
        sources = updated.proxies.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "reconciled proxy sources"
    );
    Ok(text)
}

// Order-independent comparison of trimmed link lists.
fn same_links(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for link in a {
        *counts.entry(link.trim()).or_default() += 1;
    }
    for link in b {
        *counts.entry(link.trim()).or_default() -= 1;
    }
    counts.values().all(|n| *n == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::SchemeClassifier;
    use std::collections::BTreeMap;

    fn previous() -> ParserConfig {
        let mut sub = ProxySource::subscription("https://a.example/sub");
        sub.outbounds = vec![OutboundConfig::new("a-auto", "urltest")];
        sub.tag_prefix = "A|".into();
        sub.tag_postfix = "|x".into();

        let mut direct = ProxySource::direct(vec!["vless://one@h:1".into(), "trojan://two@h:2".into()]);
        direct.tag_mask = "{name}".into();
        direct.skip = vec![BTreeMap::from([("tag".to_string(), "/RU/".to_string())])];
        direct.outbounds = vec![OutboundConfig::new("mine", "selector")];

        ParserConfig {
            version: 3,
            proxies: vec![sub, direct],
            outbounds: vec![OutboundConfig::new("proxy-out", "selector")],
            ..Default::default()
        }
    }

    #[test]
    fn test_subscription_metadata_carried_forward() {
        let input = "https://b.example/sub\n https://a.example/sub \nnot a link\n";
        let out = reconcile_config(input, &previous(), &SchemeClassifier);

        assert_eq!(out.proxies.len(), 2);
        assert_eq!(out.proxies[0].source, "https://b.example/sub");
        assert_eq!(out.proxies[0].tag_prefix, "1:");
        assert!(out.proxies[0].outbounds.is_empty());

        assert_eq!(out.proxies[1].tag_prefix, "A|");
        assert_eq!(out.proxies[1].tag_postfix, "|x");
        assert_eq!(out.proxies[1].outbounds[0].tag, "a-auto");
        assert_eq!(out.outbounds, previous().outbounds);
    }

    #[test]
    fn test_single_subscription_gets_no_auto_prefix() {
        let out = reconcile_config("https://new.example/sub", &previous(), &SchemeClassifier);
        assert_eq!(out.proxies.len(), 1);
        assert!(out.proxies[0].tag_prefix.is_empty());
    }

    #[test]
    fn test_direct_links_match_as_multiset() {
        let input = "trojan://two@h:2\nvless://one@h:1";
        let out = reconcile_config(input, &previous(), &SchemeClassifier);

        assert_eq!(out.proxies.len(), 1);
        let direct = &out.proxies[0];
        assert_eq!(direct.connections, vec!["trojan://two@h:2", "vless://one@h:1"]);
        assert_eq!(direct.tag_mask, "{name}");
        assert_eq!(direct.skip.len(), 1);
        assert_eq!(direct.outbounds[0].tag, "mine");
    }

    #[test]
    fn test_changed_links_start_fresh() {
        let out = reconcile_config("vless://one@h:1\nss://three@h:3", &previous(), &SchemeClassifier);
        assert_eq!(out.proxies.len(), 1);
        assert!(out.proxies[0].outbounds.is_empty());
        assert!(out.proxies[0].tag_mask.is_empty());

        assert!(!same_links(&["a".into(), "a".into()], &["a".into(), "b".into()]));
        assert!(same_links(&[" a".into(), "b".into()], &["b".into(), "a ".into()]));
    }

    #[test]
    fn test_blank_input_yields_placeholder() {
        let out = reconcile_config("  \n\n", &ParserConfig::default(), &SchemeClassifier);
        assert_eq!(out.proxies, vec![ProxySource::default()]);

        let text = reconcile("", "{\"ParserConfig\": {\"proxies\": []}}", &SchemeClassifier).unwrap();
        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed.proxies.len(), 1);
        assert!(reparsed.proxies[0].is_placeholder());
    }

    #[test]
    fn test_reconcile_text_errors() {
        assert!(reconcile("https://a.example/sub", "   ", &SchemeClassifier).is_err());
        assert!(reconcile("https://a.example/sub", "{broken", &SchemeClassifier).unwrap_err().is_structural());
    }

    proptest::proptest! {
        #[test]
        fn test_reconcile_round_trip(hosts in proptest::collection::btree_set("[a-z]{1,8}", 1..5),
                                     prefixes in proptest::collection::vec("[A-Z]{0,3}", 5)) {
            let input: String = hosts
                .iter()
                .map(|h| format!("https://{}.example/sub\n", h))
                .collect();

            let mut seeded = ParserConfig::default();
            for (host, prefix) in hosts.iter().zip(prefixes.iter()) {
                let mut source = ProxySource::subscription(format!("https://{}.example/sub", host));
                source.tag_prefix = prefix.clone();
                source.outbounds = vec![OutboundConfig::new(format!("{}-sel", host), "selector")];
                seeded.proxies.push(source);
            }

            let first = reconcile_config(&input, &seeded, &SchemeClassifier);
            let second = reconcile_config(&input, &first, &SchemeClassifier);

            proptest::prop_assert_eq!(first.proxies.len(), second.proxies.len());
            for (a, b) in first.proxies.iter().zip(second.proxies.iter()) {
                proptest::prop_assert_eq!(&a.outbounds, &b.outbounds);
                proptest::prop_assert_eq!(&a.tag_prefix, &b.tag_prefix);
                proptest::prop_assert_eq!(&a.tag_postfix, &b.tag_postfix);
            }
        }
    }
}
