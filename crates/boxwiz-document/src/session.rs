//! A wizard session coordinating background work against one model.
//!
//! Builds and reconciliation each run through their own
//! [`TaskSupervisor`]: previews defer a single rerun while one is in
//! flight, saves and reconciliation replace the running pass. Results of
//! superseded runs are dropped at publish time rather than cancelled.

use boxwiz_core::{Admission, Debouncer, RunToken, TaskSupervisor, TriggerPolicy};
use boxwiz_parser::{reconcile, validate_parser_config_text, GenerationResult, OutboundGenerator, TagCounts};
use boxwiz_template::TemplateData;
use boxwiz_types::constants::MAX_NODES_FOR_FULL_PREVIEW;
use boxwiz_types::{BuildMode, LinkClassifier, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::builder::DocumentBuilder;
use crate::model::WizardModel;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Shared state for one wizard run.
pub struct WizardSession {
    template: Arc<TemplateData>,
    model: Arc<RwLock<WizardModel>>,
    builds: TaskSupervisor,
    reconciles: TaskSupervisor,
    debouncer: Debouncer,
    preview_limit: usize,
}

impl WizardSession {
    /// Start a session with a model seeded from `template`.
    pub fn new(template: Arc<TemplateData>) -> Self {
        let model = WizardModel::from_template(&template);
        Self::with_model(template, model)
    }

    /// Start a session around an existing model.
    pub fn with_model(template: Arc<TemplateData>, model: WizardModel) -> Self {
        Self {
            template,
            model: Arc::new(RwLock::new(model)),
            builds: TaskSupervisor::new("build"),
            reconciles: TaskSupervisor::new("reconcile"),
            debouncer: Debouncer::new(DEFAULT_DEBOUNCE),
            preview_limit: MAX_NODES_FOR_FULL_PREVIEW,
        }
    }

    /// Set the quiet period for [`schedule_reconcile`](Self::schedule_reconcile).
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debouncer = Debouncer::new(delay);
        self
    }

    /// Set the preview node limit.
    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    /// The session's template.
    pub fn template(&self) -> &TemplateData {
        &self.template
    }

    /// Shared handle to the model.
    pub fn model(&self) -> Arc<RwLock<WizardModel>> {
        Arc::clone(&self.model)
    }

    /// A copy of the current model.
    pub fn snapshot(&self) -> WizardModel {
        self.model.read().clone()
    }

    /// Mutate the model under the write lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut WizardModel) -> R) -> R {
        f(&mut self.model.write())
    }

    /// Whether a build is in flight.
    pub fn is_building(&self) -> bool {
        self.builds.is_busy()
    }

    /// Generate outbounds and build a preview.
    ///
    /// Returns `None` when the request was deferred behind a running build;
    /// that build reruns once before it returns.
    pub async fn preview(&self, generator: &dyn OutboundGenerator) -> Result<Option<String>> {
        self.run_build(BuildMode::Preview, generator).await
    }

    /// Generate outbounds and build the document for saving.
    ///
    /// The parser configuration must validate. Returns `None` when a newer
    /// save replaced this one. A preview deferred behind this save runs
    /// before it returns, but never changes the save's own result.
    pub async fn save(&self, generator: &dyn OutboundGenerator) -> Result<Option<String>> {
        self.run_build(BuildMode::Save, generator).await
    }

    async fn run_build(&self, mode: BuildMode, generator: &dyn OutboundGenerator) -> Result<Option<String>> {
        let policy = if mode.is_preview() {
            TriggerPolicy::Defer
        } else {
            TriggerPolicy::Replace
        };
        let mut token = match self.builds.begin(policy) {
            Admission::Started(token) => token,
            other => {
                debug!(?mode, admission = ?other, "build not started");
                return Ok(None);
            }
        };

        let result = self.build_once(token, mode, generator).await;
        let mut latest = None;
        // Only previews defer, so every rerun is a preview.
        while self.builds.finish(token) {
            match self.builds.begin(TriggerPolicy::Defer) {
                Admission::Started(next) => {
                    debug!("running deferred preview");
                    token = next;
                    latest = Some(self.build_once(token, BuildMode::Preview, generator).await);
                }
                _ => break,
            }
        }

        match (mode, latest) {
            (BuildMode::Preview, Some(rerun)) => rerun,
            (_, Some(Err(e))) => {
                warn!(error = %e, "deferred preview failed");
                result
            }
            _ => result,
        }
    }

    async fn build_once(
        &self,
        token: RunToken,
        mode: BuildMode,
        generator: &dyn OutboundGenerator,
    ) -> Result<Option<String>> {
        let mut snapshot = self.snapshot();
        if !mode.is_preview() {
            validate_parser_config_text(&snapshot.parser_config_text)?;
        }

        let generated: Option<GenerationResult> = match &snapshot.parser_config {
            Some(config) => {
                let mut counts = TagCounts::new();
                let result = generator.generate(config, &mut counts).await?;
                for (tag, n) in counts.duplicates() {
                    debug!(tag, occurrences = n, "tag deduplicated");
                }
                Some(result)
            }
            None => {
                warn!("parser config does not parse, keeping previous outbounds");
                None
            }
        };
        if let Some(result) = &generated {
            snapshot.generated = result.clone();
        }

        let document = DocumentBuilder::new(&self.template)
            .mode(mode)
            .preview_limit(self.preview_limit)
            .build(&snapshot)?;

        let published = self.builds.publish(token, generated, |generated| {
            if let Some(generated) = generated {
                self.model.write().generated = generated;
            }
        });
        Ok(published.then_some(document))
    }

    /// Rebuild the proxy sources from `input` and apply them to the model.
    ///
    /// Returns the new parser-config text, or `None` when a newer pass
    /// replaced this one.
    pub async fn reconcile(&self, input: &str, classifier: &dyn LinkClassifier) -> Result<Option<String>> {
        let Some(token) = self.reconciles.begin(TriggerPolicy::Replace).token() else {
            return Ok(None);
        };
        let previous = self.model.read().parser_config_text.clone();

        let result = reconcile(input, &previous, classifier);
        let outcome = match result {
            Ok(text) => {
                let default_final = self.template.default_final.clone();
                let published = self.reconciles.publish(token, text.clone(), |text| {
                    let mut model = self.model.write();
                    model.set_parser_config_text(&text);
                    model.source_text = input.to_string();
                    model.refresh_outbound_choices(&default_final);
                });
                Ok(published.then_some(text))
            }
            Err(e) => Err(e),
        };
        self.reconciles.finish(token);
        outcome
    }

    /// Debounced [`reconcile`](Self::reconcile) for rapid input edits.
    ///
    /// Only the last call within the quiet period runs. The handle resolves
    /// to whether this call was the one that ran.
    pub fn schedule_reconcile(
        self: &Arc<Self>,
        input: String,
        classifier: Arc<dyn LinkClassifier>,
    ) -> JoinHandle<bool> {
        let session = Arc::clone(self);
        self.debouncer.trigger(move || async move {
            if let Err(e) = session.reconcile(&input, classifier.as_ref()).await {
                warn!(error = %e, "background reconcile failed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use boxwiz_parser::{ParserConfig, PregeneratedOutbounds, SchemeClassifier};
    use boxwiz_types::{Platform, WizardError};
    use mockall::mock;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const TEMPLATE: &str = r#"{
      "parser_config": {"version": 3, "proxies": [{"source": "https://a.example/sub"}],
                        "outbounds": [{"tag": "proxy-out", "type": "selector"}]},
      "config": {
        "outbounds": [{"type": "direct", "tag": "direct-out"}],
        "route": {"rules": [], "final": "proxy-out"}
      }
    }"#;

    mock! {
        Generator {}
        #[async_trait]
        impl OutboundGenerator for Generator {
            async fn generate(&self, config: &ParserConfig, tag_counts: &mut TagCounts) -> Result<GenerationResult>;
        }
    }

    /// Blocks its first call until released.
    struct GatedGenerator {
        calls: AtomicUsize,
        gate: Notify,
    }

    impl GatedGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl OutboundGenerator for GatedGenerator {
        async fn generate(&self, _config: &ParserConfig, _tag_counts: &mut TagCounts) -> Result<GenerationResult> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                self.gate.notified().await;
            }
            Ok(GenerationResult {
                outbounds_json: vec![format!("{{\"tag\":\"run{}\"}}", call)],
                nodes_count: 1,
                ..Default::default()
            })
        }
    }

    fn session() -> Arc<WizardSession> {
        let template = TemplateData::from_bytes(TEMPLATE.as_bytes(), &Platform::new("linux")).unwrap();
        Arc::new(WizardSession::new(Arc::new(template)).with_debounce(Duration::from_millis(30)))
    }

    async fn wait_until_building(session: &WizardSession) {
        while !session.is_building() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_preview_publishes_generated_outbounds() {
        let session = session();
        let generator = PregeneratedOutbounds::new(vec![json!({"tag": "NL", "type": "vless"})]);

        let doc = session.preview(&generator).await.unwrap().unwrap();
        assert!(doc.contains("{\"tag\":\"NL\",\"type\":\"vless\"},\n    /** @ParserEND */"));
        assert_eq!(session.snapshot().generated.nodes_count, 1);
        assert!(!session.is_building());
    }

    #[tokio::test]
    async fn test_generator_error_releases_slot() {
        let session = session();
        let mut generator = MockGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Err(WizardError::Generator("bad source".into())));

        let err = session.preview(&generator).await.unwrap_err();
        assert!(matches!(err, WizardError::Generator(_)));
        assert!(!session.is_building());
    }

    #[tokio::test]
    async fn test_preview_defers_one_rerun() {
        let session = session();
        let generator = Arc::new(GatedGenerator::new());

        let first = {
            let (session, generator) = (Arc::clone(&session), Arc::clone(&generator));
            tokio::spawn(async move { session.preview(generator.as_ref()).await })
        };
        wait_until_building(&session).await;

        assert_eq!(session.preview(generator.as_ref()).await.unwrap(), None);
        assert_eq!(session.preview(generator.as_ref()).await.unwrap(), None);
        generator.gate.notify_one();

        let doc = first.await.unwrap().unwrap().unwrap();
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
        assert!(doc.contains("run1"));
        assert!(session.snapshot().generated.outbounds_json[0].contains("run1"));
    }

    #[tokio::test]
    async fn test_preview_deferred_behind_save_keeps_save_result() {
        let session = session();
        let generator = Arc::new(GatedGenerator::new());

        let save = {
            let (session, generator) = (Arc::clone(&session), Arc::clone(&generator));
            tokio::spawn(async move { session.save(generator.as_ref()).await })
        };
        wait_until_building(&session).await;

        session.update(|m| m.set_parser_config_text("{\"ParserConfig\": {}}"));
        assert_eq!(session.preview(generator.as_ref()).await.unwrap(), None);
        generator.gate.notify_one();

        let doc = save.await.unwrap().unwrap().unwrap();
        assert!(doc.contains("run0"));
        assert!(!session.is_building());
    }

    #[tokio::test]
    async fn test_replaced_save_is_discarded() {
        let session = session();
        let generator = Arc::new(GatedGenerator::new());

        let stale = {
            let (session, generator) = (Arc::clone(&session), Arc::clone(&generator));
            tokio::spawn(async move { session.save(generator.as_ref()).await })
        };
        wait_until_building(&session).await;

        let fresh = session.save(generator.as_ref()).await.unwrap().unwrap();
        assert!(fresh.contains("run1"));
        generator.gate.notify_one();

        assert_eq!(stale.await.unwrap().unwrap(), None);
        assert!(session.snapshot().generated.outbounds_json[0].contains("run1"));
    }

    #[tokio::test]
    async fn test_save_requires_valid_parser_config() {
        let session = session();
        session.update(|m| m.set_parser_config_text("{\"ParserConfig\": {}}"));
        let generator = PregeneratedOutbounds::default();

        assert!(session.save(&generator).await.unwrap_err().is_structural());
        assert!(session.preview(&generator).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reconcile_updates_model() {
        let session = session();
        let input = "https://b.example/sub\nvless://user@host:443#node";

        let text = session.reconcile(input, &SchemeClassifier).await.unwrap().unwrap();
        assert!(text.contains("https://b.example/sub"));

        let model = session.snapshot();
        assert_eq!(model.source_text, input);
        let config = model.parser_config.unwrap();
        assert_eq!(config.proxies.len(), 2);
        assert_eq!(config.proxies[1].connections, vec!["vless://user@host:443#node"]);
    }

    #[tokio::test]
    async fn test_schedule_reconcile_keeps_last_edit() {
        let session = session();
        let classifier: Arc<dyn LinkClassifier> = Arc::new(SchemeClassifier);

        let handles: Vec<_> = ["https://one.example/sub", "https://two.example/sub", "https://three.example/sub"]
            .iter()
            .map(|input| session.schedule_reconcile(input.to_string(), Arc::clone(&classifier)))
            .collect();

        let mut ran = Vec::new();
        for handle in handles {
            ran.push(handle.await.unwrap());
        }
        assert_eq!(ran, vec![false, false, true]);
        assert_eq!(session.snapshot().source_text, "https://three.example/sub");
    }
}
