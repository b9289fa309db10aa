pub mod batch;
pub mod composer;
pub mod config;
pub mod credentials;
pub mod error;
pub mod generate;
pub mod provider;
pub mod retry;
pub mod schedule;
pub mod suggest;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use mockup_contracts::events::{EventKind, EventLog};
use mockup_contracts::providers::NamedProvider;
use mockup_contracts::{GenerationRequest, ImagePayload, MockupResult, SourceImage, Studio, Vibe};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub use batch::{plan_jobs, BatchOutcome, JobFailure};
pub use composer::{compose_analysis_prompt, compose_generation_prompt, SuggestionMode};
pub use config::EngineConfig;
pub use credentials::{CredentialBroker, CredentialChain};
pub use error::{EngineError, Result};
pub use provider::{
    default_provider_registry, DryrunProvider, GeminiProvider, MockupProvider, RenderParams,
    SharedProvider,
};
pub use retry::{RetryNotice, RetryObserver, RetryPolicy};
pub use schedule::DispatchSchedule;

/// Orchestration entry point: one provider plus the retry, stagger and
/// credential policy applied to every call made through it.
#[derive(Clone)]
pub struct MockupEngine {
    provider: SharedProvider,
    retry: RetryPolicy,
    schedule: DispatchSchedule,
    credentials: CredentialChain,
    events: Option<EventLog>,
}

impl MockupEngine {
    pub fn new(provider: SharedProvider) -> Self {
        Self::from_config(provider, &EngineConfig::default())
    }

    pub fn from_config(provider: SharedProvider, config: &EngineConfig) -> Self {
        Self {
            provider,
            retry: RetryPolicy::new(config.retry_attempts, config.retry_base_delay),
            schedule: DispatchSchedule::new(config.stagger),
            credentials: CredentialChain::new(),
            events: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_schedule(mut self, schedule: DispatchSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialChain) -> Self {
        self.credentials = credentials;
        self
    }

    /// Also records retries as `retry_scheduled` events unless the retry
    /// policy already carries its own observer.
    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    pub fn schedule(&self) -> DispatchSchedule {
        self.schedule
    }

    pub fn events(&self) -> Option<&EventLog> {
        self.events.as_ref()
    }

    /// `Ok(None)` for providers that need no key.
    pub fn credential(&self) -> Result<Option<String>> {
        if !self.provider.requires_credential() {
            return Ok(None);
        }
        self.credentials.require().map(Some)
    }

    pub async fn generate(
        &self,
        source: &SourceImage,
        request: &GenerationRequest,
    ) -> Result<Vec<ImagePayload>> {
        let credential = self.credential()?;
        generate::generate_images(
            self.provider.as_ref(),
            &self.retry_policy(),
            source,
            request,
            credential.as_deref(),
        )
        .await
    }

    pub async fn suggest_prompts(&self, source: &SourceImage, vibe: Vibe) -> Vec<String> {
        let credential = self.credential().ok().flatten();
        let suggestions = suggest::suggest_prompts(
            self.provider.as_ref(),
            &self.retry_policy(),
            source,
            vibe,
            credential.as_deref(),
        )
        .await;
        self.record(
            EventKind::SuggestionsReady,
            json!({ "vibe": vibe.label(), "suggestions": suggestions }),
        );
        suggestions
    }

    pub async fn regenerate_prompt(&self, source: &SourceImage, vibe: Vibe) -> String {
        let credential = self.credential().ok().flatten();
        suggest::regenerate_one(
            self.provider.as_ref(),
            &self.retry_policy(),
            source,
            vibe,
            credential.as_deref(),
        )
        .await
    }

    /// Runs every active prompt and appends the successes to the studio.
    pub async fn run_studio_batch(&self, studio: &mut Studio) -> Result<BatchOutcome> {
        let prompts = studio.prompts.active_texts();
        let outcome = self
            .run_batch(studio.source()?, &prompts, &studio.constraints, &studio.base)
            .await?;
        studio.results.append(outcome.results.iter().cloned());
        Ok(outcome)
    }

    /// Upscales one stored result. The in-progress marker is cleared whether
    /// or not the call succeeds.
    pub async fn upscale_in_studio(&self, studio: &mut Studio, id: Uuid) -> Result<MockupResult> {
        let source = studio.source()?.clone();
        let original = studio.results.begin_upscale(id)?;
        let outcome = self.upscale(&source, &original, &studio.base).await;
        studio.results.finish_upscale(id);
        let upscaled = outcome?;
        studio.results.push(upscaled.clone());
        Ok(upscaled)
    }

    /// Replaces the studio's prompts with fresh suggestions.
    pub async fn suggest_into_studio(&self, studio: &mut Studio) -> Result<Vec<String>> {
        let suggestions = self
            .suggest_prompts(studio.source()?, studio.base.vibe)
            .await;
        studio.prompts.replace_all(suggestions.iter().cloned());
        Ok(suggestions)
    }

    pub async fn regenerate_in_studio(&self, studio: &mut Studio, id: Uuid) -> Result<String> {
        let source = studio.source()?.clone();
        studio.prompts.begin_regenerate(id)?;
        let text = self.regenerate_prompt(&source, studio.base.vibe).await;
        studio.prompts.finish_regenerate(id, Some(text.clone()))?;
        self.record(
            EventKind::PromptRegenerated,
            json!({ "prompt_id": id.to_string(), "text": text }),
        );
        Ok(text)
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        match &self.events {
            Some(events) if !self.retry.has_observer() => {
                let events = events.clone();
                self.retry.clone().with_observer(Arc::new(move |notice: &RetryNotice<'_>| {
                    let payload = json!({
                        "label": notice.label,
                        "attempt": notice.attempt,
                        "max_attempts": notice.max_attempts,
                        "delay_ms": notice.delay.as_millis() as u64,
                        "error": notice.error.to_string(),
                    });
                    if let Err(err) = events.emit(EventKind::RetryScheduled, &payload) {
                        tracing::warn!(error = %err, "failed to record retry event");
                    }
                }))
            }
            _ => self.retry.clone(),
        }
    }

    /// Event log failures are logged, never raised.
    pub(crate) fn record(&self, kind: EventKind, payload: Value) {
        let Some(events) = &self.events else {
            return;
        };
        if let Err(err) = events.emit(kind, &payload) {
            tracing::warn!(event = kind.as_str(), error = %err, "failed to record event");
        }
    }
}

impl std::fmt::Debug for MockupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockupEngine")
            .field("provider", &self.provider.name())
            .field("retry", &self.retry)
            .field("schedule", &self.schedule)
            .field("credentials", &self.credentials)
            .field("events", &self.events.as_ref().map(EventLog::path))
            .finish()
    }
}

/// `mockup-03-1a2b3c4d`: job position plus a short hash of the prompt.
pub fn artifact_file_stem(index: usize, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update((index as u64).to_be_bytes());
    let digest = hasher.finalize();
    format!("mockup-{index:02}-{}", hex::encode(&digest[..4]))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockup_contracts::{ResolutionTier, StateError, StudioAction};

    use super::*;
    use crate::testing::{sample_source, ScriptedProvider};

    fn engine(provider: &Arc<ScriptedProvider>) -> MockupEngine {
        MockupEngine::new(Arc::clone(provider) as SharedProvider)
            .with_retry(RetryPolicy::new(2, Duration::from_millis(10)))
            .with_schedule(DispatchSchedule::immediate())
            .with_credentials(CredentialChain::fixed("test-key"))
    }

    fn loaded_studio() -> Studio {
        let mut studio = Studio::default();
        studio.load_source(sample_source());
        studio
    }

    #[tokio::test(start_paused = true)]
    async fn studio_batch_appends_successes() -> anyhow::Result<()> {
        let provider = Arc::new(ScriptedProvider::new());
        let engine = engine(&provider);
        let mut studio = loaded_studio();
        studio.prompts.replace_all(["loft", "cafe"]);

        let outcome = engine.run_studio_batch(&mut studio).await?;

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(studio.results.len(), 2);
        assert_eq!(studio.results.items()[1].prompt, "cafe");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn studio_without_source_rejects_remote_work() {
        let provider = Arc::new(ScriptedProvider::new());
        let mut studio = Studio::default();
        let result = engine(&provider).run_studio_batch(&mut studio).await;
        assert!(matches!(
            result,
            Err(EngineError::State(StateError::NoSourceImage))
        ));
        assert!(provider.render_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn studio_upscale_appends_sibling_and_clears_marker() -> anyhow::Result<()> {
        let provider = Arc::new(ScriptedProvider::new());
        let engine = engine(&provider);
        let mut studio = loaded_studio();
        studio.prompts.replace_all(["loft"]);
        engine.run_studio_batch(&mut studio).await?;
        let original = studio.results.items()[0].clone();

        let upscaled = engine.upscale_in_studio(&mut studio, original.id).await?;

        assert_eq!(studio.results.len(), 2);
        assert_eq!(studio.results.get(original.id), Some(&original));
        assert_eq!(upscaled.resolution, ResolutionTier::UpscaledHigh);
        assert!(!studio.results.is_upscaling(original.id));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn failed_studio_upscale_still_clears_marker() -> anyhow::Result<()> {
        let provider = Arc::new(ScriptedProvider::new());
        let mut studio = loaded_studio();
        studio.prompts.replace_all(["loft"]);
        engine(&provider).run_studio_batch(&mut studio).await?;
        let id = studio.results.items()[0].id;

        let failing = Arc::new(ScriptedProvider::new().fail_always("Scene:"));
        let result = engine(&failing).upscale_in_studio(&mut studio, id).await;

        assert!(matches!(result, Err(EngineError::Upscale { .. })));
        assert!(!studio.results.is_upscaling(id));
        assert_eq!(studio.results.len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn suggestions_replace_the_prompt_set() -> anyhow::Result<()> {
        let provider = Arc::new(ScriptedProvider::new().with_analysis(r#"["loft", "pier"]"#));
        let mut studio = loaded_studio();
        studio.apply(StudioAction::SetVibe(Vibe::LuxuryClassic))?;

        let suggestions = engine(&provider).suggest_into_studio(&mut studio).await?;

        assert_eq!(suggestions, vec!["loft", "pier"]);
        assert_eq!(studio.prompts.active_texts(), vec!["loft", "pier"]);
        assert!(provider.analysis_prompts()[0].contains("marble"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn regenerate_rewrites_one_entry_and_clears_its_flag() -> anyhow::Result<()> {
        let provider = Arc::new(ScriptedProvider::new().with_analysis(r#"["a quiet pier"]"#));
        let mut studio = loaded_studio();
        studio.prompts.replace_all(["loft", "cafe"]);
        let id = studio.prompts.entries()[1].id;

        let text = engine(&provider).regenerate_in_studio(&mut studio, id).await?;

        assert_eq!(text, "a quiet pier");
        let entry = studio.prompts.get(id).ok_or_else(|| anyhow::anyhow!("entry missing"))?;
        assert_eq!(entry.text, "a quiet pier");
        assert!(!entry.regenerating);
        assert_eq!(studio.prompts.entries()[0].text, "loft");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_written_for_batches_and_retries() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let provider = Arc::new(ScriptedProvider::new().transient_then_ok("Scene: loft", 1));
        let engine = engine(&provider).with_events(EventLog::new(&events_path, "session-1"));
        let mut studio = loaded_studio();
        studio.prompts.replace_all(["loft"]);

        engine.run_studio_batch(&mut studio).await?;

        let kinds: Vec<String> = std::fs::read_to_string(&events_path)?
            .lines()
            .map(serde_json::from_str::<Value>)
            .collect::<std::result::Result<Vec<_>, _>>()?
            .iter()
            .filter_map(|event| event["type"].as_str().map(str::to_string))
            .collect();
        assert_eq!(
            kinds,
            vec![
                "batch_started",
                "job_dispatched",
                "retry_scheduled",
                "job_succeeded",
                "batch_finished"
            ]
        );
        Ok(())
    }

    #[test]
    fn artifact_stems_are_stable_and_distinct() {
        assert_eq!(artifact_file_stem(1, "loft"), artifact_file_stem(1, "loft"));
        assert_ne!(artifact_file_stem(1, "loft"), artifact_file_stem(2, "loft"));
        assert!(artifact_file_stem(3, "loft").starts_with("mockup-03-"));
        assert_eq!(artifact_file_stem(3, "loft").len(), "mockup-03-".len() + 8);
    }
}
