use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use mockup_contracts::providers::NamedProvider;
use mockup_contracts::{ImagePayload, SourceImage};
use tokio::time::Instant;

use crate::error::{EngineError, Result};
use crate::provider::{MockupProvider, RenderParams};

pub fn sample_source() -> SourceImage {
    SourceImage::new(ImagePayload::png(vec![0x89, b'P', b'N', b'G']), 600, 800)
}

#[derive(Debug, Clone)]
pub struct RenderCall {
    pub prompt: String,
    pub params: RenderParams,
    pub at: Instant,
}

#[derive(Debug, Clone)]
enum Script {
    AlwaysFail,
    TransientTimes(u32),
    Empty,
}

/// Outcome of one render call, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Image,
    Transient,
    Empty,
}

/// In-memory provider whose behaviour is keyed on prompt substrings.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    scripts: Mutex<Vec<(String, Script)>>,
    outcomes: Mutex<VecDeque<CallOutcome>>,
    latency: Duration,
    requires_credential: bool,
    analysis: Option<String>,
    renders: Mutex<Vec<RenderCall>>,
    analyses: Mutex<Vec<String>>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            analysis: Some(r#"["a", "b", "c", "d"]"#.to_string()),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn requiring_credential(mut self) -> Self {
        self.requires_credential = true;
        self
    }

    pub fn with_analysis(mut self, raw: &str) -> Self {
        self.analysis = Some(raw.to_string());
        self
    }

    pub fn failing_analysis(mut self) -> Self {
        self.analysis = None;
        self
    }

    /// Prompts containing `needle` fail with a transient error on every attempt.
    pub fn fail_always(self, needle: &str) -> Self {
        self.script(needle, Script::AlwaysFail)
    }

    pub fn transient_then_ok(self, needle: &str, failures: u32) -> Self {
        self.script(needle, Script::TransientTimes(failures))
    }

    pub fn empty_for(self, needle: &str) -> Self {
        self.script(needle, Script::Empty)
    }

    /// The next render calls, whatever their prompt, resolve to `outcomes`
    /// in order; later calls fall back to the prompt scripts.
    pub fn with_call_outcomes(self, outcomes: impl IntoIterator<Item = CallOutcome>) -> Self {
        if let Ok(mut queue) = self.outcomes.lock() {
            queue.extend(outcomes);
        }
        self
    }

    fn script(self, needle: &str, script: Script) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push((needle.to_string(), script));
        }
        self
    }

    pub fn render_calls(&self) -> Vec<RenderCall> {
        self.renders.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    pub fn analysis_prompts(&self) -> Vec<String> {
        self.analyses.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    fn matching_script(&self, prompt: &str) -> Option<(String, Script)> {
        let scripts = self.scripts.lock().ok()?;
        scripts
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .cloned()
    }

    fn next_outcome(&self) -> Option<CallOutcome> {
        self.outcomes.lock().ok()?.pop_front()
    }

    fn bump_attempts(&self, needle: &str) -> u32 {
        let Ok(mut attempts) = self.attempts.lock() else {
            return 0;
        };
        let count = attempts.entry(needle.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

impl NamedProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }
}

#[async_trait]
impl MockupProvider for ScriptedProvider {
    fn requires_credential(&self) -> bool {
        self.requires_credential
    }

    async fn render(
        &self,
        _source: &SourceImage,
        prompt: &str,
        params: &RenderParams,
    ) -> Result<Option<ImagePayload>> {
        if let Ok(mut renders) = self.renders.lock() {
            renders.push(RenderCall {
                prompt: prompt.to_string(),
                params: params.clone(),
                at: Instant::now(),
            });
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.next_outcome() {
            Some(CallOutcome::Image) => {
                return Ok(Some(ImagePayload::png(prompt.as_bytes().to_vec())))
            }
            Some(CallOutcome::Transient) => {
                return Err(EngineError::remote(Some(503), "model overloaded"))
            }
            Some(CallOutcome::Empty) => return Ok(None),
            None => {}
        }
        match self.matching_script(prompt) {
            Some((_, Script::AlwaysFail)) => {
                Err(EngineError::remote(Some(503), "model overloaded"))
            }
            Some((needle, Script::TransientTimes(failures))) => {
                if self.bump_attempts(&needle) <= failures {
                    Err(EngineError::remote(Some(429), "rate limit"))
                } else {
                    Ok(Some(ImagePayload::png(prompt.as_bytes().to_vec())))
                }
            }
            Some((_, Script::Empty)) => Ok(None),
            None => Ok(Some(ImagePayload::png(prompt.as_bytes().to_vec()))),
        }
    }

    async fn analyze(
        &self,
        _source: &SourceImage,
        prompt: &str,
        _credential: Option<&str>,
    ) -> Result<String> {
        if let Ok(mut analyses) = self.analyses.lock() {
            analyses.push(prompt.to_string());
        }
        self.analysis
            .clone()
            .ok_or_else(|| EngineError::remote(Some(503), "service unavailable"))
    }
}
