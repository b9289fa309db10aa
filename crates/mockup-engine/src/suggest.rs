//! Scene suggestions from the vision model.
//!
//! Neither entry point fails outward: any error, including a missing
//! credential, is logged and replaced by a fixed fallback.

use mockup_contracts::{SourceImage, Vibe};

use crate::composer::{compose_analysis_prompt, SuggestionMode};
use crate::error::{EngineError, Result};
use crate::provider::MockupProvider;
use crate::retry::RetryPolicy;

pub const MAX_SUGGESTIONS: usize = 4;

pub const FALLBACK_SUGGESTIONS: [&str; MAX_SUGGESTIONS] = [
    "A bright modern living room with a neutral sofa and soft daylight",
    "A minimalist white gallery wall with polished concrete floors",
    "A cozy bedroom with warm bedside lamps and linen bedding",
    "A sunlit home office with a wooden desk and potted plants",
];

pub const FALLBACK_REGENERATION: &str =
    "A calm, airy hallway with warm wooden floors and natural light";

pub async fn suggest_prompts(
    provider: &dyn MockupProvider,
    retry: &RetryPolicy,
    source: &SourceImage,
    vibe: Vibe,
    credential: Option<&str>,
) -> Vec<String> {
    match request_suggestions(provider, retry, source, vibe, credential, SuggestionMode::Bulk)
        .await
    {
        Ok(suggestions) => suggestions,
        Err(err) => {
            tracing::warn!(error = %err, %vibe, "suggestions unavailable, using fallback set");
            FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
        }
    }
}

pub async fn regenerate_one(
    provider: &dyn MockupProvider,
    retry: &RetryPolicy,
    source: &SourceImage,
    vibe: Vibe,
    credential: Option<&str>,
) -> String {
    let outcome =
        request_suggestions(provider, retry, source, vibe, credential, SuggestionMode::Regenerate)
            .await;
    match outcome {
        Ok(mut suggestions) if !suggestions.is_empty() => suggestions.swap_remove(0),
        Ok(_) => FALLBACK_REGENERATION.to_string(),
        Err(err) => {
            tracing::warn!(error = %err, %vibe, "regeneration unavailable, using fallback");
            FALLBACK_REGENERATION.to_string()
        }
    }
}

async fn request_suggestions(
    provider: &dyn MockupProvider,
    retry: &RetryPolicy,
    source: &SourceImage,
    vibe: Vibe,
    credential: Option<&str>,
    mode: SuggestionMode,
) -> Result<Vec<String>> {
    if provider.requires_credential() && credential.is_none() {
        return Err(EngineError::Configuration("no API key available".to_string()));
    }
    let count = match mode {
        SuggestionMode::Bulk => MAX_SUGGESTIONS,
        SuggestionMode::Regenerate => 1,
    };
    let prompt = compose_analysis_prompt(vibe, count, mode);
    let raw = retry
        .run("analyze", || provider.analyze(source, &prompt, credential))
        .await?;
    let mut suggestions = parse_suggestions(&raw)?;
    suggestions.truncate(count);
    Ok(suggestions)
}

/// Strict JSON array of strings, optionally inside a markdown fence.
/// Blank entries are dropped and at most [`MAX_SUGGESTIONS`] are kept.
pub fn parse_suggestions(raw: &str) -> Result<Vec<String>> {
    let body = strip_code_fence(raw);
    let values: Vec<String> = serde_json::from_str(body).map_err(|err| {
        EngineError::MalformedResponse(format!("expected a JSON array of strings: {err}"))
    })?;
    let suggestions: Vec<String> = values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .take(MAX_SUGGESTIONS)
        .collect();
    if suggestions.is_empty() {
        return Err(EngineError::MalformedResponse(
            "suggestion array was empty".to_string(),
        ));
    }
    Ok(suggestions)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
