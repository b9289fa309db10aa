use std::time::Duration;

use crate::error::{EngineError, Result};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Engine configuration loaded from environment variables.
///
/// | Env Var                       | Default                                            |
/// |-------------------------------|----------------------------------------------------|
/// | `GEMINI_API_BASE`             | `https://generativelanguage.googleapis.com/v1beta` |
/// | `MOCKUP_IMAGE_MODEL`          | `gemini-3-pro-image-preview`                       |
/// | `MOCKUP_TEXT_MODEL`           | `gemini-2.5-flash`                                 |
/// | `MOCKUP_RETRY_ATTEMPTS`       | `3`                                                |
/// | `MOCKUP_RETRY_BASE_MS`        | `2000`                                             |
/// | `MOCKUP_STAGGER_MS`           | `2500`                                             |
/// | `MOCKUP_REQUEST_TIMEOUT_SECS` | `90` (clamped to 15..=300)                         |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub api_base: String,
    pub image_model: String,
    pub text_model: String,
    pub retry_attempts: u32,
    pub retry_base_delay: Duration,
    pub stagger: Duration,
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(2000),
            stagger: Duration::from_millis(2500),
            request_timeout: Duration::from_secs(90),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let api_base = get("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);
        let image_model = get("MOCKUP_IMAGE_MODEL").unwrap_or(defaults.image_model);
        let text_model = get("MOCKUP_TEXT_MODEL").unwrap_or(defaults.text_model);
        let retry_attempts = match get("MOCKUP_RETRY_ATTEMPTS") {
            Some(raw) => parse_number::<u32>("MOCKUP_RETRY_ATTEMPTS", &raw)?.max(1),
            None => defaults.retry_attempts,
        };
        let retry_base_delay = match get("MOCKUP_RETRY_BASE_MS") {
            Some(raw) => Duration::from_millis(parse_number("MOCKUP_RETRY_BASE_MS", &raw)?),
            None => defaults.retry_base_delay,
        };
        let stagger = match get("MOCKUP_STAGGER_MS") {
            Some(raw) => Duration::from_millis(parse_number("MOCKUP_STAGGER_MS", &raw)?),
            None => defaults.stagger,
        };
        let request_timeout = match get("MOCKUP_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                parse_number::<u64>("MOCKUP_REQUEST_TIMEOUT_SECS", &raw)?.clamp(15, 300),
            ),
            None => defaults.request_timeout,
        };

        Ok(Self {
            api_base,
            image_model,
            text_model,
            retry_attempts,
            retry_base_delay,
            stagger,
            request_timeout,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| {
        EngineError::Configuration(format!("{key} must be a non-negative integer, got '{raw}'"))
    })
}
