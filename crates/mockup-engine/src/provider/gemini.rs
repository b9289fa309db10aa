use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use mockup_contracts::providers::NamedProvider;
use mockup_contracts::{ImagePayload, SourceImage};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};

use super::{MockupProvider, RenderParams};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

const MAX_ERROR_BODY_CHARS: usize = 400;
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Generative Language `generateContent` transport.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_base: String,
    image_model: String,
    text_model: String,
    timeout: Duration,
    http: HttpClient,
}

impl GeminiProvider {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            image_model: config.image_model.clone(),
            text_model: config.text_model.clone(),
            timeout: config.request_timeout,
            http: HttpClient::new(),
        }
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    async fn post(&self, model: &str, credential: Option<&str>, payload: &Value) -> Result<Value> {
        let key = credential
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| EngineError::Configuration("Gemini API key not set".to_string()))?;
        let endpoint = self.endpoint_for_model(model);
        tracing::debug!(%endpoint, "posting generateContent");

        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, key)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.map_transport_error(err))?;
        if !status.is_success() {
            return Err(EngineError::remote(
                Some(status.as_u16()),
                error_message_from_body(&body),
            ));
        }
        serde_json::from_str(&body)
            .map_err(|err| EngineError::MalformedResponse(format!("Gemini response is not JSON: {err}")))
    }

    /// The request URL is dropped so error text never echoes request details.
    fn map_transport_error(&self, err: reqwest::Error) -> EngineError {
        let err = err.without_url();
        if err.is_timeout() {
            EngineError::Timeout {
                after: self.timeout,
            }
        } else if err.is_connect() {
            EngineError::remote(None, format!("service unavailable: {err}"))
        } else {
            EngineError::remote(None, err.to_string())
        }
    }
}

impl NamedProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }
}

#[async_trait]
impl MockupProvider for GeminiProvider {
    async fn render(
        &self,
        source: &SourceImage,
        prompt: &str,
        params: &RenderParams,
    ) -> Result<Option<ImagePayload>> {
        let payload = build_render_payload(source, prompt, params);
        let response = self
            .post(&self.image_model, params.credential.as_deref(), &payload)
            .await?;
        extract_image(&response)
    }

    async fn analyze(
        &self,
        source: &SourceImage,
        prompt: &str,
        credential: Option<&str>,
    ) -> Result<String> {
        let payload = build_analysis_payload(source, prompt);
        let response = self.post(&self.text_model, credential, &payload).await?;
        extract_text(&response)
    }
}

fn image_part(source: &SourceImage) -> Value {
    json!({
        "inlineData": {
            "mimeType": source.payload.mime_type,
            "data": source.payload.base64(),
        }
    })
}

fn build_render_payload(source: &SourceImage, prompt: &str, params: &RenderParams) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [image_part(source), { "text": prompt }],
        }],
        "generationConfig": {
            "candidateCount": 1,
            "responseModalities": ["IMAGE"],
            "imageConfig": {
                "aspectRatio": params.aspect_ratio.label(),
                "imageSize": params.resolution.image_size(),
            },
        },
        "safetySettings": default_safety_settings(),
    })
}

fn build_analysis_payload(source: &SourceImage, prompt: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [image_part(source), { "text": prompt }],
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
        },
        "safetySettings": default_safety_settings(),
    })
}

fn default_safety_settings() -> Vec<Value> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| {
        json!({
            "category": category,
            "threshold": "OFF",
        })
    })
    .collect()
}

fn response_parts<'a>(response: &'a Value) -> impl Iterator<Item = &'a Value> + 'a {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|candidate| {
            candidate
                .get("content")
                .and_then(|content| content.get("parts"))
                .and_then(Value::as_array)
        })
        .flatten()
}

/// First inline image in the response, `None` when there is none.
fn extract_image(response: &Value) -> Result<Option<ImagePayload>> {
    for part in response_parts(response) {
        let Some(inline) = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object)
        else {
            continue;
        };
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let bytes = BASE64.decode(data.as_bytes()).map_err(|err| {
            EngineError::MalformedResponse(format!("Gemini image base64 decode failed: {err}"))
        })?;
        if bytes.is_empty() {
            continue;
        }
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or("image/png");
        return Ok(Some(ImagePayload::new(mime_type, bytes)));
    }
    Ok(None)
}

fn extract_text(response: &Value) -> Result<String> {
    let text: String = response_parts(response)
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(EngineError::MalformedResponse(
            "Gemini response carried no text".to_string(),
        ));
    }
    Ok(text)
}

fn error_message_from_body(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let structured = parsed.as_ref().and_then(|value| value.get("error")).map(|error| {
        let status = error.get("status").and_then(Value::as_str).unwrap_or_default();
        let message = error.get("message").and_then(Value::as_str).unwrap_or_default();
        format!("{status} {message}").trim().to_string()
    });
    let message = structured
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    truncate(&message, MAX_ERROR_BODY_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
