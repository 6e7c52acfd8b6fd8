//! Generative service boundary and the Gemini implementation.
//!
//! Callers only see `GenerativeService::generate(prompt)`. `GeminiClient`
//! calls `models/{model}:generateContent`, walking the configured model list
//! until one answers. Calls are instrumented and log model names, latencies,
//! token usage and response sizes (not contents).
//!
//! NOTE: the API key travels in the `x-goog-api-key` header and is never logged.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::GeminiSettings;
use crate::error::{ConfigError, ServiceError};

/// Text produced by a generative service, plus the model that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generated {
  pub text: String,
  pub model: String,
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait GenerativeService: Send + Sync {
  async fn generate(&self, prompt: &str) -> Result<Generated, ServiceError>;

  /// Provider name for logs.
  fn name(&self) -> &str;
}

#[derive(Clone)]
pub struct GeminiClient {
  client: reqwest::Client,
  settings: GeminiSettings,
}

impl GeminiClient {
  pub fn new(settings: GeminiSettings) -> Result<Self, ConfigError> {
    let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
    Ok(Self { client, settings })
  }

  pub fn settings(&self) -> &GeminiSettings {
    &self.settings
  }

  /// One generateContent call against one model.
  #[instrument(level = "info", skip(self, prompt), fields(model = %model, prompt_len = prompt.len()))]
  async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<String, ServiceError> {
    let model = model.trim_start_matches("models/");
    let url = format!("{}/models/{}:generateContent", self.settings.base_url, model);
    let req = GenerateContentRequest {
      contents: vec![Content {
        role: Some("user".into()),
        parts: vec![Part { text: Some(prompt.to_string()) }],
      }],
      generation_config: GenerationConfig { temperature: self.settings.temperature },
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "questgen-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.settings.api_key)
      .json(&req).send().await.map_err(map_transport_error)?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      return Err(map_status_error(status, &body));
    }

    let body: GenerateContentResponse = res.json().await.map_err(|e| {
      if e.is_timeout() {
        ServiceError::timeout(e.to_string())
      } else {
        ServiceError::upstream(format!("invalid response body: {e}"))
      }
    })?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    extract_text(body)
  }
}

#[async_trait]
impl GenerativeService for GeminiClient {
  #[instrument(level = "info", skip(self, prompt), fields(prompt_len = prompt.len()))]
  async fn generate(&self, prompt: &str) -> Result<Generated, ServiceError> {
    let mut failures = Vec::new();
    let mut last = None;

    for model in &self.settings.models {
      let start = Instant::now();
      match self.generate_with_model(model, prompt).await {
        Ok(text) => {
          info!(%model, elapsed = ?start.elapsed(), text_len = text.len(), "Model response received successfully");
          return Ok(Generated { text, model: model.clone() });
        }
        // Every model shares the key; no point trying the rest.
        Err(e @ ServiceError::Auth { .. }) => {
          error!(%model, elapsed = ?start.elapsed(), error = %e, "Gemini rejected the credential");
          return Err(e);
        }
        // The timeout covers the whole call, not each model.
        Err(e @ ServiceError::Timeout { .. }) => {
          error!(%model, elapsed = ?start.elapsed(), error = %e, "Gemini call timed out");
          return Err(e);
        }
        Err(e) => {
          warn!(%model, elapsed = ?start.elapsed(), error = %e, "Model call failed; trying next model");
          failures.push(format!("{model}: {e}"));
          last = Some(e);
        }
      }
    }

    match last {
      Some(e) if failures.len() > 1 => {
        let summary = format!("all models failed: {}", failures.join("; "));
        Err(e.with_message(summary))
      }
      Some(e) => Err(e),
      None => Err(ServiceError::upstream("no models configured")),
    }
  }

  fn name(&self) -> &str {
    "gemini"
  }
}

fn map_transport_error(e: reqwest::Error) -> ServiceError {
  if e.is_timeout() {
    ServiceError::timeout(e.to_string())
  } else {
    ServiceError::upstream(format!("request failed: {e}"))
  }
}

fn map_status_error(status: reqwest::StatusCode, body: &str) -> ServiceError {
  let detail = extract_gemini_error(body);
  let msg = match &detail {
    Some(d) => d.message.clone(),
    None => body.chars().take(300).collect(),
  };
  let msg = format!("Gemini HTTP {}: {}", status, msg);

  // An invalid key comes back as 400 INVALID_ARGUMENT.
  let bad_key = detail
    .as_ref()
    .map(|d| d.status.as_deref() == Some("INVALID_ARGUMENT") && d.message.contains("API key"))
    .unwrap_or(false);

  match status.as_u16() {
    401 | 403 => ServiceError::auth(msg),
    400 if bad_key => ServiceError::auth(msg),
    429 => ServiceError::rate_limit(msg),
    408 | 504 => ServiceError::timeout(msg),
    _ => ServiceError::upstream(msg),
  }
}

/// Concatenate the first candidate's text parts.
fn extract_text(body: GenerateContentResponse) -> Result<String, ServiceError> {
  let candidate = body.candidates.into_iter().next();
  let text = candidate
    .as_ref()
    .and_then(|c| c.content.as_ref())
    .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect::<String>())
    .unwrap_or_default();

  if !text.trim().is_empty() {
    return Ok(text.trim().to_string());
  }
  if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
    return Err(ServiceError::upstream(format!("prompt blocked: {reason}")));
  }
  let finish = candidate.and_then(|c| c.finish_reason).unwrap_or_else(|| "none".into());
  Err(ServiceError::upstream(format!("empty response (finish reason: {finish})")))
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}
#[derive(Serialize)]
struct GenerationConfig { temperature: f32 }

#[derive(Serialize, Deserialize)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")] role: Option<String>,
  #[serde(default)] parts: Vec<Part>,
}
#[derive(Serialize, Deserialize)]
struct Part {
  #[serde(default, skip_serializing_if = "Option::is_none")] text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] prompt_feedback: Option<PromptFeedback>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)] content: Option<Content>,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
  #[serde(default)] block_reason: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

struct GeminiErrorDetail {
  message: String,
  status: Option<String>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<GeminiErrorDetail> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String, #[serde(default)] status: Option<String> }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(GeminiErrorDetail { message: w.error.message, status: w.error.status }),
    Err(_) => None,
  }
}
