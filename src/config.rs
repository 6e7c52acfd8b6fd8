//! Configuration: credentials and endpoints from the environment, tunables
//! (prompts, scoring policy, generation settings) from an optional TOML file.
//!
//! Environment:
//!   GEMINI_API_KEY        : required; startup fails without it
//!   GEMINI_BASE_URL       : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODELS         : comma separated, tried in order
//!   GEMINI_TIMEOUT_SECS   : per-request timeout (default 120)
//!   GEMINI_TEMPERATURE    : sampling temperature (default 0.7)
//!   EXPORT_DIR            : if set, exported markdown is also written there
//!   QUESTGEN_CONFIG_PATH  : TOML file with [prompts], [scoring], [generation]

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::domain::RequestLimits;
use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODELS: [&str; 3] = ["gemini-2.0-flash", "gemini-1.5-flash", "gemini-1.5-pro"];

#[derive(Clone, Debug, Deserialize, Default)]
pub struct FileConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub scoring: ScoringPolicy,
  #[serde(default)]
  pub generation: GenerationSettings,
}

/// Per-level guidance lines appended to the prompt.
#[derive(Clone, Debug, Deserialize)]
pub struct LevelGuidance {
  pub easy: String,
  pub medium: String,
  pub hard: String,
}

/// Prompt templates. Placeholders: {count} {topic} {difficulty}
/// {difficulty_rule} {guidance} {question_heading} {question_label} {answer_label}.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub theoretical_template: String,
  pub code_template: String,
  pub theoretical_guidance: LevelGuidance,
  pub code_guidance: LevelGuidance,
  /// Used for Easy/Medium/Hard; may reference {difficulty}.
  pub single_level_rule: String,
  pub mixed_rule: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      theoretical_template: "Generate {count} theoretical interview questions for students on the topic: {topic} with {difficulty} difficulty level.

Requirements:
- {difficulty_rule}
- Generate exactly {count} questions, numbered from 1 to {count}
- No repetition of questions
- Include conceptual, analytical, and critical thinking questions
- Each question should have a detailed answer
- Format the output as markdown with the following structure:
  {question_heading} [number]
  {question_label} [Question text]
  {answer_label} [Detailed answer]

Difficulty guidance:
{guidance}
".into(),
      code_template: "Generate {count} coding interview questions for students on the topic: {topic} with {difficulty} difficulty level.

Requirements:
- {difficulty_rule}
- Generate exactly {count} questions, numbered from 1 to {count}
- No repetition of questions
- Include questions about syntax, logic, problem-solving, implementation, and predicting the output of code
- Each question should have a detailed answer with code examples where applicable
- Format the output as markdown with the following structure:
  {question_heading} [number]
  {question_label} [Question text]
  {answer_label} [Detailed answer with code examples if needed]

Difficulty guidance:
{guidance}
".into(),
      theoretical_guidance: LevelGuidance {
        easy: "Easy: Focus on basic concepts, definitions, and simple explanations".into(),
        medium: "Medium: Cover intermediate concepts requiring deeper understanding and application".into(),
        hard: "Hard: Include advanced concepts, complex scenarios, and questions requiring synthesis of multiple concepts".into(),
      },
      code_guidance: LevelGuidance {
        easy: "Easy: Basic coding tasks, simple algorithms, fundamental concepts".into(),
        medium: "Medium: Moderate complexity algorithms, data structures implementation, optimization problems".into(),
        hard: "Hard: Complex algorithms, advanced optimization, system design questions, challenging edge cases".into(),
      },
      single_level_rule: "Questions should be specifically at {difficulty} difficulty level".into(),
      mixed_rule: "Vary the difficulty across the set: roughly one third Easy, one third Medium and the rest Hard, ordered from Easy to Hard".into(),
    }
  }
}

/// Scoring weights and thresholds for the validator. Weights are relative;
/// they are normalised when the score is computed.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringPolicy {
  pub count_weight: f64,
  pub pairing_weight: f64,
  pub length_weight: f64,
  pub pass_threshold: f64,
  pub min_answer_chars: usize,
  /// Below this score the API suggests regenerating.
  pub regenerate_below: f64,
}

impl Default for ScoringPolicy {
  fn default() -> Self {
    Self {
      count_weight: 0.4,
      pairing_weight: 0.35,
      length_weight: 0.25,
      pass_threshold: 0.6,
      min_answer_chars: 40,
      regenerate_below: 0.7,
    }
  }
}

impl ScoringPolicy {
  /// Returns the policy unchanged if usable, otherwise the default.
  pub fn sanitized(self) -> Self {
    let weights = [self.count_weight, self.pairing_weight, self.length_weight];
    let weights_ok = weights.iter().all(|w| w.is_finite() && *w >= 0.0) && weights.iter().sum::<f64>() > 0.0;
    let thresholds_ok = [self.pass_threshold, self.regenerate_below]
      .iter()
      .all(|t| t.is_finite() && (0.0..=1.0).contains(t));
    if weights_ok && thresholds_ok {
      self
    } else {
      warn!(target: "questgen_backend", policy = ?self, "Invalid scoring policy; using defaults");
      Self::default()
    }
  }
}

/// How a Mixed-difficulty request is sent to the service.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MixedStrategy {
  /// One prompt asking for varied difficulty.
  #[default]
  Single,
  /// One call per level (Easy, Medium, Hard), stitched together.
  Split,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
  pub mixed_strategy: MixedStrategy,
  /// How many recent generations stay available for export.
  pub store_capacity: usize,
  pub limits: RequestLimits,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self { mixed_strategy: MixedStrategy::Single, store_capacity: 64, limits: RequestLimits::default() }
  }
}

/// Everything needed to reach the Gemini API.
#[derive(Clone)]
pub struct GeminiSettings {
  pub api_key: String,
  pub base_url: String,
  pub models: Vec<String>,
  pub timeout: Duration,
  pub temperature: f32,
}

impl std::fmt::Debug for GeminiSettings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GeminiSettings")
      .field("api_key", &mask_key(&self.api_key))
      .field("base_url", &self.base_url)
      .field("models", &self.models)
      .field("timeout", &self.timeout)
      .field("temperature", &self.temperature)
      .finish()
  }
}

impl GeminiSettings {
  /// Read settings from the environment. A missing key is fatal.
  pub fn from_env() -> Result<Self, ConfigError> {
    let api_key = std::env::var("GEMINI_API_KEY")
      .ok()
      .filter(|k| !k.trim().is_empty())
      .ok_or(ConfigError::MissingCredential("GEMINI_API_KEY"))?;
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let models = match std::env::var("GEMINI_MODELS") {
      Ok(list) => parse_model_list(&list),
      Err(_) => Vec::new(),
    };
    let models = if models.is_empty() { DEFAULT_MODELS.iter().map(|m| m.to_string()).collect() } else { models };

    let timeout = match std::env::var("GEMINI_TIMEOUT_SECS") {
      Ok(v) => Duration::from_secs(v.trim().parse::<u64>().map_err(|e| ConfigError::InvalidEnv {
        var: "GEMINI_TIMEOUT_SECS",
        message: e.to_string(),
      })?),
      Err(_) => Duration::from_secs(120),
    };
    let temperature = match std::env::var("GEMINI_TEMPERATURE") {
      Ok(v) => v.trim().parse::<f32>().map_err(|e| ConfigError::InvalidEnv {
        var: "GEMINI_TEMPERATURE",
        message: e.to_string(),
      })?,
      Err(_) => 0.7,
    };

    Ok(Self { api_key, base_url: base_url.trim_end_matches('/').to_string(), models, timeout, temperature })
  }
}

/// Split a comma separated model list, dropping blanks.
pub fn parse_model_list(list: &str) -> Vec<String> {
  list.split(',').map(str::trim).filter(|m| !m.is_empty()).map(String::from).collect()
}

/// Show only the last four characters of a credential.
pub fn mask_key(key: &str) -> String {
  let chars: Vec<char> = key.chars().collect();
  if chars.len() <= 4 {
    return "*".repeat(chars.len());
  }
  let tail: String = chars[chars.len() - 4..].iter().collect();
  format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

pub fn export_dir_from_env() -> Option<PathBuf> {
  std::env::var("EXPORT_DIR").ok().filter(|d| !d.trim().is_empty()).map(PathBuf::from)
}

/// Attempt to load `FileConfig` from QUESTGEN_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_file_config_from_env() -> Option<FileConfig> {
  let path = std::env::var("QUESTGEN_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_file_config(&s) {
      Ok(cfg) => {
        info!(target: "questgen_backend", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "questgen_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "questgen_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_file_config(s: &str) -> Result<FileConfig, toml::de::Error> {
  let mut cfg = toml::from_str::<FileConfig>(s)?;
  cfg.scoring = cfg.scoring.sanitized();
  Ok(cfg)
}
