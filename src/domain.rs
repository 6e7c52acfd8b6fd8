//! Domain models: generation requests and results, validation reports, and
//! the marker vocabulary shared by the prompt builder, validator and exporter.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InvalidRequest;

/// Heading that opens every question block: `## Question 7`.
pub const QUESTION_HEADING: &str = "## Question";
/// Label in front of the question text.
pub const QUESTION_LABEL: &str = "**Question:**";
/// Label in front of the answer text.
pub const ANSWER_LABEL: &str = "**Answer:**";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  /// Conceptual prose questions.
  #[serde(alias = "Theoretical")]
  Theoretical,
  /// Coding questions (syntax, output, implementation).
  #[serde(alias = "code_based", alias = "Code-based", alias = "Code")]
  Code,
}

impl QuestionType {
  pub const ALL: [QuestionType; 2] = [QuestionType::Theoretical, QuestionType::Code];

  pub fn label(self) -> &'static str {
    match self {
      QuestionType::Theoretical => "Theoretical",
      QuestionType::Code => "Code-based",
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  #[serde(alias = "Easy")] Easy,
  #[serde(alias = "Medium")] Medium,
  #[serde(alias = "Hard")] Hard,
  /// Spread across the three levels.
  #[serde(alias = "Mixed")] Mixed,
}

impl Difficulty {
  pub const ALL: [Difficulty; 4] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard, Difficulty::Mixed];

  pub fn label(self) -> &'static str {
    match self {
      Difficulty::Easy => "Easy",
      Difficulty::Medium => "Medium",
      Difficulty::Hard => "Hard",
      Difficulty::Mixed => "Mixed",
    }
  }
}

/// Bounds applied when a request is constructed from user input.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RequestLimits {
  pub min_questions: u32,
  pub max_questions: u32,
  pub max_topic_chars: usize,
}

impl Default for RequestLimits {
  fn default() -> Self {
    Self { min_questions: 1, max_questions: 100, max_topic_chars: 200 }
  }
}

/// Check a user supplied question count against the limits.
pub fn checked_count(count: i64, limits: &RequestLimits) -> Result<u32, InvalidRequest> {
  let min = limits.min_questions.max(1);
  if count < i64::from(min) || count > i64::from(limits.max_questions) {
    return Err(InvalidRequest::CountOutOfRange { got: count, min, max: limits.max_questions });
  }
  Ok(count as u32)
}

/// A validated request. Only constructible through `GenerationRequest::new`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct GenerationRequest {
  topic: String,
  question_type: QuestionType,
  difficulty: Difficulty,
  count: u32,
}

impl GenerationRequest {
  /// Validate user input. The topic is trimmed and collapsed onto one line.
  pub fn new(
    topic: &str,
    question_type: QuestionType,
    difficulty: Difficulty,
    count: i64,
    limits: &RequestLimits,
  ) -> Result<Self, InvalidRequest> {
    let topic = topic.split_whitespace().collect::<Vec<_>>().join(" ");
    if topic.is_empty() {
      return Err(InvalidRequest::EmptyTopic);
    }
    let len = topic.chars().count();
    if len > limits.max_topic_chars {
      return Err(InvalidRequest::TopicTooLong { len, max: limits.max_topic_chars });
    }
    let count = checked_count(count, limits)?;
    Ok(Self { topic, question_type, difficulty, count })
  }

  /// Same topic and type, different difficulty/count. Used when a Mixed
  /// request is split into per-level parts; `count` must be positive.
  pub(crate) fn part(&self, difficulty: Difficulty, count: u32) -> Self {
    debug_assert!(count > 0);
    Self { topic: self.topic.clone(), question_type: self.question_type, difficulty, count }
  }

  pub fn topic(&self) -> &str { &self.topic }
  pub fn question_type(&self) -> QuestionType { self.question_type }
  pub fn difficulty(&self) -> Difficulty { self.difficulty }
  pub fn count(&self) -> u32 { self.count }
}

/// Raw text returned by the generative service.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationResult {
  pub raw_text: String,
  pub requested_count: u32,
}

impl GenerationResult {
  pub fn new(raw_text: impl Into<String>, requested_count: u32) -> Self {
    Self { raw_text: raw_text.into(), requested_count }
  }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
  Excellent,
  Good,
  Fair,
  Poor,
}

impl Grade {
  pub fn from_score(score: f64) -> Self {
    if score >= 0.85 {
      Grade::Excellent
    } else if score >= 0.70 {
      Grade::Good
    } else if score >= 0.50 {
      Grade::Fair
    } else {
      Grade::Poor
    }
  }
}

/// Raw counts gathered while validating.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructuralChecks {
  pub expected_questions: u32,
  pub questions_found: usize,
  pub answers_found: usize,
  pub short_answers: usize,
  pub average_answer_words: f64,
}

/// Outcome of validating one response.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
  pub passed: bool,
  /// Always within `[0.0, 1.0]`.
  pub score: f64,
  pub grade: Grade,
  pub issues: Vec<String>,
  pub checks: StructuralChecks,
}

/// Heuristic content signals. Reported alongside the validation report;
/// they never change the score.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentSignals {
  pub topic_keywords_found: usize,
  pub topic_keywords_total: usize,
  pub topic_relevant: bool,
  /// `None` for Mixed, where no single level applies.
  pub difficulty_indicators: Option<usize>,
  pub difficulty_appropriate: bool,
  pub type_compliant: bool,
  /// Average answer length reaches the brief-answer threshold.
  pub answers_detailed: bool,
  pub warnings: Vec<String>,
}

/// One complete user action: request, service output, and verdict.
#[derive(Clone, Debug, Serialize)]
pub struct Generation {
  pub id: Uuid,
  pub request: GenerationRequest,
  pub result: GenerationResult,
  pub report: ValidationReport,
  pub signals: ContentSignals,
  /// Model(s) that produced the text.
  pub model: String,
  /// Download name, always ending in `.md`.
  pub filename: String,
  pub created_at: DateTime<Local>,
}
