//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{MixedStrategy, ScoringPolicy};
use crate::domain::{ContentSignals, Difficulty, Generation, QuestionType, ValidationReport};
use crate::prompt::PromptPart;
use crate::validator::recommendations;

fn default_count() -> i64 {
    50
}

/// Request body shared by `/prompt` and `/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub topic: String,
    #[serde(rename = "questionType")]
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    /// Signed so that zero and negative counts reach request validation.
    #[serde(default = "default_count")]
    pub count: i64,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PromptPartOut {
    pub heading: Option<String>,
    pub difficulty: Difficulty,
    pub count: u32,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct PromptOut {
    pub parts: Vec<PromptPartOut>,
}

pub fn to_prompt_out(parts: Vec<PromptPart>) -> PromptOut {
    PromptOut {
        parts: parts
            .into_iter()
            .map(|p| PromptPartOut {
                heading: p.heading,
                difficulty: p.request.difficulty(),
                count: p.request.count(),
                prompt: p.prompt,
            })
            .collect(),
    }
}

/// DTO for a stored generation, returned by `/generate` and `/generations/:id`.
#[derive(Debug, Serialize)]
pub struct GenerationOut {
    pub id: Uuid,
    pub topic: String,
    #[serde(rename = "questionType")]
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub count: u32,
    pub model: String,
    pub filename: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Local>,
    pub report: ValidationReport,
    pub signals: ContentSignals,
    pub recommendations: Vec<String>,
    #[serde(rename = "regenerateSuggested")]
    pub regenerate_suggested: bool,
    #[serde(rename = "exportUrl")]
    pub export_url: String,
    pub markdown: String,
}

/// Convert a stored `Generation` (internal) to the public DTO.
pub fn to_generation_out(g: &Generation, scoring: &ScoringPolicy, markdown: String) -> GenerationOut {
    GenerationOut {
        id: g.id,
        topic: g.request.topic().to_string(),
        question_type: g.request.question_type(),
        difficulty: g.request.difficulty(),
        count: g.request.count(),
        model: g.model.clone(),
        filename: g.filename.clone(),
        created_at: g.created_at,
        report: g.report.clone(),
        signals: g.signals.clone(),
        recommendations: recommendations(&g.report, Some(&g.signals)),
        regenerate_suggested: g.report.score < scoring.regenerate_below,
        export_url: format!("/api/v1/export/{}", g.id),
        markdown,
    }
}

/// Validate arbitrary text, e.g. a previously exported file.
/// Topic, type and difficulty are optional; when all three are present the
/// content signals are computed too.
#[derive(Debug, Deserialize)]
pub struct ValidateIn {
    pub text: String,
    pub count: i64,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, rename = "questionType")]
    pub question_type: Option<QuestionType>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Serialize)]
pub struct ValidateOut {
    pub report: ValidationReport,
    pub signals: Option<ContentSignals>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OptionItem<T> {
    pub value: T,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OptionsOut {
    #[serde(rename = "questionTypes")]
    pub question_types: Vec<OptionItem<QuestionType>>,
    pub difficulties: Vec<OptionItem<Difficulty>>,
    #[serde(rename = "minQuestions")]
    pub min_questions: u32,
    #[serde(rename = "maxQuestions")]
    pub max_questions: u32,
    #[serde(rename = "defaultCount")]
    pub default_count: i64,
    #[serde(rename = "mixedStrategy")]
    pub mixed_strategy: MixedStrategy,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub service: String,
}

pub fn options_out(min_questions: u32, max_questions: u32, mixed_strategy: MixedStrategy) -> OptionsOut {
    OptionsOut {
        question_types: QuestionType::ALL.iter().map(|t| OptionItem { value: *t, label: t.label() }).collect(),
        difficulties: Difficulty::ALL.iter().map(|d| OptionItem { value: *d, label: d.label() }).collect(),
        min_questions,
        max_questions,
        default_count: default_count().min(i64::from(max_questions)).max(i64::from(min_questions)),
        mixed_strategy,
    }
}
