//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Turning request bodies into validated `GenerationRequest`s
//!   - Running a generation: plan prompts, call the service, validate, store
//!   - Validating arbitrary text (e.g. a previously exported file)
//!   - Rendering a stored generation for download

use chrono::Local;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{checked_count, Generation, GenerationRequest, GenerationResult};
use crate::error::{InvalidRequest, ServiceError};
use crate::export::{export_filename, render_markdown, write_export};
use crate::prompt::{plan, stitch, PromptPart};
use crate::protocol::{GenerateIn, ValidateIn, ValidateOut};
use crate::state::AppState;
use crate::util::trunc_for_log;
use crate::validator::{assess_content, recommendations, validate};

pub fn build_request(state: &AppState, body: &GenerateIn) -> Result<GenerationRequest, InvalidRequest> {
  GenerationRequest::new(&body.topic, body.question_type, body.difficulty, body.count, state.limits())
}

/// Prompts that `generate` would send for this request, without calling the service.
pub fn preview_prompts(state: &AppState, req: &GenerationRequest) -> Vec<PromptPart> {
  plan(&state.prompts, req, state.generation.mixed_strategy)
}

/// Run one generation end to end and store the result.
///
/// A split Mixed request keeps whichever parts succeeded; it fails only when
/// every part fails, with the last error.
#[instrument(level = "info", skip(state, req, filename), fields(topic = %req.topic(), count = req.count(), difficulty = ?req.difficulty()))]
pub async fn generate(
  state: &AppState,
  req: GenerationRequest,
  filename: Option<&str>,
) -> Result<Generation, ServiceError> {
  let parts = preview_prompts(state, &req);
  let total = parts.len();

  let mut texts: Vec<(Option<String>, String)> = Vec::with_capacity(total);
  let mut models: Vec<String> = Vec::new();
  let mut last_err: Option<ServiceError> = None;

  for (i, part) in parts.into_iter().enumerate() {
    debug!(target: "generation", part = i + 1, of = total, prompt = %trunc_for_log(&part.prompt, 200), "Sending prompt");
    match state.service.generate(&part.prompt).await {
      Ok(g) => {
        info!(target: "generation", part = i + 1, of = total, model = %g.model, text_len = g.text.len(), "Part generated");
        if !models.contains(&g.model) {
          models.push(g.model);
        }
        texts.push((part.heading, g.text));
      }
      Err(e) => {
        error!(target: "generation", part = i + 1, of = total, kind = e.kind(), error = %e, "Part failed");
        last_err = Some(e);
      }
    }
  }

  if texts.is_empty() {
    return Err(last_err.unwrap_or_else(|| ServiceError::upstream("no prompts were planned")));
  }
  if let Some(e) = &last_err {
    warn!(target: "generation", succeeded = texts.len(), of = total, error = %e, "Keeping partial result");
  }

  let raw_text = stitch(texts.iter().map(|(h, t)| (h.as_deref(), t.as_str())));
  let result = GenerationResult::new(raw_text, req.count());
  let report = validate(&result, &state.scoring);
  let signals = assess_content(&result.raw_text, &req);
  let created_at = Local::now();

  let generation = Generation {
    id: Uuid::new_v4(),
    filename: export_filename(filename, created_at),
    model: models.join(", "),
    request: req,
    result,
    report,
    signals,
    created_at,
  };
  info!(
    target: "generation",
    id = %generation.id,
    score = %format!("{:.2}", generation.report.score),
    passed = generation.report.passed,
    issues = generation.report.issues.len(),
    "Generation validated"
  );

  if let Some(dir) = &state.export_dir {
    if let Err(e) = write_export(dir, &generation.filename, &render_markdown(&generation)).await {
      warn!(target: "questgen_backend", dir = %dir.display(), error = %e, "Failed to write export to disk");
    }
  }

  state.insert_generation(generation.clone()).await;
  Ok(generation)
}

/// Validate arbitrary text. Content signals need topic, type and difficulty.
#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len(), count = body.count))]
pub fn validate_text(state: &AppState, body: &ValidateIn) -> Result<ValidateOut, InvalidRequest> {
  let expected = checked_count(body.count, state.limits())?;
  let result = GenerationResult::new(body.text.as_str(), expected);
  let report = validate(&result, &state.scoring);

  let signals = match (&body.topic, body.question_type, body.difficulty) {
    (Some(topic), Some(question_type), Some(difficulty)) => {
      let req = GenerationRequest::new(topic, question_type, difficulty, body.count, state.limits())?;
      Some(assess_content(&body.text, &req))
    }
    _ => None,
  };
  let recommendations = recommendations(&report, signals.as_ref());

  info!(target: "generation", score = %format!("{:.2}", report.score), passed = report.passed, "Text validated");
  Ok(ValidateOut { report, signals, recommendations })
}

/// Markdown document and file name of a stored generation.
#[instrument(level = "info", skip(state), fields(%id))]
pub async fn export(state: &AppState, id: &Uuid) -> Option<(String, String)> {
  let g = state.get_generation(id).await?;
  Some((g.filename.clone(), render_markdown(&g)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  use crate::config::{FileConfig, MixedStrategy};
  use crate::domain::{Difficulty, QuestionType, RequestLimits};
  use crate::gemini::mock::StubService;
  use crate::validator::tests::well_formed;

  fn state_with(service: Arc<StubService>, strategy: MixedStrategy) -> AppState {
    let mut cfg = FileConfig::default();
    cfg.generation.mixed_strategy = strategy;
    AppState::new(cfg, service, None)
  }

  fn req(d: Difficulty, n: i64) -> GenerationRequest {
    GenerationRequest::new("Python", QuestionType::Theoretical, d, n, &RequestLimits::default()).unwrap()
  }

  #[tokio::test]
  async fn well_formed_reply_passes_and_is_stored() {
    let stub = Arc::new(StubService::replying(well_formed("Python", 5)));
    let state = state_with(stub.clone(), MixedStrategy::Single);

    let g = generate(&state, req(Difficulty::Easy, 5), Some("python qs")).await.unwrap();
    assert!(g.report.passed);
    assert_eq!(g.report.score, 1.0);
    assert_eq!(g.filename, "python_qs.md");
    assert_eq!(g.model, "stub-model");
    assert_eq!(stub.calls(), 1);
    assert!(state.get_generation(&g.id).await.is_some());
  }

  #[tokio::test]
  async fn service_error_is_propagated_and_nothing_stored() {
    let stub = Arc::new(StubService::failing(ServiceError::rate_limit("quota")));
    let state = state_with(stub, MixedStrategy::Single);

    let err = generate(&state, req(Difficulty::Easy, 5), None).await.unwrap_err();
    assert_eq!(err.kind(), "rate_limit");
  }

  #[tokio::test]
  async fn split_mixed_request_calls_once_per_level() {
    let stub = Arc::new(StubService::with(|prompt| {
      let n = if prompt.contains("Generate 4 ") { 4 } else { 3 };
      Ok(well_formed("Python", n))
    }));
    let state = state_with(stub.clone(), MixedStrategy::Split);

    let g = generate(&state, req(Difficulty::Mixed, 10), None).await.unwrap();
    assert_eq!(stub.calls(), 3);
    assert!(g.result.raw_text.contains("# Easy Level Questions"));
    assert!(g.result.raw_text.contains("# Hard Level Questions"));
    assert_eq!(g.report.checks.questions_found, 10);
  }

  #[tokio::test]
  async fn split_keeps_successful_parts() {
    let stub = Arc::new(StubService::with(|prompt| {
      if prompt.contains("Hard difficulty level") {
        Err(ServiceError::timeout("slow"))
      } else {
        Ok(well_formed("Python", 3))
      }
    }));
    let state = state_with(stub.clone(), MixedStrategy::Split);

    let g = generate(&state, req(Difficulty::Mixed, 9), None).await.unwrap();
    assert_eq!(stub.calls(), 3);
    assert_eq!(g.report.checks.questions_found, 6);
    assert!(!g.report.issues.is_empty());
  }

  #[tokio::test]
  async fn split_fails_when_every_part_fails() {
    let stub = Arc::new(StubService::failing(ServiceError::upstream("boom")));
    let state = state_with(stub.clone(), MixedStrategy::Split);

    let err = generate(&state, req(Difficulty::Mixed, 9), None).await.unwrap_err();
    assert_eq!(err.kind(), "upstream");
    assert_eq!(stub.calls(), 3);
  }

  #[tokio::test]
  async fn export_renders_stored_generation() {
    let stub = Arc::new(StubService::replying(well_formed("Python", 2)));
    let state = state_with(stub, MixedStrategy::Single);
    let g = generate(&state, req(Difficulty::Medium, 2), None).await.unwrap();

    let (filename, markdown) = export(&state, &g.id).await.unwrap();
    assert_eq!(filename, g.filename);
    assert!(markdown.starts_with("# Interview Questions: Python"));
    assert!(export(&state, &Uuid::new_v4()).await.is_none());
  }

  #[test]
  fn validate_text_without_context_has_no_signals() {
    let state = state_with(Arc::new(StubService::replying("")), MixedStrategy::Single);
    let body = ValidateIn { text: well_formed("Rust", 3), count: 3, topic: None, question_type: None, difficulty: None };
    let out = validate_text(&state, &body).unwrap();
    assert!(out.report.passed);
    assert!(out.signals.is_none());
    assert!(out.recommendations.is_empty());
  }

  #[test]
  fn validate_text_recommends_without_context() {
    let state = state_with(Arc::new(StubService::replying("")), MixedStrategy::Single);
    let text = "## Question 1\n**Answer:** short\n## Question 2\n".to_string();
    let body = ValidateIn { text, count: 5, topic: None, question_type: None, difficulty: None };
    let out = validate_text(&state, &body).unwrap();
    assert!(out.signals.is_none());
    assert!(out.recommendations.contains(&"Ensure all questions have detailed answers".to_string()));
    assert!(out.recommendations.contains(&"Consider regenerating to get the correct number of questions".to_string()));
  }

  #[test]
  fn validate_text_rejects_bad_count() {
    let state = state_with(Arc::new(StubService::replying("")), MixedStrategy::Single);
    let body = ValidateIn { text: String::new(), count: 0, topic: None, question_type: None, difficulty: None };
    assert!(matches!(validate_text(&state, &body), Err(InvalidRequest::CountOutOfRange { .. })));
  }
}
