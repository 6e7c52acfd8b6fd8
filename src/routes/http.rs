//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::header,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::export::{render_markdown, MARKDOWN_MIME};
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, service: state.service.name().to_string() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_options(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let limits = state.limits();
  Json(options_out(limits.min_questions, limits.max_questions, state.generation.mixed_strategy))
}

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len(), count = body.count))]
pub async fn http_post_prompt(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Result<Json<PromptOut>, AppError> {
  let req = build_request(&state, &body)?;
  let parts = preview_prompts(&state, &req);
  info!(target: "generation", parts = parts.len(), "HTTP prompt preview served");
  Ok(Json(to_prompt_out(parts)))
}

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len(), count = body.count, difficulty = ?body.difficulty))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Result<Json<GenerationOut>, AppError> {
  let req = build_request(&state, &body)?;
  let g = generate(&state, req, body.filename.as_deref()).await?;
  info!(target: "generation", id = %g.id, passed = g.report.passed, "HTTP generation served");
  let markdown = render_markdown(&g);
  Ok(Json(to_generation_out(&g, &state.scoring, markdown)))
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len(), count = body.count))]
pub async fn http_post_validate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ValidateIn>,
) -> Result<Json<ValidateOut>, AppError> {
  Ok(Json(validate_text(&state, &body)?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_generation(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<GenerationOut>, AppError> {
  let g = state
    .get_generation(&id)
    .await
    .ok_or_else(|| AppError::NotFound(format!("generation {id}")))?;
  let markdown = render_markdown(&g);
  Ok(Json(to_generation_out(&g, &state.scoring, markdown)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_export(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
  let (filename, markdown) = export(&state, &id)
    .await
    .ok_or_else(|| AppError::NotFound(format!("generation {id}")))?;
  info!(target: "generation", %id, %filename, bytes = markdown.len(), "HTTP export served");
  let headers = [
    (header::CONTENT_TYPE, MARKDOWN_MIME.to_string()),
    (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
  ];
  Ok((headers, markdown))
}
