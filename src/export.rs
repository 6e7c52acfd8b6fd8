//! Markdown export.
//!
//! The exported document is a fixed header followed by the generated text
//! verbatim, so validating an export gives the same report as validating
//! the raw text.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, instrument};

use crate::domain::{Generation, GenerationRequest};

pub const MARKDOWN_MIME: &str = "text/markdown; charset=utf-8";

/// Render the full markdown document for a stored generation.
pub fn render_markdown(g: &Generation) -> String {
  render_document(&g.request, g.created_at, &g.result.raw_text)
}

pub fn render_document(request: &GenerationRequest, created_at: DateTime<Local>, body: &str) -> String {
  format!(
    "# Interview Questions: {topic}\n\n\
     **Type:** {kind}  \n\
     **Difficulty:** {difficulty}  \n\
     **Generated:** {generated}  \n\
     **Total Questions:** {count}\n\n\
     ---\n\n\
     {body}\n",
    topic = request.topic(),
    kind = request.question_type().label(),
    difficulty = request.difficulty().label(),
    generated = created_at.format("%Y-%m-%d %H:%M:%S"),
    count = request.count(),
    body = body,
  )
}

/// File name for a download. User input is reduced to `[A-Za-z0-9._-]`;
/// blank input falls back to `interview_questions_<timestamp>`.
pub fn export_filename(requested: Option<&str>, created_at: DateTime<Local>) -> String {
  let cleaned: String = requested
    .unwrap_or_default()
    .trim()
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
    .collect();
  let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_').to_string();

  let stem = if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("md") {
    format!("interview_questions_{}", created_at.format("%Y%m%d_%H%M%S"))
  } else {
    cleaned
  };
  if stem.to_ascii_lowercase().ends_with(".md") { stem } else { format!("{stem}.md") }
}

/// Write an export into `dir`, creating it if needed.
#[instrument(level = "info", skip(content), fields(content_len = content.len()))]
pub async fn write_export(dir: &Path, filename: &str, content: &str) -> std::io::Result<PathBuf> {
  tokio::fs::create_dir_all(dir).await?;
  let path = dir.join(filename);
  tokio::fs::write(&path, content).await?;
  info!(target: "questgen_backend", path = %path.display(), "Export written");
  Ok(path)
}
