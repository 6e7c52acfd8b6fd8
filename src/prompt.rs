//! Prompt construction.
//!
//! `build_prompt` turns a validated request into the instruction text sent to
//! the generative service. It is deterministic and uses the same marker
//! vocabulary the validator looks for.
//!
//! `plan` decides how many prompts a request needs: one, or one per level
//! when a Mixed request is split.

use serde::Serialize;

use crate::config::{LevelGuidance, MixedStrategy, Prompts};
use crate::domain::{Difficulty, GenerationRequest, QuestionType, ANSWER_LABEL, QUESTION_HEADING, QUESTION_LABEL};
use crate::util::fill_template;

/// Separator placed between stitched parts.
pub const PART_SEPARATOR: &str = "\n\n---\n\n";

pub fn build_prompt(prompts: &Prompts, req: &GenerationRequest) -> String {
  let (template, guidance) = match req.question_type() {
    QuestionType::Theoretical => (&prompts.theoretical_template, &prompts.theoretical_guidance),
    QuestionType::Code => (&prompts.code_template, &prompts.code_guidance),
  };

  let difficulty = req.difficulty();
  let rule = match difficulty {
    Difficulty::Mixed => prompts.mixed_rule.as_str(),
    _ => prompts.single_level_rule.as_str(),
  };
  let guidance = guidance_lines(guidance, difficulty);
  let count = req.count().to_string();

  // Topic goes last so user text is never treated as a placeholder.
  fill_template(
    template,
    &[
      ("difficulty_rule", rule),
      ("guidance", &guidance),
      ("count", &count),
      ("difficulty", difficulty.label()),
      ("question_heading", QUESTION_HEADING),
      ("question_label", QUESTION_LABEL),
      ("answer_label", ANSWER_LABEL),
      ("topic", req.topic()),
    ],
  )
}

fn guidance_lines(g: &LevelGuidance, difficulty: Difficulty) -> String {
  let lines: Vec<&str> = match difficulty {
    Difficulty::Easy => vec![g.easy.as_str()],
    Difficulty::Medium => vec![g.medium.as_str()],
    Difficulty::Hard => vec![g.hard.as_str()],
    Difficulty::Mixed => vec![g.easy.as_str(), g.medium.as_str(), g.hard.as_str()],
  };
  lines.iter().map(|l| format!("- {l}")).collect::<Vec<_>>().join("\n")
}

/// One call to the generative service.
#[derive(Clone, Debug, Serialize)]
pub struct PromptPart {
  /// Markdown heading placed above this part's text when stitching.
  pub heading: Option<String>,
  pub request: GenerationRequest,
  pub prompt: String,
}

/// Plan the service calls for a request.
pub fn plan(prompts: &Prompts, req: &GenerationRequest, strategy: MixedStrategy) -> Vec<PromptPart> {
  if req.difficulty() != Difficulty::Mixed || strategy == MixedStrategy::Single {
    return vec![PromptPart { heading: None, request: req.clone(), prompt: build_prompt(prompts, req) }];
  }

  let n = req.count();
  let easy = n / 3;
  let medium = n / 3;
  let hard = n - easy - medium;
  [(Difficulty::Easy, easy), (Difficulty::Medium, medium), (Difficulty::Hard, hard)]
    .into_iter()
    .filter(|(_, count)| *count > 0)
    .map(|(level, count)| {
      let request = req.part(level, count);
      PromptPart {
        heading: Some(format!("# {} Level Questions", level.label())),
        prompt: build_prompt(prompts, &request),
        request,
      }
    })
    .collect()
}

/// Join generated parts back into one document body.
pub fn stitch<'a>(parts: impl IntoIterator<Item = (Option<&'a str>, &'a str)>) -> String {
  parts
    .into_iter()
    .map(|(heading, text)| match heading {
      Some(h) => format!("{h}\n\n{}", text.trim()),
      None => text.trim().to_string(),
    })
    .collect::<Vec<_>>()
    .join(PART_SEPARATOR)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::RequestLimits;

  fn req(topic: &str, t: QuestionType, d: Difficulty, n: i64) -> GenerationRequest {
    GenerationRequest::new(topic, t, d, n, &RequestLimits::default()).unwrap()
  }

  #[test]
  fn prompt_is_deterministic() {
    let p = Prompts::default();
    let r = req("Python", QuestionType::Theoretical, Difficulty::Easy, 25);
    assert_eq!(build_prompt(&p, &r), build_prompt(&p, &r));
  }

  #[test]
  fn prompt_encodes_every_parameter_and_the_markers() {
    let p = Prompts::default();
    let out = build_prompt(&p, &req("Python", QuestionType::Theoretical, Difficulty::Easy, 25));
    assert!(out.contains("Generate 25 theoretical interview questions"));
    assert!(out.contains("topic: Python"));
    assert!(out.contains("specifically at Easy difficulty level"));
    assert!(out.contains("exactly 25 questions"));
    assert!(out.contains("## Question [number]"));
    assert!(out.contains("**Question:** [Question text]"));
    assert!(out.contains("**Answer:** [Detailed answer]"));
    assert!(out.contains("basic concepts, definitions"));
    assert!(!out.contains("Hard:"));
    assert!(!out.contains('{'), "unfilled placeholder in:\n{out}");
  }

  #[test]
  fn code_prompt_differs_from_theoretical() {
    let p = Prompts::default();
    let theory = build_prompt(&p, &req("Rust", QuestionType::Theoretical, Difficulty::Hard, 5));
    let code = build_prompt(&p, &req("Rust", QuestionType::Code, Difficulty::Hard, 5));
    assert_ne!(theory, code);
    assert!(code.contains("coding interview questions"));
    assert!(code.contains("code examples"));
  }

  #[test]
  fn mixed_prompt_asks_for_varied_difficulty() {
    let p = Prompts::default();
    let out = build_prompt(&p, &req("SQL", QuestionType::Code, Difficulty::Mixed, 12));
    assert!(out.contains("Vary the difficulty"));
    assert!(out.contains("- Easy:") && out.contains("- Medium:") && out.contains("- Hard:"));
  }

  #[test]
  fn braces_in_topic_are_left_alone() {
    let p = Prompts::default();
    let out = build_prompt(&p, &req("format!{count}", QuestionType::Code, Difficulty::Easy, 3));
    assert!(out.contains("topic: format!{count}"));
  }

  #[test]
  fn single_strategy_plans_one_call() {
    let p = Prompts::default();
    let parts = plan(&p, &req("Go", QuestionType::Code, Difficulty::Mixed, 10), MixedStrategy::Single);
    assert_eq!(parts.len(), 1);
    assert!(parts[0].heading.is_none());
  }

  #[test]
  fn split_strategy_divides_count_across_levels() {
    let p = Prompts::default();
    let parts = plan(&p, &req("Go", QuestionType::Code, Difficulty::Mixed, 10), MixedStrategy::Split);
    let counts: Vec<(Difficulty, u32)> = parts.iter().map(|p| (p.request.difficulty(), p.request.count())).collect();
    assert_eq!(counts, vec![(Difficulty::Easy, 3), (Difficulty::Medium, 3), (Difficulty::Hard, 4)]);
    assert_eq!(parts[0].heading.as_deref(), Some("# Easy Level Questions"));
    assert!(parts[2].prompt.contains("Generate 4 coding interview questions"));
  }

  #[test]
  fn split_strategy_skips_empty_levels() {
    let p = Prompts::default();
    let parts = plan(&p, &req("Go", QuestionType::Code, Difficulty::Mixed, 2), MixedStrategy::Split);
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].request.difficulty(), Difficulty::Hard);
    assert_eq!(parts[0].request.count(), 2);
  }

  #[test]
  fn split_strategy_ignores_single_levels() {
    let p = Prompts::default();
    let parts = plan(&p, &req("Go", QuestionType::Code, Difficulty::Medium, 9), MixedStrategy::Split);
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].request.count(), 9);
  }

  #[test]
  fn stitch_joins_parts_with_headings() {
    let body = stitch([(Some("# Easy Level Questions"), "a\n"), (None, "b")]);
    assert_eq!(body, "# Easy Level Questions\n\na\n\n---\n\nb");
  }
}
