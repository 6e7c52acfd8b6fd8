//! Structural validation and quality scoring of generated text.
//!
//! The text is cut into blocks at each `## Question N` heading. A block is
//! paired when it carries an `**Answer:**` label, and its answer is long
//! enough when the text after the label reaches `min_answer_chars`.
//! Three components (count, pairing, length) are combined as a weighted
//! mean; with every component at 1.0 the score is exactly 1.0.
//!
//! `assess_content` adds keyword heuristics (topic, difficulty, question
//! type) that are reported as warnings and never affect the score.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ScoringPolicy;
use crate::domain::{
  ContentSignals, Difficulty, Grade, GenerationRequest, GenerationResult, QuestionType, StructuralChecks,
  ValidationReport,
};

pub const NO_STRUCTURE_ISSUE: &str = "No structured questions found";

static QUESTION_PATTERN: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?mi)^[ \t]*##[ \t]*Question[ \t]*(\d+)").unwrap());

static ANSWER_PATTERN: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?mi)^[ \t]*\*\*Answer(?::\*\*|\*\*:)").unwrap());

static CODE_BLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());

/// Max question numbers listed in one issue line.
const LISTED_NUMBERS: usize = 10;

struct Block<'a> {
  number: usize,
  answer: Option<&'a str>,
}

fn split_blocks(text: &str) -> Vec<Block<'_>> {
  let heads: Vec<(usize, usize, Option<usize>)> = QUESTION_PATTERN
    .captures_iter(text)
    .filter_map(|c| {
      let m = c.get(0)?;
      let number = c.get(1).and_then(|n| n.as_str().parse::<usize>().ok());
      Some((m.start(), m.end(), number))
    })
    .collect();

  heads
    .iter()
    .enumerate()
    .map(|(i, &(_, body_start, number))| {
      let body_end = heads.get(i + 1).map(|h| h.0).unwrap_or(text.len());
      let body = &text[body_start..body_end];
      let answer = ANSWER_PATTERN.find(body).map(|m| body[m.end()..].trim());
      Block { number: number.unwrap_or(i + 1), answer }
    })
    .collect()
}

fn list_numbers(numbers: &[usize]) -> String {
  let mut out = numbers.iter().take(LISTED_NUMBERS).map(|n| n.to_string()).collect::<Vec<_>>().join(", ");
  if numbers.len() > LISTED_NUMBERS {
    out.push_str(", …");
  }
  out
}

fn average_answer_words(blocks: &[Block<'_>]) -> f64 {
  let answers: Vec<&str> = blocks.iter().filter_map(|b| b.answer).collect();
  if answers.is_empty() {
    return 0.0;
  }
  answers.iter().map(|a| a.split_whitespace().count()).sum::<usize>() as f64 / answers.len() as f64
}

fn plural(n: usize, one: &str, many: &str) -> String {
  if n == 1 { format!("{n} {one}") } else { format!("{n} {many}") }
}

/// Validate a response against the requested count. Pure; never fails.
pub fn validate(result: &GenerationResult, policy: &ScoringPolicy) -> ValidationReport {
  let expected = result.requested_count;
  let blocks = split_blocks(&result.raw_text);

  if blocks.is_empty() {
    return ValidationReport {
      passed: false,
      score: 0.0,
      grade: Grade::Poor,
      issues: vec![NO_STRUCTURE_ISSUE.to_string()],
      checks: StructuralChecks { expected_questions: expected, ..Default::default() },
    };
  }

  let found = blocks.len();
  let unpaired: Vec<usize> = blocks.iter().filter(|b| b.answer.is_none()).map(|b| b.number).collect();
  let short: Vec<usize> = blocks
    .iter()
    .filter_map(|b| b.answer.map(|a| (b.number, a)))
    .filter(|(_, a)| a.chars().count() < policy.min_answer_chars)
    .map(|(n, _)| n)
    .collect();
  let average_answer_words = average_answer_words(&blocks);

  let mut issues = Vec::new();

  // Shortfall and overshoot are both penalised proportionally.
  let want = expected.max(1) as f64;
  let got = found as f64;
  let count_component = if got <= want { got / want } else { want / got };
  if found < expected as usize {
    issues.push(format!("Expected {expected} questions, found {found}"));
  } else if found > expected as usize {
    issues.push(format!("Expected {expected} questions, found {found} (more than requested)"));
  }

  let paired = found - unpaired.len();
  let pairing_component = paired as f64 / got;
  if !unpaired.is_empty() {
    issues.push(format!(
      "{} without an answer: {}",
      plural(unpaired.len(), "question", "questions"),
      list_numbers(&unpaired)
    ));
  }

  let long_enough = paired - short.len();
  let length_component = long_enough as f64 / got;
  if !short.is_empty() {
    issues.push(format!(
      "{} shorter than {} characters: {}",
      plural(short.len(), "answer", "answers"),
      policy.min_answer_chars,
      list_numbers(&short)
    ));
  }

  let total_weight = policy.count_weight + policy.pairing_weight + policy.length_weight;
  let weighted = policy.count_weight * count_component
    + policy.pairing_weight * pairing_component
    + policy.length_weight * length_component;
  let score = if total_weight > 0.0 { (weighted / total_weight).clamp(0.0, 1.0) } else { 0.0 };

  ValidationReport {
    passed: score >= policy.pass_threshold,
    score,
    grade: Grade::from_score(score),
    issues,
    checks: StructuralChecks {
      expected_questions: expected,
      questions_found: found,
      answers_found: paired,
      short_answers: short.len(),
      average_answer_words,
    },
  }
}

const EASY_INDICATORS: [&str; 6] = ["basic", "simple", "fundamental", "introduction", "what is", "define"];
const MEDIUM_INDICATORS: [&str; 6] = ["explain", "compare", "analyze", "implement", "design", "optimize"];
const HARD_INDICATORS: [&str; 7] =
  ["advanced", "complex", "sophisticated", "evaluate", "synthesize", "architect", "critique"];
/// Below this average an answer set is flagged as brief.
pub const MIN_AVERAGE_ANSWER_WORDS: f64 = 30.0;

const CODE_INDICATORS: [&str; 7] = ["code", "function", "algorithm", "implement", "syntax", "program", "script"];
const THEORY_INDICATORS: [&str; 6] = ["concept", "theory", "principle", "explain", "describe", "analyze"];

fn mentions(haystack: &str, needles: &[&str]) -> usize {
  needles.iter().filter(|n| haystack.contains(*n)).count()
}

/// Keyword heuristics about topic, difficulty and question type.
pub fn assess_content(text: &str, request: &GenerationRequest) -> ContentSignals {
  let lower = text.to_lowercase();
  let mut warnings = Vec::new();

  let keywords: Vec<String> = request.topic().to_lowercase().split_whitespace().map(String::from).collect();
  let topic_keywords_found = keywords.iter().filter(|k| lower.contains(k.as_str())).count();
  let topic_relevant = topic_keywords_found * 2 >= keywords.len();
  if !topic_relevant {
    warnings.push(format!(
      "Low topic relevance: only {}/{} topic keywords found",
      topic_keywords_found,
      keywords.len()
    ));
  }

  let indicators: Option<&[&str]> = match request.difficulty() {
    Difficulty::Easy => Some(&EASY_INDICATORS[..]),
    Difficulty::Medium => Some(&MEDIUM_INDICATORS[..]),
    Difficulty::Hard => Some(&HARD_INDICATORS[..]),
    Difficulty::Mixed => None,
  };
  let difficulty_indicators = indicators.map(|i| mentions(&lower, i));
  let difficulty_appropriate = difficulty_indicators.map_or(true, |n| n >= 3);
  if !difficulty_appropriate {
    warnings.push(format!(
      "Difficulty level may not match: few {} indicators found",
      request.difficulty().label()
    ));
  }

  let type_compliant = match request.question_type() {
    QuestionType::Code => {
      mentions(&lower, &CODE_INDICATORS) >= 5 || CODE_BLOCK_PATTERN.find_iter(text).count() >= 3
    }
    QuestionType::Theoretical => mentions(&lower, &THEORY_INDICATORS) >= 5,
  };
  if !type_compliant {
    warnings.push(match request.question_type() {
      QuestionType::Code => "Code-based questions may lack sufficient coding examples".to_string(),
      QuestionType::Theoretical => "Theoretical questions may lack depth".to_string(),
    });
  }

  let blocks = split_blocks(text);
  let has_answers = blocks.iter().any(|b| b.answer.is_some());
  let average_words = average_answer_words(&blocks);
  let answers_detailed = has_answers && average_words >= MIN_AVERAGE_ANSWER_WORDS;
  if has_answers && !answers_detailed {
    warnings.push(format!("Answers may be too brief (avg: {average_words:.0} words)"));
  }

  ContentSignals {
    topic_keywords_found,
    topic_keywords_total: keywords.len(),
    topic_relevant,
    difficulty_indicators,
    difficulty_appropriate,
    type_compliant,
    answers_detailed,
    warnings,
  }
}

/// Suggestions for the user when the result is not excellent. Structural
/// suggestions come from the report; content ones need `signals`.
pub fn recommendations(report: &ValidationReport, signals: Option<&ContentSignals>) -> Vec<String> {
  if report.grade == Grade::Excellent {
    return Vec::new();
  }
  let checks = &report.checks;
  let mut out = Vec::new();
  if checks.questions_found != checks.expected_questions as usize {
    out.push("Consider regenerating to get the correct number of questions".to_string());
  }
  if checks.answers_found < checks.questions_found {
    out.push("Ensure all questions have detailed answers".to_string());
  }
  if signals.is_some_and(|s| !s.topic_relevant) {
    out.push("Make the topic more specific or check if questions are relevant".to_string());
  }
  if checks.short_answers > 0 || signals.is_some_and(|s| !s.answers_detailed) {
    out.push("Request more detailed answers with examples".to_string());
  }
  out
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::domain::RequestLimits;

  /// `n` well-formed question/answer pairs in the format the prompt asks for.
  pub(crate) fn well_formed(topic: &str, n: usize) -> String {
    (1..=n)
      .map(|i| {
        format!(
          "## Question {i}\n**Question:** What is concept {i} of {topic}?\n**Answer:** Concept {i} of {topic} is explained here in enough detail to count as a real answer.\n"
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  fn policy() -> ScoringPolicy {
    ScoringPolicy::default()
  }

  #[test]
  fn exact_pairs_pass_with_maximum_score() {
    for n in [1usize, 3, 10, 50] {
      let report = validate(&GenerationResult::new(well_formed("Rust", n), n as u32), &policy());
      assert!(report.passed);
      assert_eq!(report.score, 1.0);
      assert_eq!(report.grade, Grade::Excellent);
      assert!(report.issues.is_empty(), "{:?}", report.issues);
      assert_eq!(report.checks.questions_found, n);
      assert_eq!(report.checks.answers_found, n);
    }
  }

  #[test]
  fn python_easy_twenty_five_passes() {
    let req = GenerationRequest::new("Python", QuestionType::Theoretical, Difficulty::Easy, 25, &RequestLimits::default())
      .unwrap();
    let text = well_formed("Python", 25);
    let report = validate(&GenerationResult::new(text, req.count()), &policy());
    assert!(report.passed);
    assert_eq!(report.checks.expected_questions, 25);
  }

  #[test]
  fn no_markers_scores_zero_with_one_issue() {
    for text in ["", "   \n", "Here are some thoughts about Rust without any structure."] {
      let report = validate(&GenerationResult::new(text, 10), &policy());
      assert!(!report.passed);
      assert_eq!(report.score, 0.0);
      assert_eq!(report.issues, vec![NO_STRUCTURE_ISSUE.to_string()]);
    }
  }

  #[test]
  fn answers_without_questions_count_as_unstructured() {
    let report = validate(&GenerationResult::new("**Answer:** something long enough to be an answer", 1), &policy());
    assert_eq!(report.score, 0.0);
    assert_eq!(report.issues.len(), 1);
  }

  #[test]
  fn removing_an_answer_lowers_score_and_adds_issue() {
    let full = well_formed("Rust", 5);
    let before = validate(&GenerationResult::new(full.clone(), 5), &policy());

    let lines: Vec<&str> = full.lines().collect();
    let idx = lines.iter().position(|l| l.starts_with("**Answer:**") && l.contains("Concept 3")).unwrap();
    let mut trimmed = lines.clone();
    trimmed.remove(idx);
    let after = validate(&GenerationResult::new(trimmed.join("\n"), 5), &policy());

    assert!(after.score < before.score);
    assert!(after.issues.len() > before.issues.len());
    assert_eq!(after.issues, vec!["1 question without an answer: 3".to_string()]);
    assert_eq!(after.checks.answers_found, 4);
  }

  #[test]
  fn fewer_questions_than_requested_is_flagged() {
    let report = validate(&GenerationResult::new(well_formed("Go", 8), 10), &policy());
    assert_eq!(report.issues, vec!["Expected 10 questions, found 8".to_string()]);
    assert!(report.score < 1.0);
    assert!(report.passed);
  }

  #[test]
  fn overshoot_is_penalised_too() {
    let report = validate(&GenerationResult::new(well_formed("Go", 12), 10), &policy());
    assert!(report.score < 1.0);
    assert!(report.issues[0].contains("more than requested"));
  }

  #[test]
  fn short_answers_are_issues_not_failures() {
    let text = "## Question 1\n**Question:** Q?\n**Answer:** Yes.\n\n## Question 2\n**Question:** Q?\n**Answer:** A sufficiently long answer that clears the minimum length.\n";
    let report = validate(&GenerationResult::new(text, 2), &policy());
    assert_eq!(report.checks.short_answers, 1);
    assert_eq!(report.issues, vec!["1 answer shorter than 40 characters: 1".to_string()]);
    assert!(report.passed);
  }

  #[test]
  fn only_headings_fail() {
    let text = (1..=5).map(|i| format!("## Question {i}\nSomething?\n")).collect::<String>();
    let report = validate(&GenerationResult::new(text, 5), &policy());
    assert!(!report.passed);
    assert!(report.score < policy().pass_threshold);
    assert_eq!(report.issues, vec!["5 questions without an answer: 1, 2, 3, 4, 5".to_string()]);
  }

  #[test]
  fn marker_variants_are_recognised() {
    let text = "##Question 1\n**Answer**: this one uses the colon outside the bold markers.\n  ## question 2\n**answer:** lower case markers are still recognised here.\n";
    let report = validate(&GenerationResult::new(text, 2), &policy());
    assert_eq!(report.checks.questions_found, 2);
    assert_eq!(report.checks.answers_found, 2);
    assert_eq!(report.score, 1.0);
  }

  #[test]
  fn long_number_lists_are_truncated() {
    let numbers: Vec<usize> = (1..=12).collect();
    assert_eq!(list_numbers(&numbers), "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, …");
  }

  #[test]
  fn custom_weights_change_the_score() {
    let text = (1..=4).map(|i| format!("## Question {i}\nSomething?\n")).collect::<String>();
    let count_only = ScoringPolicy { pairing_weight: 0.0, length_weight: 0.0, ..policy() };
    let report = validate(&GenerationResult::new(text, 4), &count_only);
    assert_eq!(report.score, 1.0);
  }

  #[test]
  fn content_signals_follow_keywords() {
    let req = GenerationRequest::new("Python Programming", QuestionType::Code, Difficulty::Easy, 3, &RequestLimits::default())
      .unwrap();
    let text = "Basic Python: what is a function? Define a simple program, an introduction to code, syntax and script and algorithm.";
    let signals = assess_content(text, &req);
    assert_eq!(signals.topic_keywords_found, 1);
    assert!(signals.topic_relevant);
    assert!(signals.difficulty_appropriate);
    assert!(signals.type_compliant);
    assert!(signals.warnings.is_empty(), "{:?}", signals.warnings);
  }

  #[test]
  fn content_signals_warn_on_missing_keywords() {
    let req = GenerationRequest::new("Quantum Chemistry Basics", QuestionType::Theoretical, Difficulty::Hard, 3, &RequestLimits::default())
      .unwrap();
    let signals = assess_content("Nothing relevant here.", &req);
    assert!(!signals.topic_relevant);
    assert!(!signals.difficulty_appropriate);
    assert!(!signals.type_compliant);
    assert_eq!(signals.warnings.len(), 3);
  }

  #[test]
  fn mixed_difficulty_skips_indicator_check() {
    let req = GenerationRequest::new("Rust", QuestionType::Code, Difficulty::Mixed, 3, &RequestLimits::default()).unwrap();
    let signals = assess_content("```a```\n```b```\n```c``` rust", &req);
    assert_eq!(signals.difficulty_indicators, None);
    assert!(signals.difficulty_appropriate);
    assert!(signals.type_compliant);
  }

  #[test]
  fn recommendations_track_failed_checks() {
    let text = "## Question 1\n**Answer:** ok\n## Question 2\n";
    let report = validate(&GenerationResult::new(text, 4), &policy());
    let signals = ContentSignals { topic_relevant: true, ..Default::default() };
    let recs = recommendations(&report, Some(&signals));
    assert_eq!(recs.len(), 3);

    let perfect = validate(&GenerationResult::new(well_formed("Rust", 2), 2), &policy());
    assert!(recommendations(&perfect, Some(&signals)).is_empty());
  }

  #[test]
  fn structural_recommendations_need_no_signals() {
    let text = "## Question 1\n**Answer:** ok\n## Question 2\n";
    let report = validate(&GenerationResult::new(text, 4), &policy());
    let recs = recommendations(&report, None);
    assert_eq!(
      recs,
      vec![
        "Consider regenerating to get the correct number of questions".to_string(),
        "Ensure all questions have detailed answers".to_string(),
        "Request more detailed answers with examples".to_string(),
      ]
    );
  }

  fn answers_of(words: usize) -> String {
    let answer = vec!["word"; words].join(" ");
    (1..=2).map(|i| format!("## Question {i}\n**Answer:** {answer}\n")).collect()
  }

  #[test]
  fn brief_answers_are_flagged_below_thirty_words() {
    let req = GenerationRequest::new("word", QuestionType::Theoretical, Difficulty::Mixed, 2, &RequestLimits::default())
      .unwrap();

    let signals = assess_content(&answers_of(29), &req);
    assert!(!signals.answers_detailed);
    assert!(signals.warnings.contains(&"Answers may be too brief (avg: 29 words)".to_string()));

    let signals = assess_content(&answers_of(30), &req);
    assert!(signals.answers_detailed);
    assert!(!signals.warnings.iter().any(|w| w.starts_with("Answers may be too brief")));
  }

  #[test]
  fn brief_answers_add_a_recommendation() {
    let report = ValidationReport {
      passed: true,
      score: 0.8,
      grade: Grade::Good,
      issues: Vec::new(),
      checks: StructuralChecks { expected_questions: 2, questions_found: 2, answers_found: 2, ..Default::default() },
    };
    let brief = ContentSignals { topic_relevant: true, answers_detailed: false, ..Default::default() };
    let detailed = ContentSignals { answers_detailed: true, ..brief.clone() };
    assert_eq!(recommendations(&report, Some(&brief)), vec!["Request more detailed answers with examples".to_string()]);
    assert!(recommendations(&report, Some(&detailed)).is_empty());
  }
}
