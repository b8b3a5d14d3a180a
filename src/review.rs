//! Review step for quiz authoring: checks a draft against its declared totals
//! and lays out the summary shown before submission.

use serde::{Deserialize, Serialize};

pub const NOT_SPECIFIED: &str = "Not specified";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDraft {
  pub title: String,
  #[serde(default)] pub category: Option<String>,
  #[serde(default)] pub grades: Option<String>,
  #[serde(default)] pub subject: Option<String>,
  pub total_questions: usize,
  pub total_marks: f64,
  #[serde(default)] pub start_date_time: Option<String>,
  #[serde(default)] pub end_date_time: Option<String>,
  #[serde(default)] pub questions: Vec<DraftQuestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DraftKind {
  MultipleChoice,
  TrueFalse,
  ShortText,
  LongText,
  Numerical,
}

impl DraftKind {
  fn label(self) -> &'static str {
    match self {
      DraftKind::MultipleChoice => "multiple choice",
      DraftKind::TrueFalse => "true false",
      DraftKind::ShortText => "short text",
      DraftKind::LongText => "long text",
      DraftKind::Numerical => "numerical",
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftQuestion {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: DraftKind,
  pub text: String,
  pub marks: f64,
  #[serde(default)] pub options: Option<Vec<DraftOption>>,
  #[serde(default)] pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOption {
  pub id: String,
  pub text: String,
  #[serde(default)] pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoField {
  pub label: &'static str,
  pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewedOption {
  pub id: String,
  pub text: String,
  pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewedQuestion {
  pub id: String,
  pub heading: String,
  pub type_label: &'static str,
  pub marks_label: String,
  pub text: String,
  pub options: Vec<ReviewedOption>,
  /// Only for questions without options.
  pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewReport {
  pub valid: bool,
  pub headline: &'static str,
  pub question_badge: String,
  pub allocated_marks: f64,
  pub problems: Vec<String>,
  pub info: Vec<InfoField>,
  pub questions: Vec<ReviewedQuestion>,
  pub empty_note: Option<&'static str>,
}

fn or_not_specified(v: Option<&str>) -> String {
  match v {
    Some(s) if !s.trim().is_empty() => s.to_string(),
    _ => NOT_SPECIFIED.to_string(),
  }
}

/// Date-time pickers send `YYYY-MM-DDTHH:MM[:SS[.fff]][Z]`; show it as
/// `YYYY-MM-DD HH:MM`. Anything else is shown as entered.
fn display_date_time(v: Option<&str>) -> String {
  let raw = or_not_specified(v);
  let Some((date, time)) = raw.trim().split_once('T') else { return raw };
  let well_formed = date.len() == 10
    && time.len() >= 5
    && date.bytes().enumerate().all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() })
    && time.bytes().take(5).enumerate().all(|(i, b)| if i == 2 { b == b':' } else { b.is_ascii_digit() });
  if well_formed { format!("{} {}", date, &time[..5]) } else { raw }
}

/// Marks are entered by hand; anything closer than this counts as equal.
const MARKS_EPSILON: f64 = 1e-9;

pub fn review(draft: &QuizDraft) -> ReviewReport {
  let allocated: f64 = draft.questions.iter().map(|q| q.marks).sum();
  let count_ok = draft.questions.len() == draft.total_questions;
  let marks_ok = (allocated - draft.total_marks).abs() < MARKS_EPSILON;

  let mut problems = Vec::new();
  if !count_ok {
    problems.push(format!(
      "You have {} questions but specified {}",
      draft.questions.len(),
      draft.total_questions
    ));
  }
  if !marks_ok {
    problems.push(format!("Total marks allocated: {} (Expected: {})", allocated, draft.total_marks));
  }
  let valid = problems.is_empty();

  let info = vec![
    InfoField { label: "Title", value: or_not_specified(Some(&draft.title)) },
    InfoField { label: "Category", value: or_not_specified(draft.category.as_deref()) },
    InfoField { label: "Grade", value: or_not_specified(draft.grades.as_deref()) },
    InfoField { label: "Subject", value: or_not_specified(draft.subject.as_deref()) },
    InfoField { label: "Total Questions", value: draft.total_questions.to_string() },
    InfoField { label: "Total Marks", value: draft.total_marks.to_string() },
    InfoField { label: "Start Date/Time", value: display_date_time(draft.start_date_time.as_deref()) },
    InfoField { label: "End Date/Time", value: display_date_time(draft.end_date_time.as_deref()) },
  ];

  let questions = draft
    .questions
    .iter()
    .enumerate()
    .map(|(i, q)| ReviewedQuestion {
      id: q.id.clone(),
      heading: format!("Question {}", i + 1),
      type_label: q.kind.label(),
      marks_label: format!("{} marks", q.marks),
      text: q.text.clone(),
      options: q
        .options
        .iter()
        .flatten()
        .map(|o| ReviewedOption { id: o.id.clone(), text: o.text.clone(), correct: o.is_correct })
        .collect(),
      correct_answer: if q.options.is_none() { q.correct_answer.clone() } else { None },
    })
    .collect::<Vec<_>>();

  ReviewReport {
    valid,
    headline: if valid { "Quiz Ready for Submission" } else { "Please Review" },
    question_badge: format!("{}/{} Questions", draft.questions.len(), draft.total_questions),
    allocated_marks: allocated,
    problems,
    info,
    empty_note: questions.is_empty().then_some("No questions added yet."),
    questions,
  }
}
