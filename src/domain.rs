//! Domain models for answer editing: quiz, question, and the per-type question kind.
//!
//! The collaborator speaks camelCase JSON with a `questionType` string and an
//! optional `options` array; internally the type is a sum type so that options
//! only exist where they mean something.

use serde::{Deserialize, Serialize};

/// Literal accepted as a TRUE_FALSE answer.
pub const TRUE_LITERAL: &str = "True";
/// Literal accepted as a TRUE_FALSE answer.
pub const FALSE_LITERAL: &str = "False";

/// One quiz attempt as loaded from the collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
  pub id: String,
  pub title: String,
  #[serde(default)] pub time_limit: u32,
  pub questions: Vec<Question>,
  #[serde(default)] pub category: String,
  #[serde(default)] pub grade: String,
  #[serde(default)] pub subject: String,
  #[serde(default)] pub total_marks: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub attempt_id: Option<String>,
}

impl Quiz {
  pub fn question(&self, id: &str) -> Option<&Question> {
    self.questions.iter().find(|q| q.id == id)
  }

  pub fn question_mut(&mut self, id: &str) -> Option<&mut Question> {
    self.questions.iter_mut().find(|q| q.id == id)
  }
}

/// What kind of answer a question takes.
#[derive(Clone, Debug, PartialEq)]
pub enum QuestionKind {
  /// Pick exactly one of the option texts.
  MultipleChoice { options: Vec<String> },
  TrueFalse,
  ShortText,
  LongText,
  /// Single-line entry restricted to numbers.
  Numerical,
}

impl QuestionKind {
  /// The collaborator's `questionType` tag.
  pub fn wire_name(&self) -> &'static str {
    match self {
      QuestionKind::MultipleChoice { .. } => "MULTIPLE_CHOICE",
      QuestionKind::TrueFalse => "TRUE_FALSE",
      QuestionKind::ShortText => "SHORT_TEXT",
      QuestionKind::LongText => "LONG_TEXT",
      QuestionKind::Numerical => "NUMERICAL",
    }
  }

  /// Human label shown on the editor badge, e.g. "MULTIPLE CHOICE".
  pub fn label(&self) -> String {
    self.wire_name().replacen('_', " ", 1)
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "QuestionWire", into = "QuestionWire")]
pub struct Question {
  pub id: String,
  pub number: u32,
  pub text: String,
  pub kind: QuestionKind,
  pub points: f64,
  pub correct_answer: Option<String>,
  pub student_answer: Option<String>,
}

impl Question {
  /// Whether the current student answer counts as complete for this question's type.
  pub fn is_answered(&self) -> bool {
    let answer = match self.student_answer.as_deref() {
      Some(a) if !a.is_empty() => a,
      _ => return false,
    };
    match &self.kind {
      QuestionKind::MultipleChoice { options } => options.iter().any(|o| o == answer),
      QuestionKind::TrueFalse => answer == TRUE_LITERAL || answer == FALSE_LITERAL,
      QuestionKind::ShortText | QuestionKind::LongText | QuestionKind::Numerical => true,
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum QuestionTypeTag {
  MultipleChoice,
  TrueFalse,
  ShortText,
  LongText,
  Numerical,
}

/// Collaborator JSON shape for a question.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionWire {
  id: String,
  question_number: u32,
  question_text: String,
  question_type: QuestionTypeTag,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  options: Option<Vec<String>>,
  #[serde(default)]
  points: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  correct_answer: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  student_answer: Option<String>,
}

impl From<QuestionWire> for Question {
  fn from(w: QuestionWire) -> Self {
    let kind = match w.question_type {
      QuestionTypeTag::MultipleChoice => QuestionKind::MultipleChoice { options: w.options.unwrap_or_default() },
      QuestionTypeTag::TrueFalse => QuestionKind::TrueFalse,
      QuestionTypeTag::ShortText => QuestionKind::ShortText,
      QuestionTypeTag::LongText => QuestionKind::LongText,
      QuestionTypeTag::Numerical => QuestionKind::Numerical,
    };
    Question {
      id: w.id,
      number: w.question_number,
      text: w.question_text,
      kind,
      points: w.points,
      correct_answer: w.correct_answer,
      student_answer: w.student_answer,
    }
  }
}

impl From<Question> for QuestionWire {
  fn from(q: Question) -> Self {
    let (question_type, options) = match q.kind {
      QuestionKind::MultipleChoice { options } => (QuestionTypeTag::MultipleChoice, Some(options)),
      QuestionKind::TrueFalse => (QuestionTypeTag::TrueFalse, None),
      QuestionKind::ShortText => (QuestionTypeTag::ShortText, None),
      QuestionKind::LongText => (QuestionTypeTag::LongText, None),
      QuestionKind::Numerical => (QuestionTypeTag::Numerical, None),
    };
    QuestionWire {
      id: q.id,
      question_number: q.number,
      question_text: q.text,
      question_type,
      options,
      points: q.points,
      correct_answer: q.correct_answer,
      student_answer: q.student_answer,
    }
  }
}

#[cfg(test)]
pub(crate) mod fixtures {
  use super::*;

  pub fn question(id: &str, number: u32, kind: QuestionKind) -> Question {
    Question {
      id: id.into(),
      number,
      text: format!("question {number}. answer it."),
      kind,
      points: 1.0,
      correct_answer: None,
      student_answer: None,
    }
  }

  pub fn multiple_choice(id: &str, number: u32, options: &[&str]) -> Question {
    question(id, number, QuestionKind::MultipleChoice { options: options.iter().map(|s| s.to_string()).collect() })
  }

  pub fn quiz(questions: Vec<Question>) -> Quiz {
    Quiz {
      id: "quiz-1".into(),
      title: "weekly check. chapter two".into(),
      time_limit: 30,
      questions,
      category: "Assessment".into(),
      grade: "Grade 7".into(),
      subject: "Science".into(),
      total_marks: 2.0,
      attempt_id: Some("attempt-9".into()),
    }
  }

  /// MULTIPLE_CHOICE ["A","B"] followed by TRUE_FALSE, both unanswered.
  pub fn two_question_quiz() -> Quiz {
    quiz(vec![
      multiple_choice("q1", 1, &["A", "B"]),
      question("q2", 2, QuestionKind::TrueFalse),
    ])
  }
}
