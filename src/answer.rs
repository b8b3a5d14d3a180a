//! Answer editor: per-type input affordances and the rules that route user input
//! into the edit store.
//!
//! The store itself is permissive (`set_answer` takes any string). This module is
//! the gate that refuses values a question's type can never hold.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{Question, QuestionKind, FALSE_LITERAL, TRUE_LITERAL};
use crate::session::EditSession;
use crate::util::capitalize_sentences;

pub const UNANSWERED_WARNING: &str = "This question must be answered before saving.";

/// One row of a multiple-choice option list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionRow {
  pub index: usize,
  /// "A", "B", ...
  pub letter: String,
  pub text: String,
  pub selected: bool,
}

/// The input control a question type calls for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Affordance {
  OptionList { options: Vec<OptionRow> },
  BinarySelector { value: Option<String> },
  SingleLine { numeric: bool, value: String },
  MultiLine { value: String },
}

/// Everything needed to render the editor card for one question.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerEditorView {
  pub question_id: String,
  pub number: u32,
  pub text: String,
  pub type_label: String,
  pub points: f64,
  pub edited: bool,
  pub answered: bool,
  pub warning: Option<&'static str>,
  pub affordance: Affordance,
}

impl AnswerEditorView {
  pub fn for_question(question: &Question, edited: bool) -> Self {
    let answer = question.student_answer.clone();
    let affordance = match &question.kind {
      QuestionKind::MultipleChoice { options } => Affordance::OptionList {
        options: options
          .iter()
          .enumerate()
          .map(|(index, text)| OptionRow {
            index,
            letter: option_letter(index),
            text: text.clone(),
            selected: answer.as_deref() == Some(text.as_str()),
          })
          .collect(),
      },
      QuestionKind::TrueFalse => Affordance::BinarySelector { value: answer },
      QuestionKind::ShortText => Affordance::SingleLine { numeric: false, value: answer.unwrap_or_default() },
      QuestionKind::Numerical => Affordance::SingleLine { numeric: true, value: answer.unwrap_or_default() },
      QuestionKind::LongText => Affordance::MultiLine { value: answer.unwrap_or_default() },
    };
    let answered = question.is_answered();
    Self {
      question_id: question.id.clone(),
      number: question.number,
      text: capitalize_sentences(&question.text),
      type_label: question.kind.label(),
      points: question.points,
      edited,
      answered,
      warning: (!answered).then_some(UNANSWERED_WARNING),
      affordance,
    }
  }
}

/// Letters past "Z" keep counting ("AA", "AB", ...) rather than running into punctuation.
fn option_letter(index: usize) -> String {
  let mut n = index;
  let mut letters = Vec::new();
  loop {
    letters.push((b'A' + (n % 26) as u8) as char);
    if n < 26 { break; }
    n = n / 26 - 1;
  }
  letters.iter().rev().collect()
}

/// User input aimed at one question.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AnswerInput {
  /// Mark option `index` as the chosen answer.
  SelectOption { index: usize },
  /// Rewrite the text of option `index`.
  EditOption { index: usize, text: String },
  /// True/false selector.
  Choose { value: String },
  /// Free text or number entry.
  Text { value: String },
}

/// Why an input was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRejected {
  NoQuiz,
  UnknownQuestion(String),
  /// The input kind does not apply to this question type.
  WrongAffordance { question_type: &'static str },
  OptionOutOfRange { index: usize, len: usize },
  NotTrueFalse(String),
  NotNumeric(String),
}

impl fmt::Display for InputRejected {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      InputRejected::NoQuiz => write!(f, "no quiz is loaded"),
      InputRejected::UnknownQuestion(id) => write!(f, "unknown question: {}", id),
      InputRejected::WrongAffordance { question_type } => write!(f, "input does not apply to {} questions", question_type),
      InputRejected::OptionOutOfRange { index, len } => write!(f, "option {} out of range (question has {})", index, len),
      InputRejected::NotTrueFalse(v) => write!(f, "expected \"True\" or \"False\", got {:?}", v),
      InputRejected::NotNumeric(v) => write!(f, "expected a number, got {:?}", v),
    }
  }
}

impl std::error::Error for InputRejected {}

/// Numeric entry: empty (cleared) or a finite number. Expects a trimmed value.
fn is_numeric_entry(value: &str) -> bool {
  value.is_empty() || value.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

/// Validate `input` against the question's type and apply it to the store.
#[instrument(level = "debug", skip(session, input), fields(%question_id))]
pub fn apply_input(session: &mut EditSession, question_id: &str, input: AnswerInput) -> Result<(), InputRejected> {
  let kind = session
    .quiz()
    .ok_or(InputRejected::NoQuiz)?
    .question(question_id)
    .map(|q| q.kind.clone())
    .ok_or_else(|| InputRejected::UnknownQuestion(question_id.to_string()))?;
  let question_type = kind.wire_name();

  match (&kind, input) {
    (QuestionKind::MultipleChoice { options }, AnswerInput::SelectOption { index }) => {
      let text = options
        .get(index)
        .cloned()
        .ok_or(InputRejected::OptionOutOfRange { index, len: options.len() })?;
      session.set_answer(question_id, &text);
    }
    (QuestionKind::MultipleChoice { options }, AnswerInput::EditOption { index, text }) => {
      if index >= options.len() {
        return Err(InputRejected::OptionOutOfRange { index, len: options.len() });
      }
      session.set_option(question_id, index, &text);
    }
    (QuestionKind::TrueFalse, AnswerInput::Choose { value }) => {
      if value != TRUE_LITERAL && value != FALSE_LITERAL {
        return Err(InputRejected::NotTrueFalse(value));
      }
      session.set_answer(question_id, &value);
    }
    (QuestionKind::Numerical, AnswerInput::Text { value }) => {
      // Stored trimmed, so padding never counts as an answer.
      let entry = value.trim();
      if !is_numeric_entry(entry) {
        return Err(InputRejected::NotNumeric(value));
      }
      session.set_answer(question_id, entry);
    }
    (QuestionKind::ShortText | QuestionKind::LongText, AnswerInput::Text { value }) => {
      session.set_answer(question_id, &value);
    }
    (_, other) => {
      debug!(target: "editor", question_type, input = ?other, "Input does not match question type");
      return Err(InputRejected::WrongAffordance { question_type });
    }
  }
  Ok(())
}
