//! Edit state for one answer-editing session.
//!
//! `EditSession` owns the loaded quiz exclusively, together with the edited-set,
//! the current question index and the session phase. Callers pass it around
//! explicitly; nothing here is shared between sessions.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::{Question, QuestionKind, Quiz};

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Loading,
    Ready,
    /// Same as `Ready`, but a field currently has focus.
    Editing,
    Saving,
    /// Terminal: answers persisted, the session is about to be dropped.
    Saved,
}

impl SessionPhase {
    /// Phases in which the user may interact with the form.
    pub fn is_interactive(self) -> bool {
        matches!(self, SessionPhase::Ready | SessionPhase::Editing)
    }
}

#[derive(Debug)]
pub struct EditSession {
    quiz: Option<Quiz>,
    edited: BTreeSet<String>,
    current: usize,
    phase: SessionPhase,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSession {
    pub fn new() -> Self {
        Self {
            quiz: None,
            edited: BTreeSet::new(),
            current: 0,
            phase: SessionPhase::Loading,
        }
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn edited(&self) -> &BTreeSet<String> {
        &self.edited
    }

    pub fn is_edited(&self, question_id: &str) -> bool {
        self.edited.contains(question_id)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.as_ref().and_then(|q| q.questions.get(self.current))
    }

    /// Replace the held quiz and start over: edited-set cleared, first question selected.
    #[instrument(level = "debug", skip(self, quiz), fields(quiz_id = %quiz.id, questions = quiz.questions.len()))]
    pub fn load(&mut self, quiz: Quiz) {
        self.quiz = Some(quiz);
        self.edited.clear();
        self.current = 0;
        self.phase = SessionPhase::Ready;
    }

    /// Replace one question's student answer. No-op when nothing is loaded or the id is unknown.
    #[instrument(level = "debug", skip(self, answer), fields(answer_len = answer.len()))]
    pub fn set_answer(&mut self, question_id: &str, answer: &str) -> bool {
        let Some(question) = self.quiz.as_mut().and_then(|q| q.question_mut(question_id)) else {
            debug!(target: "editor", %question_id, "set_answer ignored: no such question");
            return false;
        };
        question.student_answer = Some(answer.to_string());
        self.edited.insert(question_id.to_string());
        true
    }

    /// Rewrite one multiple-choice option in place.
    ///
    /// The stored student answer is left alone even if it matched the old text.
    #[instrument(level = "debug", skip(self, text), fields(text_len = text.len()))]
    pub fn set_option(&mut self, question_id: &str, index: usize, text: &str) -> bool {
        let Some(question) = self.quiz.as_mut().and_then(|q| q.question_mut(question_id)) else {
            return false;
        };
        match &mut question.kind {
            QuestionKind::MultipleChoice { options } if index < options.len() => {
                options[index] = text.to_string();
            }
            _ => {
                debug!(target: "editor", %question_id, index, "set_option ignored: not an editable option");
                return false;
            }
        }
        self.edited.insert(question_id.to_string());
        true
    }

    /// False before load; vacuously true for a quiz with no questions.
    pub fn all_questions_answered(&self) -> bool {
        match &self.quiz {
            Some(quiz) => quiz.questions.iter().all(Question::is_answered),
            None => false,
        }
    }

    /// Ids of questions that still block saving, in quiz order.
    pub fn unanswered(&self) -> Vec<String> {
        self.quiz
            .iter()
            .flat_map(|q| q.questions.iter())
            .filter(|q| !q.is_answered())
            .map(|q| q.id.clone())
            .collect()
    }

    // --- navigation ---

    pub fn question_count(&self) -> usize {
        self.quiz.as_ref().map_or(0, |q| q.questions.len())
    }

    /// Jump to a question; the index is clamped to the question range.
    pub fn select(&mut self, index: usize) -> usize {
        let last = self.question_count().saturating_sub(1);
        self.current = index.min(last);
        self.current
    }

    pub fn previous(&mut self) -> usize {
        self.select(self.current.saturating_sub(1))
    }

    pub fn next(&mut self) -> usize {
        self.select(self.current.saturating_add(1))
    }

    pub fn can_go_previous(&self) -> bool {
        self.current > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.current + 1 < self.question_count()
    }

    // --- phase ---

    pub fn focus(&mut self) {
        if self.phase == SessionPhase::Ready {
            self.phase = SessionPhase::Editing;
        }
    }

    pub fn blur(&mut self) {
        if self.phase == SessionPhase::Editing {
            self.phase = SessionPhase::Ready;
        }
    }

    pub(crate) fn set_phase(&mut self, phase: SessionPhase) {
        debug!(target: "editor", from = ?self.phase, to = ?phase, "Session phase change");
        self.phase = phase;
    }
}
