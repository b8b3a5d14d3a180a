//! Save coordinator: gate, serialize and report one save of the edited answers.
//!
//! The save is split into `begin` (checks + `Saving`) and `finish` (apply the
//! collaborator's verdict) so a server can release its session lock while the
//! request is in flight.

use std::fmt;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::backend::{BackendError, SaveRequest};
use crate::protocol::Notice;
use crate::session::{EditSession, SessionPhase};

/// Why the save action is unavailable. Not an error: the UI shows it as a disabled button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveBlocked {
  NotLoaded,
  /// Ids of questions that fail the answered predicate.
  Unanswered(Vec<String>),
  /// A save is running, or the session already saved.
  Busy(SessionPhase),
}

impl fmt::Display for SaveBlocked {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SaveBlocked::NotLoaded => write!(f, "no quiz is loaded"),
      SaveBlocked::Unanswered(ids) => write!(f, "{} question(s) still unanswered", ids.len()),
      SaveBlocked::Busy(phase) => write!(f, "cannot save while {:?}", phase),
    }
  }
}

impl std::error::Error for SaveBlocked {}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
  /// Answers persisted; the session ends after `redirect_after`.
  Saved { redirect_after: Duration, notice: Notice },
  /// Nothing persisted; the session is back in `Ready` with the quiz untouched.
  Failed { notice: Notice },
}

#[derive(Debug, Clone)]
pub struct SaveCoordinator {
  redirect_after: Duration,
}

impl SaveCoordinator {
  pub fn new(redirect_after: Duration) -> Self {
    Self { redirect_after }
  }

  /// Check preconditions, enter `Saving` and build the request.
  pub fn begin(&self, session: &mut EditSession, identity: &str) -> Result<SaveRequest, SaveBlocked> {
    if !session.phase().is_interactive() {
      return Err(match session.phase() {
        SessionPhase::Loading => SaveBlocked::NotLoaded,
        other => SaveBlocked::Busy(other),
      });
    }
    let quiz = session.quiz().ok_or(SaveBlocked::NotLoaded)?;
    let unanswered = session.unanswered();
    if !unanswered.is_empty() {
      return Err(SaveBlocked::Unanswered(unanswered));
    }
    let request = SaveRequest::for_quiz(quiz, identity);
    session.set_phase(SessionPhase::Saving);
    Ok(request)
  }

  /// Apply the collaborator's answer to a session that is `Saving`.
  pub fn finish(&self, session: &mut EditSession, result: Result<(), BackendError>) -> SaveOutcome {
    match result {
      Ok(()) => {
        session.set_phase(SessionPhase::Saved);
        info!(target: "editor", redirect_ms = self.redirect_after.as_millis() as u64, "Quiz answers saved");
        SaveOutcome::Saved { redirect_after: self.redirect_after, notice: Notice::answers_updated() }
      }
      Err(e) => {
        match &e {
          BackendError::Status { code, .. } => warn!(target: "editor", status = code, "Save failed: collaborator refused"),
          BackendError::Transport(cause) => warn!(target: "editor", %cause, "Save failed: collaborator unreachable"),
          BackendError::Decode(cause) => error!(target: "editor", %cause, "Save failed: unexpected collaborator response"),
        }
        // SaveFailed is transient: the user is back in the form straight away.
        session.set_phase(SessionPhase::Ready);
        SaveOutcome::Failed { notice: Notice::save_failed() }
      }
    }
  }

  /// Full save against `backend`, holding the session throughout. The backend is
  /// never called when blocked.
  #[cfg(test)]
  #[tracing::instrument(level = "info", skip_all, fields(quiz_id = session.quiz().map(|q| q.id.as_str()).unwrap_or("")))]
  pub async fn save<B: crate::backend::QuizBackend>(
    &self,
    session: &mut EditSession,
    backend: &B,
    identity: &str,
  ) -> Result<SaveOutcome, SaveBlocked> {
    let request = self.begin(session, identity)?;
    let result = backend.save_answers(&request).await;
    Ok(self.finish(session, result))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;
  use crate::backend::QuizBackend;
  use crate::domain::fixtures::*;
  use crate::domain::Quiz;

  /// Records save calls and answers with a canned result.
  struct ScriptedBackend {
    result: Result<(), BackendError>,
    calls: Mutex<Vec<SaveRequest>>,
  }

  impl ScriptedBackend {
    fn new(result: Result<(), BackendError>) -> Self {
      Self { result, calls: Mutex::new(Vec::new()) }
    }
  }

  impl QuizBackend for ScriptedBackend {
    async fn load_attempt(&self, _quiz_id: &str) -> Result<Option<Quiz>, BackendError> {
      Ok(None)
    }

    async fn save_answers(&self, request: &SaveRequest) -> Result<(), BackendError> {
      self.calls.lock().unwrap().push(request.clone());
      self.result.clone()
    }
  }

  fn answered_session() -> EditSession {
    let mut s = EditSession::new();
    s.load(two_question_quiz());
    s.set_answer("q1", "A");
    s.set_answer("q2", "True");
    s
  }

  fn coordinator() -> SaveCoordinator {
    SaveCoordinator::new(Duration::from_secs(1))
  }

  #[tokio::test]
  async fn blocked_save_never_reaches_backend() {
    let backend = ScriptedBackend::new(Ok(()));
    let mut s = EditSession::new();
    s.load(two_question_quiz());
    s.set_answer("q1", "A");

    let err = coordinator().save(&mut s, &backend, "student").await.unwrap_err();
    assert_eq!(err, SaveBlocked::Unanswered(vec!["q2".into()]));
    assert!(backend.calls.lock().unwrap().is_empty());
    assert_eq!(s.phase(), SessionPhase::Ready);
  }

  #[tokio::test]
  async fn not_loaded_is_blocked() {
    let backend = ScriptedBackend::new(Ok(()));
    let mut s = EditSession::new();
    let err = coordinator().save(&mut s, &backend, "student").await.unwrap_err();
    assert_eq!(err, SaveBlocked::NotLoaded);
  }

  #[tokio::test]
  async fn success_sends_full_quiz_and_ends_session() {
    let backend = ScriptedBackend::new(Ok(()));
    let mut s = answered_session();
    let outcome = coordinator().save(&mut s, &backend, "roll-4").await.unwrap();

    assert_eq!(
      outcome,
      SaveOutcome::Saved { redirect_after: Duration::from_secs(1), notice: Notice::answers_updated() }
    );
    assert_eq!(s.phase(), SessionPhase::Saved);
    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].identity, "roll-4");
    assert_eq!(calls[0].attempt_id.as_deref(), Some("attempt-9"));
    assert_eq!(calls[0].questions, s.quiz().unwrap().questions);
  }

  #[tokio::test]
  async fn non_success_status_returns_to_ready_untouched() {
    let backend = ScriptedBackend::new(Err(BackendError::Status { code: 503, body: String::new() }));
    let mut s = answered_session();
    let before = s.quiz().cloned();

    let outcome = coordinator().save(&mut s, &backend, "student").await.unwrap();
    assert_eq!(outcome, SaveOutcome::Failed { notice: Notice::save_failed() });
    assert_eq!(s.phase(), SessionPhase::Ready);
    assert_eq!(s.quiz().cloned(), before);
    assert_eq!(s.edited().len(), 2);
  }

  #[tokio::test]
  async fn transport_and_decode_failures_look_the_same_to_the_user() {
    for err in [BackendError::Transport("refused".into()), BackendError::Decode("eof".into())] {
      let backend = ScriptedBackend::new(Err(err));
      let mut s = answered_session();
      let outcome = coordinator().save(&mut s, &backend, "student").await.unwrap();
      assert_eq!(outcome, SaveOutcome::Failed { notice: Notice::save_failed() });
    }
  }

  #[tokio::test]
  async fn empty_quiz_can_be_saved() {
    let backend = ScriptedBackend::new(Ok(()));
    let mut s = EditSession::new();
    s.load(quiz(vec![]));
    let outcome = coordinator().save(&mut s, &backend, "student").await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { .. }));
  }

  #[test]
  fn begin_twice_is_busy() {
    let c = coordinator();
    let mut s = answered_session();
    c.begin(&mut s, "student").unwrap();
    assert_eq!(c.begin(&mut s, "student").unwrap_err(), SaveBlocked::Busy(SessionPhase::Saving));
  }

  #[test]
  fn saving_from_editing_is_allowed() {
    let c = coordinator();
    let mut s = answered_session();
    s.focus();
    assert!(c.begin(&mut s, "student").is_ok());
    assert_eq!(s.phase(), SessionPhase::Saving);
  }
}
