//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Opening a session (load the attempt from the collaborator)
//!   - Routing answer input, navigation and focus into a session
//!   - Saving (lock released while the collaborator is called)
//!   - Closing a session

use std::fmt;

use tracing::{error, info, instrument, warn};

use crate::answer::{apply_input, AnswerInput, InputRejected};
use crate::backend::{BackendError, QuizBackend};
use crate::protocol::{session_view, Notice, SelectIn, SessionView, Step};
use crate::save::{SaveBlocked, SaveOutcome};
use crate::session::{EditSession, SessionPhase};
use crate::state::{AppState, SessionEntry};

#[derive(Debug)]
pub enum ApiError {
  SessionNotFound(String),
  QuizNotFound(String),
  /// Loading failed for a reason other than absence; shown to the user as not-found.
  LoadFailed(BackendError),
  Rejected(InputRejected),
  Blocked(SaveBlocked),
  /// The session is saving or saved and no longer accepts edits.
  Locked(SessionPhase),
}

impl ApiError {
  /// User-facing notice, when the error warrants one.
  pub fn notice(&self) -> Option<Notice> {
    match self {
      ApiError::QuizNotFound(_) | ApiError::LoadFailed(_) => Some(Notice::quiz_not_found()),
      _ => None,
    }
  }

  pub fn unanswered(&self) -> Vec<String> {
    match self {
      ApiError::Blocked(SaveBlocked::Unanswered(ids)) => ids.clone(),
      _ => Vec::new(),
    }
  }
}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ApiError::SessionNotFound(id) => write!(f, "unknown session: {}", id),
      ApiError::QuizNotFound(id) => write!(f, "quiz not found: {}", id),
      ApiError::LoadFailed(e) => write!(f, "quiz could not be loaded: {}", e),
      ApiError::Rejected(e) => write!(f, "input rejected: {}", e),
      ApiError::Blocked(e) => write!(f, "save unavailable: {}", e),
      ApiError::Locked(phase) => write!(f, "session does not accept edits while {:?}", phase),
    }
  }
}

impl std::error::Error for ApiError {}

impl From<InputRejected> for ApiError {
  fn from(e: InputRejected) -> Self { ApiError::Rejected(e) }
}

impl From<SaveBlocked> for ApiError {
  fn from(e: SaveBlocked) -> Self { ApiError::Blocked(e) }
}

/// Result of a save request as seen by the surfaces.
#[derive(Debug)]
pub enum SaveReply {
  Saved { notice: Notice, redirect_after_ms: u64 },
  Failed { notice: Notice, view: SessionView },
}

fn ensure_editable(s: &EditSession) -> Result<(), ApiError> {
  if s.phase().is_interactive() { Ok(()) } else { Err(ApiError::Locked(s.phase())) }
}

/// Load the attempt and register a new session for it.
#[instrument(level = "info", skip(state, username), fields(%quiz_id))]
pub async fn open_session(state: &AppState, quiz_id: &str, username: Option<String>) -> Result<SessionView, ApiError> {
  let quiz = match state.backend.load_attempt(quiz_id).await {
    Ok(Some(q)) => q,
    Ok(None) => {
      warn!(target: "editor", %quiz_id, "Quiz not found");
      return Err(ApiError::QuizNotFound(quiz_id.to_string()));
    }
    Err(e) => {
      error!(target: "editor", %quiz_id, error = %e, "Quiz load failed");
      return Err(ApiError::LoadFailed(e));
    }
  };

  let mut session = EditSession::new();
  session.load(quiz);
  let identity = username
    .filter(|u| !u.trim().is_empty())
    .unwrap_or_else(|| state.config.editor.default_identity.clone());
  let questions = session.question_count();

  let id = state.insert_session(SessionEntry { session, identity }).await;
  info!(target: "editor", session_id = %id, %quiz_id, questions, "Editing session opened");
  current_view(state, &id).await
}

pub async fn current_view(state: &AppState, session_id: &str) -> Result<SessionView, ApiError> {
  state
    .with_session(session_id, |e| session_view(session_id, &e.session))
    .await
    .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))
}

/// Run an edit against an interactive session and return the fresh view.
async fn edit<F>(state: &AppState, session_id: &str, f: F) -> Result<SessionView, ApiError>
where
  F: FnOnce(&mut EditSession) -> Result<(), ApiError>,
{
  state
    .with_session(session_id, |e| {
      ensure_editable(&e.session)?;
      f(&mut e.session)?;
      Ok(session_view(session_id, &e.session))
    })
    .await
    .unwrap_or_else(|| Err(ApiError::SessionNotFound(session_id.to_string())))
}

#[instrument(level = "info", skip(state, input), fields(%session_id, %question_id))]
pub async fn session_input(
  state: &AppState,
  session_id: &str,
  question_id: &str,
  input: AnswerInput,
) -> Result<SessionView, ApiError> {
  edit(state, session_id, |s| {
    apply_input(s, question_id, input).map_err(|e| {
      warn!(target: "editor", %question_id, reason = %e, "Input rejected");
      ApiError::from(e)
    })
  })
  .await
}

#[instrument(level = "debug", skip(state), fields(%session_id))]
pub async fn select_question(state: &AppState, session_id: &str, sel: SelectIn) -> Result<SessionView, ApiError> {
  edit(state, session_id, |s| {
    match (sel.index, sel.step) {
      (Some(i), _) => { s.select(i); }
      (None, Some(Step::Previous)) => { s.previous(); }
      (None, Some(Step::Next)) => { s.next(); }
      (None, None) => {}
    }
    Ok(())
  })
  .await
}

#[instrument(level = "debug", skip(state), fields(%session_id))]
pub async fn set_focus(state: &AppState, session_id: &str, focused: bool) -> Result<SessionView, ApiError> {
  edit(state, session_id, |s| {
    if focused { s.focus() } else { s.blur() }
    Ok(())
  })
  .await
}

/// Save the session's answers. The registry lock is not held during the collaborator call.
#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn save_session(state: &AppState, session_id: &str) -> Result<SaveReply, ApiError> {
  let request = state
    .with_session(session_id, |e| state.saver.begin(&mut e.session, &e.identity))
    .await
    .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))??;

  let result = state.backend.save_answers(&request).await;

  let reply = state
    .with_session(session_id, |e| match state.saver.finish(&mut e.session, result) {
      SaveOutcome::Saved { redirect_after, notice } => (
        SaveReply::Saved { notice, redirect_after_ms: redirect_after.as_millis() as u64 },
        Some(redirect_after),
      ),
      SaveOutcome::Failed { notice } => (
        SaveReply::Failed { notice, view: session_view(session_id, &e.session) },
        None,
      ),
    })
    .await
    .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))?;

  let (reply, redirect) = reply;
  if let Some(after) = redirect {
    state.schedule_removal(session_id.to_string(), after);
  }
  Ok(reply)
}

/// End a session on request. Refused while a save is in flight, so the caller
/// always learns how that save ended.
#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn close_session(state: &AppState, session_id: &str) -> Result<(), ApiError> {
  let mut sessions = state.sessions.write().await;
  match sessions.get(session_id).map(|e| e.session.phase()) {
    None => Err(ApiError::SessionNotFound(session_id.to_string())),
    Some(SessionPhase::Saving) => Err(ApiError::Locked(SessionPhase::Saving)),
    Some(_) => {
      sessions.remove(session_id);
      info!(target: "editor", %session_id, "Editing session closed");
      Ok(())
    }
  }
}

/// Drop a session whose client went away. Saved sessions are left to their
/// scheduled removal.
#[instrument(level = "debug", skip(state), fields(%session_id))]
pub async fn release_session(state: &AppState, session_id: &str) {
  let mut sessions = state.sessions.write().await;
  match sessions.get(session_id).map(|e| e.session.phase()) {
    None | Some(SessionPhase::Saved) => {}
    Some(phase) => {
      sessions.remove(session_id);
      info!(target: "editor", %session_id, ?phase, "Abandoned editing session closed");
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::backend::fake;
  use crate::config::{CollaboratorCfg, EditorCfg, EditorConfig};
  use crate::domain::fixtures::two_question_quiz;

  async fn app(redirect_ms: u64) -> (AppState, fake::Shared) {
    let (url, shared) = fake::spawn(vec![two_question_quiz()]).await;
    let cfg = EditorConfig {
      collaborator: CollaboratorCfg { base_url: url, timeout_secs: 5, ..Default::default() },
      editor: EditorCfg { saved_redirect_ms: redirect_ms, ..Default::default() },
    };
    (AppState::new(cfg).unwrap(), shared)
  }

  async fn answer_all(state: &AppState, sid: &str) {
    session_input(state, sid, "q1", AnswerInput::SelectOption { index: 0 }).await.unwrap();
    session_input(state, sid, "q2", AnswerInput::Choose { value: "True".into() }).await.unwrap();
  }

  #[tokio::test]
  async fn open_unknown_quiz_is_not_found_with_notice() {
    let (state, _) = app(1000).await;
    let err = open_session(&state, "missing", None).await.unwrap_err();
    assert!(matches!(err, ApiError::QuizNotFound(_)));
    assert_eq!(err.notice(), Some(Notice::quiz_not_found()));
    assert_eq!(state.session_count().await, 0);
  }

  #[tokio::test]
  async fn edit_then_save_round_trip() {
    let (state, shared) = app(150).await;
    let view = open_session(&state, "quiz-1", Some("roll-3".into())).await.unwrap();
    let sid = view.session_id.clone();
    assert!(!view.save.can_save);

    let err = save_session(&state, &sid).await.unwrap_err();
    assert_eq!(err.unanswered(), vec!["q1".to_string(), "q2".to_string()]);

    answer_all(&state, &sid).await;
    let view = current_view(&state, &sid).await.unwrap();
    assert!(view.save.can_save);
    assert_eq!(view.navigator.edited_count, 2);

    match save_session(&state, &sid).await.unwrap() {
      SaveReply::Saved { notice, redirect_after_ms } => {
        assert_eq!(notice, Notice::answers_updated());
        assert_eq!(redirect_after_ms, 150);
      }
      other => panic!("unexpected {other:?}"),
    }
    {
      let st = shared.lock().unwrap();
      assert_eq!(st.saved.len(), 1);
      assert_eq!(st.saved[0].identity, "roll-3");
    }

    let err = session_input(&state, &sid, "q2", AnswerInput::Choose { value: "False".into() }).await.unwrap_err();
    assert!(matches!(err, ApiError::Locked(SessionPhase::Saved)));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(matches!(current_view(&state, &sid).await, Err(ApiError::SessionNotFound(_))));
  }

  #[tokio::test]
  async fn failed_save_keeps_session_ready() {
    let (state, shared) = app(1000).await;
    shared.lock().unwrap().save_status = Some(500);
    let sid = open_session(&state, "quiz-1", None).await.unwrap().session_id;
    answer_all(&state, &sid).await;

    match save_session(&state, &sid).await.unwrap() {
      SaveReply::Failed { notice, view } => {
        assert_eq!(notice, Notice::save_failed());
        assert_eq!(view.phase, SessionPhase::Ready);
        assert!(view.save.can_save);
      }
      other => panic!("unexpected {other:?}"),
    }
    assert!(shared.lock().unwrap().saved.is_empty());
  }

  #[tokio::test]
  async fn default_identity_is_used_without_username() {
    let (state, shared) = app(1000).await;
    let sid = open_session(&state, "quiz-1", Some("  ".into())).await.unwrap().session_id;
    answer_all(&state, &sid).await;
    save_session(&state, &sid).await.unwrap();
    assert_eq!(shared.lock().unwrap().saved[0].identity, "student");
  }

  #[tokio::test]
  async fn navigation_and_focus() {
    let (state, _) = app(1000).await;
    let sid = open_session(&state, "quiz-1", None).await.unwrap().session_id;

    let v = select_question(&state, &sid, SelectIn { index: None, step: Some(Step::Next) }).await.unwrap();
    assert_eq!(v.editor.unwrap().question_id, "q2");
    let v = select_question(&state, &sid, SelectIn { index: Some(40), step: None }).await.unwrap();
    assert_eq!(v.navigator.progress.position, 2);

    let v = set_focus(&state, &sid, true).await.unwrap();
    assert_eq!(v.phase, SessionPhase::Editing);
    let v = set_focus(&state, &sid, false).await.unwrap();
    assert_eq!(v.phase, SessionPhase::Ready);
  }

  #[tokio::test]
  async fn rejected_input_leaves_view_unchanged() {
    let (state, _) = app(1000).await;
    let sid = open_session(&state, "quiz-1", None).await.unwrap().session_id;
    let err = session_input(&state, &sid, "q2", AnswerInput::Choose { value: "maybe".into() }).await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected(InputRejected::NotTrueFalse(_))));
    assert_eq!(current_view(&state, &sid).await.unwrap().navigator.edited_count, 0);
  }

  #[tokio::test]
  async fn close_is_refused_while_saving() {
    let (state, _) = app(1000).await;
    let sid = open_session(&state, "quiz-1", None).await.unwrap().session_id;
    state.with_session(&sid, |e| e.session.set_phase(SessionPhase::Saving)).await.unwrap();

    let err = close_session(&state, &sid).await.unwrap_err();
    assert!(matches!(err, ApiError::Locked(SessionPhase::Saving)));
    assert_eq!(state.session_count().await, 1);
  }

  #[tokio::test]
  async fn release_drops_live_sessions_but_not_saved_ones() {
    let (state, _) = app(60_000).await;
    let live = open_session(&state, "quiz-1", None).await.unwrap().session_id;
    release_session(&state, &live).await;
    assert!(matches!(current_view(&state, &live).await, Err(ApiError::SessionNotFound(_))));

    let saved = open_session(&state, "quiz-1", None).await.unwrap().session_id;
    answer_all(&state, &saved).await;
    save_session(&state, &saved).await.unwrap();
    release_session(&state, &saved).await;
    assert_eq!(current_view(&state, &saved).await.unwrap().phase, SessionPhase::Saved);

    release_session(&state, "unknown").await;
  }

  #[tokio::test]
  async fn close_removes_session() {
    let (state, _) = app(1000).await;
    let sid = open_session(&state, "quiz-1", None).await.unwrap().session_id;
    close_session(&state, &sid).await.unwrap();
    assert!(matches!(close_session(&state, &sid).await, Err(ApiError::SessionNotFound(_))));
  }
}
