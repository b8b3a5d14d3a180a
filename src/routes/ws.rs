//! WebSocket upgrade + message loop. A socket drives at most one editing session:
//! `open` (or `attach`) binds it, later messages act on it. We reply with a single
//! JSON message per request. Rebinding or disconnecting releases the session the
//! socket held.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage, SessionView};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quiz_editor", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "quiz_editor", "WebSocket connected");
  let mut bound: Option<String> = None;

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "quiz_editor", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut bound).await
          }
          Err(e) => error_msg(format!("Invalid JSON: {}", e)),
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "quiz_editor", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "quiz_editor", session_id = ?bound, "WebSocket disconnected");
  if let Some(id) = bound {
    release_session(&state, &id).await;
  }
}

/// Point the socket at `next`, releasing whatever it held before.
async fn rebind(state: &AppState, bound: &mut Option<String>, next: String) {
  if let Some(prev) = bound.replace(next) {
    if bound.as_deref() != Some(prev.as_str()) {
      release_session(state, &prev).await;
    }
  }
}

fn error_msg(message: String) -> ServerWsMessage {
  ServerWsMessage::Error { message, notice: None, unanswered: Vec::new() }
}

fn from_api(e: ApiError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string(), notice: e.notice(), unanswered: e.unanswered() }
}

fn view_reply(r: Result<SessionView, ApiError>) -> ServerWsMessage {
  match r {
    Ok(view) => ServerWsMessage::View { view },
    Err(e) => from_api(e),
  }
}

#[instrument(level = "info", skip(state, msg, bound))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, bound: &mut Option<String>) -> ServerWsMessage {
  // Session-scoped messages need a bound session first.
  let session_id = match (&msg, bound.as_deref()) {
    (ClientWsMessage::Ping | ClientWsMessage::Open { .. } | ClientWsMessage::Attach { .. }, _) => String::new(),
    (_, Some(id)) => id.to_string(),
    (_, None) => return error_msg("No session: send `open` first.".into()),
  };

  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Open { quiz_id, username } => {
      let r = open_session(state, &quiz_id, username).await;
      if let Ok(view) = &r {
        rebind(state, bound, view.session_id.clone()).await;
        info!(target: "editor", session_id = %view.session_id, %quiz_id, "WS session opened");
      }
      view_reply(r)
    }

    ClientWsMessage::Attach { session_id } => {
      let r = current_view(state, &session_id).await;
      if r.is_ok() {
        rebind(state, bound, session_id).await;
      }
      view_reply(r)
    }

    ClientWsMessage::Input { question_id, input } => {
      view_reply(session_input(state, &session_id, &question_id, input).await)
    }

    ClientWsMessage::Select(sel) => view_reply(select_question(state, &session_id, sel).await),

    ClientWsMessage::Focus { focused } => view_reply(set_focus(state, &session_id, focused).await),

    ClientWsMessage::Save => match save_session(state, &session_id).await {
      Ok(SaveReply::Saved { notice, redirect_after_ms }) => {
        *bound = None;
        ServerWsMessage::Saved { notice, redirect_after_ms }
      }
      Ok(SaveReply::Failed { notice, view }) => ServerWsMessage::SaveFailed { notice, view },
      Err(e) => from_api(e),
    },

    ClientWsMessage::Close => match close_session(state, &session_id).await {
      Ok(()) => {
        *bound = None;
        ServerWsMessage::Closed
      }
      Err(e) => from_api(e),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::answer::AnswerInput;
  use crate::backend::fake;
  use crate::config::{CollaboratorCfg, EditorCfg, EditorConfig};
  use crate::domain::fixtures::two_question_quiz;
  use crate::protocol::Notice;
  use crate::session::SessionPhase;

  async fn app() -> (AppState, fake::Shared) {
    let (url, shared) = fake::spawn(vec![two_question_quiz()]).await;
    let cfg = EditorConfig {
      collaborator: CollaboratorCfg { base_url: url, timeout_secs: 5, ..Default::default() },
      editor: EditorCfg { saved_redirect_ms: 60_000, ..Default::default() },
    };
    (AppState::new(cfg).unwrap(), shared)
  }

  fn open(quiz_id: &str) -> ClientWsMessage {
    ClientWsMessage::Open { quiz_id: quiz_id.into(), username: None }
  }

  fn view_of(msg: ServerWsMessage) -> SessionView {
    match msg {
      ServerWsMessage::View { view } => view,
      other => panic!("expected a view, got {other:?}"),
    }
  }

  async fn answer_all(state: &AppState, bound: &mut Option<String>) {
    let inputs = [
      ("q1", AnswerInput::SelectOption { index: 0 }),
      ("q2", AnswerInput::Choose { value: "True".into() }),
    ];
    for (question_id, input) in inputs {
      let msg = ClientWsMessage::Input { question_id: question_id.into(), input };
      view_of(handle_client_ws(msg, state, bound).await);
    }
  }

  #[tokio::test]
  async fn session_messages_need_open_first() {
    let (state, _) = app().await;
    let mut bound = None;
    for msg in [ClientWsMessage::Save, ClientWsMessage::Close, ClientWsMessage::Focus { focused: true }] {
      match handle_client_ws(msg, &state, &mut bound).await {
        ServerWsMessage::Error { message, .. } => assert_eq!(message, "No session: send `open` first."),
        other => panic!("unexpected {other:?}"),
      }
    }
    assert!(matches!(handle_client_ws(ClientWsMessage::Ping, &state, &mut bound).await, ServerWsMessage::Pong));
  }

  #[tokio::test]
  async fn open_unknown_quiz_carries_notice_and_stays_unbound() {
    let (state, _) = app().await;
    let mut bound = None;
    match handle_client_ws(open("missing"), &state, &mut bound).await {
      ServerWsMessage::Error { notice, .. } => assert_eq!(notice, Some(Notice::quiz_not_found())),
      other => panic!("unexpected {other:?}"),
    }
    assert_eq!(bound, None);
  }

  #[tokio::test]
  async fn open_edit_save_unbinds() {
    let (state, shared) = app().await;
    let mut bound = None;
    let view = view_of(handle_client_ws(open("quiz-1"), &state, &mut bound).await);
    assert_eq!(bound.as_deref(), Some(view.session_id.as_str()));

    match handle_client_ws(ClientWsMessage::Save, &state, &mut bound).await {
      ServerWsMessage::Error { unanswered, .. } => assert_eq!(unanswered, vec!["q1".to_string(), "q2".to_string()]),
      other => panic!("unexpected {other:?}"),
    }

    answer_all(&state, &mut bound).await;
    match handle_client_ws(ClientWsMessage::Save, &state, &mut bound).await {
      ServerWsMessage::Saved { notice, redirect_after_ms } => {
        assert_eq!(notice, Notice::answers_updated());
        assert_eq!(redirect_after_ms, 60_000);
      }
      other => panic!("unexpected {other:?}"),
    }
    assert_eq!(bound, None);
    assert_eq!(shared.lock().unwrap().saved.len(), 1);
  }

  #[tokio::test]
  async fn failed_save_replies_with_notice_and_view() {
    let (state, shared) = app().await;
    shared.lock().unwrap().save_status = Some(502);
    let mut bound = None;
    handle_client_ws(open("quiz-1"), &state, &mut bound).await;
    answer_all(&state, &mut bound).await;

    match handle_client_ws(ClientWsMessage::Save, &state, &mut bound).await {
      ServerWsMessage::SaveFailed { notice, view } => {
        assert_eq!(notice, Notice::save_failed());
        assert_eq!(view.phase, SessionPhase::Ready);
      }
      other => panic!("unexpected {other:?}"),
    }
    assert!(bound.is_some());
  }

  #[tokio::test]
  async fn attach_binds_and_close_unbinds() {
    let (state, _) = app().await;
    let sid = crate::logic::open_session(&state, "quiz-1", None).await.unwrap().session_id;
    let mut bound = None;

    match handle_client_ws(ClientWsMessage::Attach { session_id: "nope".into() }, &state, &mut bound).await {
      ServerWsMessage::Error { .. } => {}
      other => panic!("unexpected {other:?}"),
    }
    assert_eq!(bound, None);

    view_of(handle_client_ws(ClientWsMessage::Attach { session_id: sid.clone() }, &state, &mut bound).await);
    assert_eq!(bound.as_deref(), Some(sid.as_str()));

    assert!(matches!(handle_client_ws(ClientWsMessage::Close, &state, &mut bound).await, ServerWsMessage::Closed));
    assert_eq!(bound, None);
    assert_eq!(state.session_count().await, 0);
  }

  #[tokio::test]
  async fn reopening_releases_the_previous_session() {
    let (state, _) = app().await;
    let mut bound = None;
    let first = view_of(handle_client_ws(open("quiz-1"), &state, &mut bound).await).session_id;
    let second = view_of(handle_client_ws(open("quiz-1"), &state, &mut bound).await).session_id;

    assert_ne!(first, second);
    assert_eq!(bound.as_deref(), Some(second.as_str()));
    assert_eq!(state.session_count().await, 1);

    view_of(handle_client_ws(ClientWsMessage::Attach { session_id: second.clone() }, &state, &mut bound).await);
    assert_eq!(state.session_count().await, 1);
  }
}
