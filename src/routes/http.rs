//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs ids and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, response::{IntoResponse, Response}, Json};
use tracing::{info, instrument};

use crate::logic::*;
use crate::protocol::*;
use crate::review::{review, QuizDraft};
use crate::state::AppState;

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::SessionNotFound(_) | ApiError::QuizNotFound(_) => StatusCode::NOT_FOUND,
      ApiError::LoadFailed(_) => StatusCode::BAD_GATEWAY,
      ApiError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Blocked(_) | ApiError::Locked(_) => StatusCode::CONFLICT,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = ErrorOut { error: self.to_string(), notice: self.notice(), unanswered: self.unanswered() };
    (self.status(), Json(body)).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, sessions: state.session_count().await })
}

#[instrument(level = "info", skip(state, body), fields(quiz_id = %body.quiz_id))]
pub async fn http_open_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<OpenSessionIn>,
) -> Result<impl IntoResponse, ApiError> {
  let view = open_session(&state, &body.quiz_id, body.username).await?;
  info!(target: "editor", session_id = %view.session_id, "HTTP session opened");
  Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(current_view(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body), fields(question_id = %body.question_id))]
pub async fn http_post_input(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<InputIn>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(session_input(&state, &id, &body.question_id, body.input).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_select(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<SelectIn>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(select_question(&state, &id, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_focus(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<FocusIn>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(set_focus(&state, &id, body.focused).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_save(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SaveOut>, ApiError> {
  let out = match save_session(&state, &id).await? {
    SaveReply::Saved { notice, redirect_after_ms } => SaveOut::Saved { notice, redirect_after_ms },
    SaveReply::Failed { notice, view } => SaveOut::Failed { notice, view },
  };
  info!(target: "editor", session_id = %id, saved = matches!(out, SaveOut::Saved { .. }), "HTTP save handled");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  close_session(&state, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(body), fields(title = %body.title, questions = body.questions.len()))]
pub async fn http_post_review(Json(body): Json<QuizDraft>) -> impl IntoResponse {
  let report = review(&body);
  info!(target: "review", valid = report.valid, problems = report.problems.len(), "Draft reviewed");
  Json(report)
}
