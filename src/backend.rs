//! Client for the school's quiz API (the collaborator that owns persistence).
//!
//! Two calls only: load an attempt by quiz id, and write back the edited answers.
//! Calls are instrumented and log ids, statuses and latencies (never answer text
//! or the identity string).

use std::fmt;
use std::future::Future;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::CollaboratorCfg;
use crate::domain::{Question, Quiz};
use crate::util::trunc_for_log;

/// Discriminator the collaborator expects on answer updates.
pub const UPDATE_ANSWERS: &str = "updateanswers";

/// Body of the answer write-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(rename = "uquizId")]
  pub quiz_id: String,
  #[serde(rename = "uattemptId", default, skip_serializing_if = "Option::is_none")]
  pub attempt_id: Option<String>,
  #[serde(rename = "urollNo")]
  pub identity: String,
  #[serde(rename = "udata")]
  pub questions: Vec<Question>,
}

impl SaveRequest {
  pub fn for_quiz(quiz: &Quiz, identity: &str) -> Self {
    Self {
      kind: UPDATE_ANSWERS.into(),
      quiz_id: quiz.id.clone(),
      attempt_id: quiz.attempt_id.clone(),
      identity: identity.to_string(),
      questions: quiz.questions.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
  /// Connection refused, timeout, TLS, ...
  Transport(String),
  /// The collaborator answered with a non-success status.
  Status { code: u16, body: String },
  /// The response body was not what we expected.
  Decode(String),
}

impl fmt::Display for BackendError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BackendError::Transport(e) => write!(f, "collaborator unreachable: {}", e),
      BackendError::Status { code, body } => write!(f, "collaborator HTTP {}: {}", code, body),
      BackendError::Decode(e) => write!(f, "collaborator response decode error: {}", e),
    }
  }
}

impl std::error::Error for BackendError {}

/// The load/save contract the editor depends on.
pub trait QuizBackend: Send + Sync {
  /// `Ok(None)` means the collaborator has no such attempt.
  fn load_attempt(&self, quiz_id: &str) -> impl Future<Output = Result<Option<Quiz>, BackendError>> + Send;

  fn save_answers(&self, request: &SaveRequest) -> impl Future<Output = Result<(), BackendError>> + Send;
}

#[derive(Serialize)]
struct LoadAttemptBody<'a> {
  quizid: &'a str,
}

#[derive(Deserialize)]
struct AttemptEnvelope {
  #[serde(default, rename = "quizData")]
  quiz_data: Option<Quiz>,
}

/// reqwest-backed collaborator client.
#[derive(Clone)]
pub struct HttpQuizBackend {
  pub client: reqwest::Client,
  pub base_url: String,
  pub load_path: String,
  pub save_path: String,
}

impl HttpQuizBackend {
  pub fn new(cfg: &CollaboratorCfg) -> Result<Self, BackendError> {
    let client = reqwest::Client::builder()
      .timeout(cfg.timeout())
      .build()
      .map_err(|e| BackendError::Transport(e.to_string()))?;
    Ok(Self {
      client,
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
      load_path: cfg.load_path.clone(),
      save_path: cfg.save_path.clone(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response, BackendError> {
    self.client
      .post(self.url(path))
      .header(USER_AGENT, "quiz-editor-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(body)
      .send()
      .await
      .map_err(|e| BackendError::Transport(e.to_string()))
  }
}

impl QuizBackend for HttpQuizBackend {
  #[instrument(level = "info", skip(self), fields(path = %self.load_path))]
  async fn load_attempt(&self, quiz_id: &str) -> Result<Option<Quiz>, BackendError> {
    let start = std::time::Instant::now();
    let res = self.post(&self.load_path, &LoadAttemptBody { quizid: quiz_id }).await?;
    let status = res.status();

    if status == StatusCode::NOT_FOUND {
      warn!(target: "collab", %quiz_id, "Attempt not found (404)");
      return Ok(None);
    }
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      error!(target: "collab", %quiz_id, status = status.as_u16(), body = %trunc_for_log(&body, 200), "Attempt load failed");
      return Err(BackendError::Status { code: status.as_u16(), body });
    }

    let envelope: Option<AttemptEnvelope> = res.json().await.map_err(|e| BackendError::Decode(e.to_string()))?;
    let quiz = envelope.and_then(|e| e.quiz_data);
    info!(
      target: "collab",
      %quiz_id,
      elapsed = ?start.elapsed(),
      found = quiz.is_some(),
      questions = quiz.as_ref().map_or(0, |q| q.questions.len()),
      "Attempt loaded"
    );
    Ok(quiz)
  }

  #[instrument(
    level = "info",
    skip(self, request),
    fields(quiz_id = %request.quiz_id, attempt_id = ?request.attempt_id, questions = request.questions.len())
  )]
  async fn save_answers(&self, request: &SaveRequest) -> Result<(), BackendError> {
    let start = std::time::Instant::now();
    let res = self.post(&self.save_path, request).await?;
    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      error!(target: "collab", status = status.as_u16(), body = %trunc_for_log(&body, 200), "Answer save rejected");
      return Err(BackendError::Status { code: status.as_u16(), body });
    }
    // A success status with a body that is not JSON is not a confirmed save.
    res
      .json::<serde_json::Value>()
      .await
      .map_err(|e| BackendError::Decode(e.to_string()))?;
    info!(target: "collab", elapsed = ?start.elapsed(), status = status.as_u16(), "Answers saved");
    Ok(())
  }
}
