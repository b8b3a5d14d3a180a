//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::answer::{AnswerEditorView, AnswerInput};
use crate::navigator::NavigatorView;
use crate::session::{EditSession, SessionPhase};
use crate::util::capitalize_sentences;

pub const ALL_ANSWERED_REQUIRED: &str = "All questions must be answered to save changes.";

/// Toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

impl Notice {
    fn new(title: &str, description: &str, variant: NoticeVariant) -> Self {
        Self { title: title.into(), description: description.into(), variant }
    }

    pub fn answers_updated() -> Self {
        Self::new("Answers Updated", "Quiz answers have been saved successfully!", NoticeVariant::Default)
    }

    /// Shared by every save failure cause; the user is not told which one.
    pub fn save_failed() -> Self {
        Self::new("Save Failed", "Failed to save answer changes. Please try again.", NoticeVariant::Destructive)
    }

    pub fn quiz_not_found() -> Self {
        Self::new("Error", "Quiz not found", NoticeVariant::Destructive)
    }
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Open {
        #[serde(rename = "quizId")]
        quiz_id: String,
        #[serde(default)]
        username: Option<String>,
    },
    Attach {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Input {
        #[serde(rename = "questionId")]
        question_id: String,
        input: AnswerInput,
    },
    Select(SelectIn),
    Focus {
        focused: bool,
    },
    Save,
    Close,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    View {
        view: SessionView,
    },
    Saved {
        notice: Notice,
        #[serde(rename = "redirectAfterMs")]
        redirect_after_ms: u64,
    },
    SaveFailed {
        notice: Notice,
        view: SessionView,
    },
    Closed,
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        notice: Option<Notice>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        unanswered: Vec<String>,
    },
}

/// Title bar data.
#[derive(Debug, Clone, Serialize)]
pub struct QuizHeader {
    pub quiz_id: String,
    pub attempt_id: Option<String>,
    pub title: String,
    pub subject: String,
    pub grade: String,
    pub category: String,
    pub time_limit: u32,
    pub question_count: usize,
    pub total_marks: f64,
    pub edited_count: usize,
}

/// State of the global save button.
#[derive(Debug, Clone, Serialize)]
pub struct SaveGate {
    pub can_save: bool,
    pub all_answered: bool,
    pub unanswered: Vec<String>,
    pub blocking_message: Option<&'static str>,
    pub button_label: &'static str,
}

/// Everything a client needs to render the editor screen.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub phase: SessionPhase,
    pub header: Option<QuizHeader>,
    pub editor: Option<AnswerEditorView>,
    pub navigator: NavigatorView,
    pub save: SaveGate,
}

/// Project an edit session into its public view.
pub fn session_view(session_id: &str, s: &EditSession) -> SessionView {
    let header = s.quiz().map(|q| QuizHeader {
        quiz_id: q.id.clone(),
        attempt_id: q.attempt_id.clone(),
        title: capitalize_sentences(&q.title),
        subject: q.subject.clone(),
        grade: q.grade.clone(),
        category: q.category.clone(),
        time_limit: q.time_limit,
        question_count: q.questions.len(),
        total_marks: q.total_marks,
        edited_count: s.edited().len(),
    });
    let editor = s
        .current_question()
        .map(|q| AnswerEditorView::for_question(q, s.is_edited(&q.id)));

    let all_answered = s.all_questions_answered();
    let unanswered = s.unanswered();
    let save = SaveGate {
        can_save: all_answered && s.phase().is_interactive(),
        all_answered,
        blocking_message: (s.quiz().is_some() && !all_answered).then_some(ALL_ANSWERED_REQUIRED),
        unanswered,
        button_label: if s.phase() == SessionPhase::Saving { "Saving..." } else { "Save Answers" },
    };

    SessionView {
        session_id: session_id.to_string(),
        phase: s.phase(),
        header,
        editor,
        navigator: NavigatorView::project(s),
        save,
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct OpenSessionIn {
    #[serde(rename = "quizId")]
    pub quiz_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InputIn {
    #[serde(rename = "questionId")]
    pub question_id: String,
    pub input: AnswerInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Previous,
    Next,
}

/// Either an absolute index or a relative step; `index` wins when both are set.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectIn {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub step: Option<Step>,
}

#[derive(Debug, Deserialize)]
pub struct FocusIn {
    pub focused: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOut {
    Saved {
        notice: Notice,
        #[serde(rename = "redirectAfterMs")]
        redirect_after_ms: u64,
    },
    Failed {
        notice: Notice,
        view: SessionView,
    },
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unanswered: Vec<String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub sessions: usize,
}
