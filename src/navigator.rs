//! Question navigator: a read-only projection over the edit session.
//! Selection itself lives on `EditSession::select`.

use serde::Serialize;

use crate::session::EditSession;
use crate::util::plural;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavEntry {
    pub index: usize,
    pub question_id: String,
    pub label: u32,
    pub is_current: bool,
    pub is_edited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    /// 1-based position of the current question.
    pub position: usize,
    pub total: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigatorView {
    pub total: usize,
    pub edited_count: usize,
    pub entries: Vec<NavEntry>,
    pub progress: Progress,
    pub can_go_previous: bool,
    pub can_go_next: bool,
    /// "2 questions modified"; absent while nothing is edited.
    pub modified_note: Option<String>,
}

impl NavigatorView {
    pub fn project(session: &EditSession) -> Self {
        let current = session.current_index();
        let entries: Vec<NavEntry> = session
            .quiz()
            .iter()
            .flat_map(|q| q.questions.iter())
            .enumerate()
            .map(|(index, q)| NavEntry {
                index,
                question_id: q.id.clone(),
                label: q.number,
                is_current: index == current,
                is_edited: session.is_edited(&q.id),
            })
            .collect();

        let total = entries.len();
        let edited_count = session.edited().len();
        let position = if total == 0 { 0 } else { current + 1 };
        let percent = if total == 0 { 0.0 } else { position as f64 * 100.0 / total as f64 };

        Self {
            total,
            edited_count,
            entries,
            progress: Progress { position, total, percent },
            can_go_previous: session.can_go_previous(),
            can_go_next: session.can_go_next(),
            modified_note: (edited_count > 0).then(|| format!("{} modified", plural(edited_count, "question"))),
        }
    }
}
