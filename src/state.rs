//! Application state: the registry of live editing sessions, the collaborator
//! client, the save coordinator and the loaded configuration.
//!
//! Each session is owned by exactly one registry entry. Handlers borrow it under
//! the write lock for short synchronous sections only; network calls happen
//! with the lock released.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::backend::{BackendError, HttpQuizBackend};
use crate::config::EditorConfig;
use crate::save::SaveCoordinator;
use crate::session::EditSession;

/// One live editing session plus who is editing.
#[derive(Debug)]
pub struct SessionEntry {
    pub session: EditSession,
    /// Roll number / username sent with the save.
    pub identity: String,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    pub backend: HttpQuizBackend,
    pub saver: SaveCoordinator,
    pub config: EditorConfig,
}

impl AppState {
    /// Build state from a config: collaborator client and save coordinator.
    #[instrument(level = "info", skip_all, fields(base_url = %config.collaborator.base_url))]
    pub fn new(config: EditorConfig) -> Result<Self, BackendError> {
        let backend = HttpQuizBackend::new(&config.collaborator)?;
        let saver = SaveCoordinator::new(config.saved_redirect());
        info!(
            target: "quiz_editor",
            base_url = %backend.base_url,
            load_path = %backend.load_path,
            save_path = %backend.save_path,
            timeout_secs = config.collaborator.timeout_secs,
            "Collaborator client ready"
        );
        Ok(Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            backend,
            saver,
            config,
        })
    }

    /// Register a session and hand back its id.
    #[instrument(level = "debug", skip_all)]
    pub async fn insert_session(&self, entry: SessionEntry) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.write().await.insert(id.clone(), entry);
        id
    }

    /// Run `f` against one session under the write lock. `None` if the id is unknown.
    pub async fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut SessionEntry) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(id).map(f)
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_session(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop a session once the success notice has had time to show.
    pub fn schedule_removal(&self, id: String, after: Duration) {
        let state = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if state.remove_session(&id).await {
                info!(target: "editor", session_id = %id, "Saved session closed");
            }
        });
    }
}
