//! Loading editor configuration (collaborator endpoints + editor behavior) from TOML.
//!
//! See `EditorConfig` for the expected schema. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
pub struct EditorConfig {
  #[serde(default)]
  pub collaborator: CollaboratorCfg,
  #[serde(default)]
  pub editor: EditorCfg,
}

/// Where the school's quiz API lives and how to reach it.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollaboratorCfg {
  pub base_url: String,
  /// Attempt loader, body `{"quizid": ...}`.
  pub load_path: String,
  /// Answer writer, body `{"type":"updateanswers", ...}`.
  pub save_path: String,
  pub timeout_secs: u64,
}

impl Default for CollaboratorCfg {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:3000".into(),
      load_path: "/api/getAttempt".into(),
      save_path: "/api/quizz".into(),
      timeout_secs: 20,
    }
  }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorCfg {
  /// Identity sent with saves when the client does not supply one.
  pub default_identity: String,
  /// How long a saved session lingers so the success notice can be seen.
  pub saved_redirect_ms: u64,
}

impl Default for EditorCfg {
  fn default() -> Self {
    Self { default_identity: "student".into(), saved_redirect_ms: 1000 }
  }
}

impl CollaboratorCfg {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

impl EditorConfig {
  pub fn saved_redirect(&self) -> Duration {
    Duration::from_millis(self.editor.saved_redirect_ms)
  }

  /// TOML from EDITOR_CONFIG_PATH (or defaults), then env overrides.
  pub fn from_env() -> Self {
    let mut cfg = load_editor_config_from_env().unwrap_or_default();
    if let Ok(url) = std::env::var("QUIZ_API_BASE_URL") {
      cfg.collaborator.base_url = url;
    }
    cfg
  }
}

/// Parse a TOML document into `EditorConfig`.
pub fn parse_editor_config(s: &str) -> Result<EditorConfig, toml::de::Error> {
  toml::from_str::<EditorConfig>(s)
}

/// Attempt to load `EditorConfig` from EDITOR_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_editor_config_from_env() -> Option<EditorConfig> {
  let path = std::env::var("EDITOR_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_editor_config(&s) {
      Ok(cfg) => {
        info!(target: "quiz_editor", %path, "Loaded editor config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quiz_editor", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quiz_editor", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_gives_defaults() {
    let cfg = parse_editor_config("").unwrap();
    assert_eq!(cfg, EditorConfig::default());
    assert_eq!(cfg.saved_redirect(), Duration::from_secs(1));
    assert_eq!(cfg.collaborator.load_path, "/api/getAttempt");
  }

  #[test]
  fn partial_sections_keep_other_defaults() {
    let cfg = parse_editor_config(
      r#"
      [collaborator]
      base_url = "https://school.example"
      timeout_secs = 5

      [editor]
      default_identity = "roll-17"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.collaborator.base_url, "https://school.example");
    assert_eq!(cfg.collaborator.save_path, "/api/quizz");
    assert_eq!(cfg.collaborator.timeout(), Duration::from_secs(5));
    assert_eq!(cfg.editor.default_identity, "roll-17");
    assert_eq!(cfg.editor.saved_redirect_ms, 1000);
  }

  #[test]
  fn bad_types_are_errors() {
    assert!(parse_editor_config("[collaborator]\ntimeout_secs = \"soon\"").is_err());
  }
}
