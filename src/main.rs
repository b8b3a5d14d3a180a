//! Quiz Editor · answer-editing backend
//!
//! - Axum HTTP + WebSocket API for quiz answer editing sessions
//! - Loads attempts from and saves answers to the school's quiz API
//! - Authoring review step (`/api/v1/review`)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   QUIZ_API_BASE_URL  : collaborator base URL (overrides the TOML value)
//!   EDITOR_CONFIG_PATH : path to TOML config (collaborator endpoints + editor behavior)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod session;
mod answer;
mod navigator;
mod backend;
mod save;
mod review;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::EditorConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (session registry, collaborator client, config).
  let state = Arc::new(AppState::new(EditorConfig::from_env())?);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quiz_editor", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "quiz_editor", "Server stopped");
  Ok(())
}

/// Resolve on Ctrl-C so in-flight requests can finish.
async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "quiz_editor", error = %e, "Failed to listen for shutdown signal");
  }
}
