//! QuestGen · Interview Question Generator Backend
//!
//! - Axum HTTP API: prompt preview, generation, validation, markdown export
//! - Gemini integration with model fallback (GEMINI_API_KEY is required)
//!
//! Important env variables (a `.env` file is read first if present):
//!   PORT                  : u16 (default 3000)
//!   GEMINI_API_KEY        : required
//!   GEMINI_BASE_URL       : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODELS         : comma separated fallback list
//!   GEMINI_TIMEOUT_SECS   : per-request timeout (default 120)
//!   GEMINI_TEMPERATURE    : default 0.7
//!   EXPORT_DIR            : also write exports to this directory
//!   QUESTGEN_CONFIG_PATH  : path to TOML config (prompts, scoring, generation)
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod prompt;
mod validator;
mod export;
mod gemini;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  telemetry::init_tracing();

  // Service handle, prompts, scoring policy and the generation store.
  let state = match AppState::from_env() {
    Ok(s) => Arc::new(s),
    Err(e) => {
      error!(target: "questgen_backend", error = %e, "Startup failed");
      return Err(e.into());
    }
  };

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "questgen_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "questgen_backend", error = %e, "Failed to listen for shutdown signal");
    return;
  }
  info!(target: "questgen_backend", "Shutdown signal received");
}
