//! Playner · Analogy Mission Backend
//!
//! - Axum HTTP + WebSocket API
//! - Tiered mission resolution: curated bank, local cache, shared remote store, OpenAI generation
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   OPENAI_API_KEY     : enables mission generation if present
//!   OPENAI_BASE_URL    : default "https://api.openai.com/v1"
//!   OPENAI_MODEL       : default "gpt-4o"
//!   MISSION_CACHE_DIR  : local cache directory (default "./.playner_cache"; empty = in-memory)
//!   REMOTE_PROJECT_ID  : shared store project (unset or placeholder disables it)
//!   REMOTE_API_KEY     : shared store auth token
//!   REMOTE_BASE_URL    : overrides the project-derived store URL
//!   AGENT_CONFIG_PATH  : path to TOML config (prompts, generation, extra bank files)
//!   ANALYTICS_ENABLED  : "0"/"false" disables the in-memory event log
//!   MAX_SESSIONS       : live session cap (default 10000; least recently active evicted)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod key;
mod config;
mod seeds;
mod bank;
mod cache;
mod remote;
mod openai;
mod shuffle;
mod resolver;
mod session;
mod analytics;
mod state;
mod protocol;
mod logic;
mod routes;
#[cfg(test)]
mod testing;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: resolver tiers, domain catalog, sessions, analytics.
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "playner_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "playner_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "playner_backend", "Shutdown signal received");
}
