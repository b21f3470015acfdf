//! Error taxonomy for the mission pipeline, the session tracker and the HTTP surface.
//!
//! Cache misses are not errors (tiers return `Option`). Persistence failures are
//! logged and swallowed by the resolver. Only generation and integrity failures
//! ever reach the caller of `resolve_mission`.

use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::session::Phase;

/// A mission that breaks the content contract. Never "fixed up", always rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrityError {
  #[error("mission has no modules")]
  NoModules,

  #[error("{location}: required field `{field}` is empty")]
  EmptyField { location: String, field: &'static str },

  #[error("{location}: needs at least 2 options, found {found}")]
  TooFewOptions { location: String, found: usize },

  #[error("{location}: correct answer {answer:?} is not one of the options")]
  AnswerNotInOptions { location: String, answer: String },
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
  #[error("content generator unavailable: {0}")]
  Unavailable(String),

  #[error("provider HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("provider transport error: {0}")]
  Transport(String),

  #[error("malformed provider payload: {0}")]
  Malformed(String),

  #[error("generation timed out after {0:?}")]
  Timeout(Duration),

  #[error("generated mission failed integrity check: {0}")]
  Integrity(#[from] IntegrityError),
}

impl From<reqwest::Error> for GenerationError {
  fn from(e: reqwest::Error) -> Self {
    GenerationError::Transport(e.to_string())
  }
}

/// Write failure on a cache tier. Non-fatal by contract.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
  #[error("cache I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("cache serialization error: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("remote store HTTP {0}")]
  Http(u16),

  #[error("remote store transport error: {0}")]
  Transport(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
  #[error("mission generation failed: {0}")]
  Generation(#[from] GenerationError),

  #[error("mission rejected: {0}")]
  Integrity(#[from] IntegrityError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
  #[error("action `{action}` is not allowed in phase {phase:?}")]
  WrongPhase { action: &'static str, phase: Phase },

  #[error("familiar domain, complex domain and goal must be selected first")]
  IncompleteSelection,

  #[error("no mission attached to this session")]
  NoMission,

  #[error("mission rejected: {0}")]
  Integrity(#[from] IntegrityError),
}

/// Errors surfaced over HTTP/WS.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("unknown session: {0}")]
  UnknownSession(String),

  #[error("unknown domain: {0}")]
  UnknownDomain(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Session(#[from] SessionError),

  #[error(transparent)]
  Resolve(#[from] ResolveError),
}

impl ApiError {
  pub fn kind(&self) -> &'static str {
    match self {
      ApiError::UnknownSession(_) => "unknown_session",
      ApiError::UnknownDomain(_) => "unknown_domain",
      ApiError::BadRequest(_) => "bad_request",
      ApiError::Session(SessionError::Integrity(_)) => "integrity",
      ApiError::Session(_) => "session",
      ApiError::Resolve(ResolveError::Integrity(_)) => "integrity",
      ApiError::Resolve(ResolveError::Generation(_)) => "generation",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::UnknownSession(_) | ApiError::UnknownDomain(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Session(SessionError::Integrity(_)) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Session(_) => StatusCode::CONFLICT,
      ApiError::Resolve(ResolveError::Integrity(_)) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Resolve(ResolveError::Generation(_)) => StatusCode::BAD_GATEWAY,
    }
  }
}

#[derive(Serialize)]
struct ErrorBody {
  error: String,
  kind: &'static str,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> axum::response::Response {
    let body = ErrorBody { error: self.to_string(), kind: self.kind() };
    (self.status(), Json(body)).into_response()
  }
}
