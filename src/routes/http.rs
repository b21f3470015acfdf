//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(health(&state))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_domains(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(list_domains(&state))
}

#[instrument(level = "info", skip(state), fields(familiar = %q.familiar, complex = %q.complex))]
pub async fn http_get_mission(
  State(state): State<Arc<AppState>>,
  Query(q): Query<MissionQuery>,
) -> Result<Json<MissionOut>, ApiError> {
  let out = resolve_for_ids(&state, &q.familiar, &q.complex, &q.goal).await?;
  info!(target: "mission", key = %out.key, source = out.source.as_str(), "HTTP mission served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  (StatusCode::CREATED, Json(create_session(&state).await))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(get_session_view(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body), fields(familiar = %body.familiar, complex = %body.complex))]
pub async fn http_post_select(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<SelectIn>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(select_domains(&state, &id, &body.familiar, &body.complex, &body.goal).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_start_mission(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(start_mission(&state, &id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_open_map(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(open_map(&state, &id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_enter_module(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(enter_module(&state, &id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_start_questions(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(start_questions(&state, &id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_advance_module(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(advance_module(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body), fields(answer_len = body.answer.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<AnswerOut>, ApiError> {
  let out = submit_answer(&state, &id, &body.answer).await?;
  info!(target: "session", session = %id, correct = out.correct, "HTTP submit_answer evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reset(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
  Ok(Json(reset_session(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_feedback(
  State(state): State<Arc<AppState>>,
  Json(body): Json<FeedbackIn>,
) -> Result<Json<FeedbackOut>, ApiError> {
  Ok(Json(submit_feedback(&state, body).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_analytics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(AnalyticsOut { events: analytics_recent(&state).await })
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_analytics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  analytics_clear(&state).await;
  StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
  };
  use serde_json::{json, Value};
  use tower::ServiceExt;

  use crate::routes::build_router;
  use crate::testing::{sample_mission, test_state, StubGenerator};

  async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let req = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(b) => req.header("content-type", "application/json").body(Body::from(b.to_string())),
      None => req.body(Body::empty()),
    }
    .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
  }

  #[tokio::test]
  async fn health_and_domains() {
    let app = build_router(test_state(None));
    let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["generator"], false);
    assert_eq!(body["curated_missions"], 4);

    let (_, body) = call(&app, Method::GET, "/api/v1/domains", None).await;
    assert_eq!(body["familiar"].as_array().unwrap().len(), 5);
    assert_eq!(body["complex"][1]["suggestedGoals"][0], "Read a price chart");
  }

  #[tokio::test]
  async fn mission_endpoint_serves_curated_and_maps_errors() {
    let app = build_router(test_state(None));
    let (status, body) =
      call(&app, Method::GET, "/api/v1/mission?familiar=nfl&complex=stocks&goal=Read%20a%20price%20chart", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "precomputed");
    assert!(body["mission"]["modules"][0]["prime"]["correctAnswer"].is_string());

    let (status, body) = call(&app, Method::GET, "/api/v1/mission?familiar=nfl&complex=stocks&goal=Other", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "generation");

    let (status, body) = call(&app, Method::GET, "/api/v1/mission?familiar=chess&complex=stocks&goal=x", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "unknown_domain");
  }

  #[tokio::test]
  async fn session_flow_over_http() {
    let app = build_router(test_state(Some(Arc::new(StubGenerator::returning(sample_mission("web"))))));

    let (status, body) = call(&app, Method::POST, "/api/v1/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["phase"], "home");
    let id = body["id"].as_str().unwrap().to_string();
    let base = format!("/api/v1/sessions/{id}");

    let (status, _) = call(&app, Method::POST, &format!("{base}/mission"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let sel = json!({ "familiar": "cricket", "complex": "quantum", "goal": "Understand \"Entanglement\"" });
    let (status, body) = call(&app, Method::POST, &format!("{base}/select"), Some(sel)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "setup");

    let (_, body) = call(&app, Method::POST, &format!("{base}/mission"), None).await;
    assert_eq!(body["phase"], "briefing");
    assert_eq!(body["briefing"]["title"], "Operation: web");

    call(&app, Method::POST, &format!("{base}/map"), None).await;
    let (_, body) = call(&app, Method::POST, &format!("{base}/module/enter"), None).await;
    assert_eq!(body["phase"], "word_sync");
    assert_eq!(body["currentModule"]["bridgeKeywords"]["familiar"][0], "Grid");

    let (_, body) = call(&app, Method::POST, &format!("{base}/module/start"), None).await;
    assert_eq!(body["phase"], "prime");
    assert_eq!(body["currentStep"]["questionId"], "web_0:prime");
    assert!(body["currentStep"].get("correctAnswer").is_none());

    let (status, body) = call(&app, Method::POST, &format!("{base}/answer"), Some(json!({ "answer": "nope" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["correct"], false);
    assert_eq!(body["expected"], "web-prime-0");
    assert_eq!(body["nextPhase"], "bridge");
    assert_eq!(body["score"], 0);

    let (_, body) = call(&app, Method::GET, &base, None).await;
    assert_eq!(body["history"][0]["questionId"], "web_0:prime");
    assert_eq!(body["history"][0]["isCorrect"], false);

    let (_, body) = call(&app, Method::POST, &format!("{base}/reset"), None).await;
    assert_eq!(body["phase"], "home");
    assert_eq!(body["id"], id.as_str());
  }

  #[tokio::test]
  async fn unknown_session_is_not_found() {
    let app = build_router(test_state(None));
    let (status, body) = call(&app, Method::GET, "/api/v1/sessions/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "unknown_session");
  }

  #[tokio::test]
  async fn feedback_is_forwarded_and_validated() {
    let app = build_router(test_state(None));
    let (status, body) = call(&app, Method::POST, "/api/v1/feedback", Some(json!({ "message": "Loved the NFL one", "rating": 5 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["synced"], true);

    let (status, body) = call(&app, Method::POST, "/api/v1/feedback", Some(json!({ "message": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");

    let (status, _) =
      call(&app, Method::POST, "/api/v1/feedback", Some(json!({ "message": "hi", "sessionId": "missing" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn analytics_can_be_listed_and_cleared() {
    let app = build_router(test_state(None));
    call(&app, Method::POST, "/api/v1/sessions", None).await;

    let (_, body) = call(&app, Method::GET, "/api/v1/analytics", None).await;
    assert_eq!(body["events"][0]["name"], "session_created");

    let (status, _) = call(&app, Method::DELETE, "/api/v1/analytics", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = call(&app, Method::GET, "/api/v1/analytics", None).await;
    assert!(body["events"].as_array().unwrap().is_empty());
  }
}
