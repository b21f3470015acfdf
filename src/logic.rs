//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Listing the domain catalog
//!   - Resolving a mission directly from domain ids
//!   - Session lifecycle: create, select, start mission, phase transitions, answers, reset
//!   - Forwarding learner feedback to the shared store
//!   - Reading and clearing recent analytics events

use serde_json::json;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::analytics::AnalyticsEvent;
use crate::domain::{DomainOption, Feedback};
use crate::error::{ApiError, SessionError};
use crate::protocol::{session_view, AnswerOut, DomainsOut, FeedbackIn, FeedbackOut, HealthOut, MissionOut, SessionView};
use crate::session::{Phase, Session};
use crate::state::AppState;
use crate::util::now_ms;

pub fn health(state: &AppState) -> HealthOut {
  HealthOut {
    ok: true,
    generator: state.resolver.has_generator(),
    curated_missions: state.resolver.bank().curated_len(),
  }
}

pub fn list_domains(state: &AppState) -> DomainsOut {
  DomainsOut { familiar: state.familiar.to_vec(), complex: state.complex.to_vec() }
}

fn find_pair(state: &AppState, familiar_id: &str, complex_id: &str) -> Result<(DomainOption, DomainOption), ApiError> {
  let familiar = state
    .find_familiar(familiar_id)
    .ok_or_else(|| ApiError::UnknownDomain(familiar_id.to_string()))?;
  let complex = state
    .find_complex(complex_id)
    .ok_or_else(|| ApiError::UnknownDomain(complex_id.to_string()))?;
  Ok((familiar, complex))
}

/// Resolve a mission outside of any session.
#[instrument(level = "info", skip(state), fields(%familiar_id, %complex_id))]
pub async fn resolve_for_ids(state: &AppState, familiar_id: &str, complex_id: &str, goal: &str) -> Result<MissionOut, ApiError> {
  let (familiar, complex) = find_pair(state, familiar_id, complex_id)?;
  let resolved = state.resolver.resolve_mission(&familiar, &complex, goal).await?;
  info!(target: "mission", key = %resolved.key, source = resolved.source.as_str(), "Mission resolved");
  state
    .analytics
    .track("", "mission_resolved", json!({ "key": resolved.key, "source": resolved.source.as_str() }))
    .await;
  Ok(MissionOut { key: resolved.key, source: resolved.source, mission: (*resolved.mission).clone() })
}

#[instrument(level = "info", skip(state))]
pub async fn create_session(state: &AppState) -> SessionView {
  let s = Session::new(Uuid::new_v4().to_string());
  let view = session_view(&s);
  state.analytics.track(&s.id, "session_created", json!({})).await;
  state.insert_session(s).await;
  view
}

pub async fn get_session_view(state: &AppState, id: &str) -> Result<SessionView, ApiError> {
  state
    .get_session(id)
    .await
    .map(|s| session_view(&s))
    .ok_or_else(|| ApiError::UnknownSession(id.to_string()))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn select_domains(
  state: &AppState,
  id: &str,
  familiar_id: &str,
  complex_id: &str,
  goal: &str,
) -> Result<SessionView, ApiError> {
  let (familiar, complex) = find_pair(state, familiar_id, complex_id)?;
  let view = {
    let mut sessions = state.sessions.write().await;
    let s = sessions.get_mut(id).ok_or_else(|| ApiError::UnknownSession(id.to_string()))?;
    s.select(familiar, complex, goal)?;
    session_view(s)
  };
  state
    .analytics
    .track(id, "domains_selected", json!({ "familiar": familiar_id, "complex": complex_id, "goal": goal }))
    .await;
  Ok(view)
}

/// Resolve the mission for the session's selection and attach it (Setup → Briefing).
/// No lock is held while the resolver runs.
#[instrument(level = "info", skip(state), fields(%id))]
pub async fn start_mission(state: &AppState, id: &str) -> Result<SessionView, ApiError> {
  let (familiar, complex, goal) = {
    let sessions = state.sessions.read().await;
    let s = sessions.get(id).ok_or_else(|| ApiError::UnknownSession(id.to_string()))?;
    if s.phase() != Phase::Setup {
      return Err(SessionError::WrongPhase { action: "start_mission", phase: s.phase() }.into());
    }
    s.selection().ok_or(SessionError::IncompleteSelection)?
  };

  state
    .analytics
    .track(id, "mission_requested", json!({ "familiar": familiar.id, "complex": complex.id, "goal": goal }))
    .await;

  let resolved = match state.resolver.resolve_mission(&familiar, &complex, &goal).await {
    Ok(r) => r,
    Err(e) => {
      error!(target: "mission", session = %id, error = %e, "Mission resolution failed");
      state.analytics.track(id, "mission_failed", json!({ "error": e.to_string() })).await;
      return Err(e.into());
    }
  };
  state
    .analytics
    .track(id, "mission_resolved", json!({ "key": resolved.key, "source": resolved.source.as_str() }))
    .await;

  let mut sessions = state.sessions.write().await;
  let s = sessions.get_mut(id).ok_or_else(|| ApiError::UnknownSession(id.to_string()))?;
  s.attach_mission(resolved.mission)?;
  info!(target: "session", session = %id, key = %resolved.key, source = resolved.source.as_str(), "Mission attached");
  Ok(session_view(s))
}

/// Apply one phase transition to a session under the write lock.
async fn transition<F>(state: &AppState, id: &str, event: &str, f: F) -> Result<SessionView, ApiError>
where
  F: FnOnce(&mut Session) -> Result<(), SessionError>,
{
  let view = {
    let mut sessions = state.sessions.write().await;
    let s = sessions.get_mut(id).ok_or_else(|| ApiError::UnknownSession(id.to_string()))?;
    f(s)?;
    session_view(s)
  };
  state
    .analytics
    .track(id, event, json!({ "phase": view.phase, "moduleIndex": view.module_index }))
    .await;
  Ok(view)
}

pub async fn open_map(state: &AppState, id: &str) -> Result<SessionView, ApiError> {
  transition(state, id, "map_opened", Session::open_map).await
}

pub async fn enter_module(state: &AppState, id: &str) -> Result<SessionView, ApiError> {
  transition(state, id, "module_entered", Session::enter_module).await
}

pub async fn start_questions(state: &AppState, id: &str) -> Result<SessionView, ApiError> {
  transition(state, id, "questions_started", Session::start_questions).await
}

pub async fn advance_module(state: &AppState, id: &str) -> Result<SessionView, ApiError> {
  transition(state, id, "module_advanced", |s| s.advance_module().map(|_| ())).await
}

pub async fn reset_session(state: &AppState, id: &str) -> Result<SessionView, ApiError> {
  transition(state, id, "session_reset", |s| {
    s.reset();
    Ok(())
  })
  .await
}

#[instrument(level = "info", skip(state, answer), fields(%id, answer_len = answer.len()))]
pub async fn submit_answer(state: &AppState, id: &str, answer: &str) -> Result<AnswerOut, ApiError> {
  let (outcome, score) = {
    let mut sessions = state.sessions.write().await;
    let s = sessions.get_mut(id).ok_or_else(|| ApiError::UnknownSession(id.to_string()))?;
    let outcome = s.submit_answer(answer)?;
    (outcome, s.score())
  };
  info!(target: "session", session = %id, question = %outcome.question_id, correct = outcome.is_correct, score, "Answer graded");
  state
    .analytics
    .track(id, "answer_submitted", json!({ "questionId": outcome.question_id, "isCorrect": outcome.is_correct }))
    .await;
  Ok(AnswerOut::from_outcome(outcome, score))
}

#[instrument(level = "info", skip(state, input), fields(message_len = input.message.len()))]
pub async fn submit_feedback(state: &AppState, input: FeedbackIn) -> Result<FeedbackOut, ApiError> {
  let message = input.message.trim();
  if message.is_empty() {
    return Err(ApiError::BadRequest("feedback message is empty".into()));
  }
  if let Some(id) = &input.session_id {
    if state.get_session(id).await.is_none() {
      return Err(ApiError::UnknownSession(id.clone()));
    }
  }
  let feedback = Feedback {
    session_id: input.session_id.clone(),
    message: message.to_string(),
    rating: input.rating,
    timestamp_ms: now_ms(),
  };
  let synced = state.resolver.remote().sync_feedback(&feedback).await;
  info!(target: "playner_backend", synced, "Feedback received");
  state
    .analytics
    .track(input.session_id.as_deref().unwrap_or(""), "feedback_submitted", json!({ "synced": synced, "rating": input.rating }))
    .await;
  Ok(FeedbackOut { synced })
}

pub async fn analytics_recent(state: &AppState) -> Vec<AnalyticsEvent> {
  state.analytics.recent().await
}

pub async fn analytics_clear(state: &AppState) {
  state.analytics.clear().await;
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use crate::domain::MissionSource;
  use crate::key::normalize_key;
  use crate::testing::{sample_mission, test_state, test_state_with_remote, MemoryRemote, StubGenerator};

  async fn answer_current(state: &AppState, id: &str) -> AnswerOut {
    let expected = {
      let sessions = state.sessions.read().await;
      sessions[id].current_step().unwrap().correct_answer.clone()
    };
    submit_answer(state, id, &expected).await.unwrap()
  }

  #[tokio::test]
  async fn full_session_walkthrough_on_generated_mission() {
    let generator = Arc::new(StubGenerator::returning(sample_mission("gen")));
    let state = test_state(Some(generator.clone()));

    let id = create_session(&state).await.id;
    select_domains(&state, &id, "cook", "prob", "Calculate winning odds").await.unwrap();
    let view = start_mission(&state, &id).await.unwrap();
    assert_eq!(view.phase, Phase::Briefing);
    assert_eq!(view.module_count, 1);
    assert_eq!(generator.call_count(), 1);

    open_map(&state, &id).await.unwrap();
    enter_module(&state, &id).await.unwrap();
    let view = start_questions(&state, &id).await.unwrap();
    let step = view.current_step.unwrap();
    assert_eq!(step.question_id, "gen_0:prime");
    assert_eq!(step.options.len(), 4);

    for _ in 0..5 {
      assert!(answer_current(&state, &id).await.correct);
    }
    let view = get_session_view(&state, &id).await.unwrap();
    assert_eq!(view.phase, Phase::Synthesis);
    assert_eq!(view.synthesis.as_deref(), Some("gen synthesis 0."));

    let view = advance_module(&state, &id).await.unwrap();
    assert_eq!(view.phase, Phase::FinalChallenge);
    let out = answer_current(&state, &id).await;
    assert_eq!(out.next_phase, Phase::Summary);
    assert_eq!(out.score, 6);

    let names: Vec<String> = analytics_recent(&state).await.into_iter().map(|e| e.name).collect();
    assert_eq!(names.iter().filter(|n| *n == "answer_submitted").count(), 6);
    assert!(names.contains(&"mission_resolved".to_string()));
  }

  #[tokio::test]
  async fn start_mission_requires_selection() {
    let state = test_state(None);
    let id = create_session(&state).await.id;
    let err = start_mission(&state, &id).await.unwrap_err();
    assert!(matches!(err, ApiError::Session(SessionError::WrongPhase { action: "start_mission", phase: Phase::Home })));
  }

  #[tokio::test]
  async fn failed_generation_leaves_session_in_setup() {
    let state = test_state(Some(Arc::new(StubGenerator::failing("bad json"))));
    let id = create_session(&state).await.id;
    select_domains(&state, &id, "hide", "pm", "Read a Gantt Chart").await.unwrap();

    let err = start_mission(&state, &id).await.unwrap_err();
    assert_eq!(err.kind(), "generation");
    assert_eq!(get_session_view(&state, &id).await.unwrap().phase, Phase::Setup);

    let names: Vec<String> = analytics_recent(&state).await.into_iter().map(|e| e.name).collect();
    assert_eq!(names[0], "mission_failed");
  }

  #[tokio::test]
  async fn curated_triple_resolves_without_generator() {
    let state = test_state(None);
    let out = resolve_for_ids(&state, "nfl", "stocks", "Read a price chart").await.unwrap();
    assert_eq!(out.source, MissionSource::Precomputed);
    assert_eq!(out.key, normalize_key("NFL / Football", "Stock Market", "Read a price chart"));
    assert_eq!(out.key, "nfl--football_stock-market_read-a-price-chart");
  }

  #[tokio::test]
  async fn unknown_ids_are_reported() {
    let state = test_state(None);
    assert!(matches!(
      resolve_for_ids(&state, "chess", "stocks", "x").await,
      Err(ApiError::UnknownDomain(id)) if id == "chess"
    ));
    assert!(matches!(open_map(&state, "nope").await, Err(ApiError::UnknownSession(_))));
  }

  #[tokio::test]
  async fn feedback_reaches_configured_store_only() {
    let remote = Arc::new(MemoryRemote::new());
    let state = test_state_with_remote(remote.clone(), None);
    let id = create_session(&state).await.id;
    let input = FeedbackIn { session_id: Some(id.clone()), message: "  Great bridge analogy ".into(), rating: Some(5) };
    assert!(submit_feedback(&state, input).await.unwrap().synced);
    let stored = remote.feedback.lock().await.clone();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].message, "Great bridge analogy");
    assert_eq!(stored[0].session_id.as_deref(), Some(id.as_str()));

    let offline = test_state_with_remote(Arc::new(MemoryRemote::unconfigured()), None);
    let input = FeedbackIn { session_id: None, message: "hello".into(), rating: None };
    assert!(!submit_feedback(&offline, input).await.unwrap().synced);
    let names: Vec<String> = analytics_recent(&offline).await.into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["feedback_submitted".to_string()]);
  }

  #[tokio::test]
  async fn reset_returns_session_home() {
    let state = test_state(None);
    let id = create_session(&state).await.id;
    select_domains(&state, &id, "nfl", "stocks", "Read a price chart").await.unwrap();
    let view = reset_session(&state, &id).await.unwrap();
    assert_eq!(view.id, id);
    assert_eq!(view.phase, Phase::Home);
    assert!(view.familiar.is_none());
  }
}
