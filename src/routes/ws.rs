//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::error::ApiError;
use crate::protocol::{ClientWsMessage, ServerWsMessage, SessionView};
use crate::logic::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "playner_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "playner_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = reply_to_text(&txt, &state).await;
        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "kind": "internal", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "playner_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "playner_backend", "WebSocket disconnected");
}

/// Parse one text frame and produce the reply for it.
async fn reply_to_text(txt: &str, state: &AppState) -> ServerWsMessage {
  match serde_json::from_str::<ClientWsMessage>(txt) {
    Ok(incoming) => {
      debug!(target: "playner_backend", "WS received: {:?}", &incoming);
      handle_client_ws(incoming, state).await
    }
    Err(e) => ServerWsMessage::Error { kind: "bad_request".into(), message: format!("Invalid JSON: {}", e) },
  }
}

fn session_reply(r: Result<SessionView, ApiError>) -> ServerWsMessage {
  match r {
    Ok(session) => ServerWsMessage::Session { session },
    Err(e) => error_reply(e),
  }
}

fn error_reply(e: ApiError) -> ServerWsMessage {
  ServerWsMessage::Error { kind: e.kind().to_string(), message: e.to_string() }
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::ListDomains => ServerWsMessage::Domains(list_domains(state)),

    ClientWsMessage::ResolveMission { familiar, complex, goal } => {
      match resolve_for_ids(state, &familiar, &complex, &goal).await {
        Ok(out) => {
          info!(target: "mission", key = %out.key, source = out.source.as_str(), "WS mission served");
          ServerWsMessage::Mission(out)
        }
        Err(e) => error_reply(e),
      }
    }

    ClientWsMessage::CreateSession => ServerWsMessage::Session { session: create_session(state).await },

    ClientWsMessage::GetSession { session_id } => session_reply(get_session_view(state, &session_id).await),

    ClientWsMessage::SelectDomains { session_id, familiar, complex, goal } =>
      session_reply(select_domains(state, &session_id, &familiar, &complex, &goal).await),

    ClientWsMessage::StartMission { session_id } => session_reply(start_mission(state, &session_id).await),

    ClientWsMessage::OpenMap { session_id } => session_reply(open_map(state, &session_id).await),

    ClientWsMessage::EnterModule { session_id } => session_reply(enter_module(state, &session_id).await),

    ClientWsMessage::StartQuestions { session_id } => session_reply(start_questions(state, &session_id).await),

    ClientWsMessage::AdvanceModule { session_id } => session_reply(advance_module(state, &session_id).await),

    ClientWsMessage::Reset { session_id } => session_reply(reset_session(state, &session_id).await),

    ClientWsMessage::SubmitFeedback(input) => match submit_feedback(state, input).await {
      Ok(out) => ServerWsMessage::FeedbackResult(out),
      Err(e) => error_reply(e),
    },

    ClientWsMessage::SubmitAnswer { session_id, answer } => {
      match submit_answer(state, &session_id, &answer).await {
        Ok(out) => {
          info!(target: "session", session = %session_id, correct = out.correct, "WS submit_answer evaluated");
          ServerWsMessage::AnswerResult(out)
        }
        Err(e) => error_reply(e),
      }
    }
  }
}
