//! Mission content generator backed by an OpenAI-compatible chat.completions API.
//!
//! One call per mission: the instruction prompt plus a strict JSON schema
//! (`response_format = json_schema`). The reply is parsed into `Mission` and
//! validated; anything else is a `GenerationError`, never partial content.
//!
//! NOTE: We never log the API key or payload contents, only sizes, latency and usage.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, instrument};

use crate::config::{GenerationCfg, Prompts};
use crate::domain::Mission;
use crate::error::GenerationError;
use crate::util::{fill_template, trunc_for_log};

/// External content provider seam. Slow and fallible by nature.
#[async_trait]
pub trait MissionGenerator: Send + Sync {
  async fn generate(&self, familiar: &str, complex: &str, goal: &str) -> Result<Mission, GenerationError>;
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub prompts: Prompts,
  pub temperature: f32,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env(prompts: Prompts, generation: &GenerationCfg) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into());

    // The resolver applies its own deadline too; this one bounds the socket.
    let client = client_or_log(
      reqwest::Client::builder()
        .timeout(Duration::from_secs(generation.timeout_secs))
        .build(),
    )?;

    Some(Self { client, api_key, base_url, model, prompts, temperature: generation.temperature })
  }

  /// JSON-schema chat completion. Returns the raw message content.
  #[instrument(level = "info", skip(self, system, user, schema), fields(model = %self.model))]
  async fn chat_schema(&self, system: &str, user: &str, schema: Value) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature: self.temperature,
      response_format: ResponseFormat {
        r#type: "json_schema".into(),
        json_schema: JsonSchemaFormat { name: "mission".into(), strict: true, schema },
      },
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "playner-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
      return Err(GenerationError::Http { status, message });
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| GenerationError::Malformed(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .filter(|t| !t.trim().is_empty())
      .ok_or_else(|| GenerationError::Malformed("empty completion".into()))
  }
}

#[async_trait]
impl MissionGenerator for OpenAI {
  #[instrument(level = "info", skip(self), fields(model = %self.model))]
  async fn generate(&self, familiar: &str, complex: &str, goal: &str) -> Result<Mission, GenerationError> {
    let vars = [("familiar", familiar), ("complex", complex), ("goal", goal)];
    let system = fill_template(&self.prompts.mission_system, &vars);
    let user = fill_template(&self.prompts.mission_user_template, &vars);

    let start = Instant::now();
    let result = self.chat_schema(&system, &user, mission_schema()).await;
    let elapsed = start.elapsed();

    let text = match result {
      Ok(t) => {
        info!(?elapsed, bytes = t.len(), "Model response received");
        t
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during mission generation");
        return Err(e);
      }
    };

    let mission = parse_mission_payload(&text)?;
    info!(
      modules = mission.modules.len(),
      title_preview = %mission.briefing.title.chars().take(40).collect::<String>(),
      "Mission successfully generated"
    );
    Ok(mission)
  }
}

fn client_or_log<T>(built: Result<T, reqwest::Error>) -> Option<T> {
  match built {
    Ok(c) => Some(c),
    Err(e) => {
      error!(target: "playner_backend", error = %e, "OPENAI_API_KEY is set but the HTTP client could not be built; generation disabled");
      None
    }
  }
}

/// Strict parse + contract check of a provider reply.
pub fn parse_mission_payload(text: &str) -> Result<Mission, GenerationError> {
  let mission: Mission = serde_json::from_str(text)
    .map_err(|e| GenerationError::Malformed(format!("JSON parse error: {}", e)))?;
  mission.validate()?;
  Ok(mission)
}

fn step_schema() -> Value {
  json!({
    "type": "object",
    "properties": {
      "question": { "type": "string" },
      "options": { "type": "array", "items": { "type": "string" } },
      "correctAnswer": { "type": "string" },
      "explanation": { "type": "string" },
      "tip": { "type": "string" }
    },
    "required": ["question", "options", "correctAnswer", "explanation", "tip"],
    "additionalProperties": false
  })
}

/// Output schema descriptor mirroring `Mission`.
pub fn mission_schema() -> Value {
  let step = step_schema();
  json!({
    "type": "object",
    "properties": {
      "briefing": {
        "type": "object",
        "properties": {
          "title": { "type": "string" },
          "scenario": { "type": "string" },
          "objective": { "type": "string" }
        },
        "required": ["title", "scenario", "objective"],
        "additionalProperties": false
      },
      "modules": {
        "type": "array",
        "items": {
          "type": "object",
          "properties": {
            "id": { "type": "string" },
            "conceptName": { "type": "string" },
            "bridgeKeywords": {
              "type": "object",
              "properties": {
                "familiar": { "type": "array", "items": { "type": "string" } },
                "complex": { "type": "array", "items": { "type": "string" } }
              },
              "required": ["familiar", "complex"],
              "additionalProperties": false
            },
            "prime": step,
            "bridge": step,
            "infer": step,
            "reinforce": step,
            "capstone": step,
            "synthesis": { "type": "string" }
          },
          "required": ["id", "conceptName", "bridgeKeywords", "prime", "bridge", "infer", "reinforce", "capstone", "synthesis"],
          "additionalProperties": false
        }
      },
      "finalChallenge": step
    },
    "required": ["briefing", "modules", "finalChallenge"],
    "additionalProperties": false
  })
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  response_format: ResponseFormat,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")] r#type: String,
  json_schema: JsonSchemaFormat,
}
#[derive(Serialize)]
struct JsonSchemaFormat { name: String, strict: bool, schema: Value }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
