//! Shared ("global") mission store client.
//!
//! Firebase realtime-database style REST: `GET/PUT {base}/missions/{key}.json`,
//! plus `POST {base}/feedback.json` for learner feedback.
//! A JSON `null` body means the key does not exist.
//!
//! When the project id or credential is missing or still a placeholder, every
//! call completes immediately without touching the network, and the system runs
//! with local caching only.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tracing::{debug, info, instrument, warn};

use crate::domain::{Feedback, Mission};
use crate::error::PersistenceError;

const PLACEHOLDER_PROJECT: &str = "YOUR_PROJECT_ID";
const PLACEHOLDER_KEY: &str = "YOUR_API_KEY";

#[async_trait]
pub trait RemoteStore: Send + Sync {
  fn is_configured(&self) -> bool;
  /// Never errors: non-success, transport failure and "not found" all read as `None`.
  async fn get_mission(&self, key: &str) -> Option<Mission>;
  async fn save_mission(&self, key: &str, mission: &Mission) -> Result<(), PersistenceError>;
  /// True only when the store accepted the feedback. Unconfigured stores return false.
  async fn sync_feedback(&self, feedback: &Feedback) -> bool;
}

#[derive(Clone, Debug, Default)]
pub struct RemoteConfig {
  pub project_id: String,
  pub api_key: String,
  /// Overrides `https://{project_id}.firebaseio.com`.
  pub base_url: Option<String>,
}

impl RemoteConfig {
  pub fn from_env() -> Self {
    Self {
      project_id: std::env::var("REMOTE_PROJECT_ID").unwrap_or_default(),
      api_key: std::env::var("REMOTE_API_KEY").unwrap_or_default(),
      base_url: std::env::var("REMOTE_BASE_URL").ok().filter(|s| !s.trim().is_empty()),
    }
  }

  pub fn is_configured(&self) -> bool {
    let real = |s: &str, placeholder: &str| !s.trim().is_empty() && s != placeholder;
    real(&self.project_id, PLACEHOLDER_PROJECT) && real(&self.api_key, PLACEHOLDER_KEY)
  }

  fn base(&self) -> String {
    match &self.base_url {
      Some(b) => b.trim_end_matches('/').to_string(),
      None => format!("https://{}.firebaseio.com", self.project_id),
    }
  }
}

#[derive(Clone)]
pub struct FirebaseStore {
  client: reqwest::Client,
  config: RemoteConfig,
}

impl FirebaseStore {
  pub fn new(config: RemoteConfig) -> Self {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .unwrap_or_else(|_| reqwest::Client::new());
    if config.is_configured() {
      info!(target: "playner_backend", base = %config.base(), "Remote mission store enabled.");
    } else {
      info!(target: "playner_backend", "Remote mission store not configured; local caching only.");
    }
    Self { client, config }
  }

  fn mission_url(&self, key: &str) -> String {
    format!("{}/missions/{}.json", self.config.base(), key)
  }

  fn feedback_url(&self) -> String {
    format!("{}/feedback.json", self.config.base())
  }

  fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    req.query(&[("auth", self.config.api_key.as_str())])
  }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
  fn is_configured(&self) -> bool {
    self.config.is_configured()
  }

  #[instrument(level = "debug", skip(self), fields(%key))]
  async fn get_mission(&self, key: &str) -> Option<Mission> {
    if !self.is_configured() {
      return None;
    }
    let req = self
      .with_auth(self.client.get(self.mission_url(key)))
      .header(USER_AGENT, "playner-backend/0.1");
    let res = match req.send().await {
      Ok(r) => r,
      Err(e) => {
        warn!(target: "mission", %key, error = %e, "Remote store fetch failed");
        return None;
      }
    };
    if !res.status().is_success() {
      debug!(target: "mission", %key, status = %res.status(), "Remote store returned non-success");
      return None;
    }
    match res.json::<Option<Mission>>().await {
      Ok(found) => found,
      Err(e) => {
        warn!(target: "mission", %key, error = %e, "Remote store payload unreadable");
        None
      }
    }
  }

  #[instrument(level = "debug", skip(self, mission), fields(%key))]
  async fn save_mission(&self, key: &str, mission: &Mission) -> Result<(), PersistenceError> {
    if !self.is_configured() {
      return Ok(());
    }
    let res = self
      .with_auth(self.client.put(self.mission_url(key)))
      .header(USER_AGENT, "playner-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(mission)
      .send()
      .await?;
    if !res.status().is_success() {
      return Err(PersistenceError::Http(res.status().as_u16()));
    }
    info!(target: "mission", %key, "Mission saved to shared store");
    Ok(())
  }

  #[instrument(level = "debug", skip_all)]
  async fn sync_feedback(&self, feedback: &Feedback) -> bool {
    if !self.is_configured() {
      return false;
    }
    let res = self
      .with_auth(self.client.post(self.feedback_url()))
      .header(USER_AGENT, "playner-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(feedback)
      .send()
      .await;
    match res {
      Ok(r) if r.status().is_success() => true,
      Ok(r) => {
        warn!(target: "playner_backend", status = %r.status(), "Feedback sync rejected");
        false
      }
      Err(e) => {
        warn!(target: "playner_backend", error = %e, "Feedback sync failed");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::sample_mission;

  fn cfg(project: &str, key: &str) -> RemoteConfig {
    RemoteConfig { project_id: project.into(), api_key: key.into(), base_url: None }
  }

  #[test]
  fn placeholders_and_blanks_are_unconfigured() {
    assert!(!cfg("", "").is_configured());
    assert!(!cfg("YOUR_PROJECT_ID", "real-key").is_configured());
    assert!(!cfg("playner-prod", "YOUR_API_KEY").is_configured());
    assert!(!cfg("playner-prod", "   ").is_configured());
    assert!(cfg("playner-prod", "real-key").is_configured());
  }

  #[test]
  fn mission_url_uses_project_or_override() {
    let store = FirebaseStore::new(cfg("playner-prod", "k"));
    assert_eq!(store.mission_url("a_b_c"), "https://playner-prod.firebaseio.com/missions/a_b_c.json");

    let mut c = cfg("playner-prod", "k");
    c.base_url = Some("http://127.0.0.1:9000/".into());
    let store = FirebaseStore::new(c);
    assert_eq!(store.mission_url("a_b_c"), "http://127.0.0.1:9000/missions/a_b_c.json");
    assert_eq!(store.feedback_url(), "http://127.0.0.1:9000/feedback.json");
  }

  #[tokio::test]
  async fn unconfigured_store_is_a_no_op() {
    // Unroutable base: any real request would fail or hang, a no-op returns at once.
    let mut c = cfg("YOUR_PROJECT_ID", "YOUR_API_KEY");
    c.base_url = Some("http://10.255.255.1:1".into());
    let store = FirebaseStore::new(c);
    assert!(store.get_mission("a_b_c").await.is_none());
    assert!(store.save_mission("a_b_c", &sample_mission("alpha")).await.is_ok());
    let fb = Feedback { session_id: None, message: "great".into(), rating: Some(5), timestamp_ms: 0 };
    assert!(!store.sync_feedback(&fb).await);
  }
}
