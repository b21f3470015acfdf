//! Lightweight learner-action log. Keeps the most recent events in memory and
//! mirrors each one to tracing under the `analytics` target.

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::util::now_ms;

const MAX_EVENTS: usize = 100;

#[derive(Clone, Debug, Serialize)]
pub struct AnalyticsEvent {
  pub id: String,
  pub timestamp_ms: u64,
  pub name: String,
  pub properties: Value,
  pub session_id: String,
}

pub struct Analytics {
  enabled: bool,
  events: RwLock<VecDeque<AnalyticsEvent>>,
}

impl Analytics {
  pub fn new(enabled: bool) -> Self {
    Self { enabled, events: RwLock::new(VecDeque::with_capacity(MAX_EVENTS)) }
  }

  /// ANALYTICS_ENABLED: anything but "0"/"false" (or unset) keeps it on.
  pub fn from_env() -> Self {
    let enabled = !matches!(
      std::env::var("ANALYTICS_ENABLED").as_deref().map(str::trim),
      Ok("0") | Ok("false")
    );
    Self::new(enabled)
  }

  pub async fn track(&self, session_id: &str, name: &str, properties: Value) {
    if !self.enabled {
      return;
    }
    let event = AnalyticsEvent {
      id: format!("evt_{}", Uuid::new_v4().simple()),
      timestamp_ms: now_ms(),
      name: name.to_string(),
      properties,
      session_id: session_id.to_string(),
    };
    info!(target: "analytics", name = %event.name, session = %event.session_id, properties = %event.properties, "event");

    let mut events = self.events.write().await;
    if events.len() == MAX_EVENTS {
      events.pop_front();
    }
    events.push_back(event);
  }

  /// Newest first.
  pub async fn recent(&self) -> Vec<AnalyticsEvent> {
    self.events.read().await.iter().rev().cloned().collect()
  }

  pub async fn clear(&self) {
    self.events.write().await.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn keeps_newest_hundred_newest_first() {
    let a = Analytics::new(true);
    for i in 0..120 {
      a.track("s", "answer_submitted", json!({ "n": i })).await;
    }
    let events = a.recent().await;
    assert_eq!(events.len(), 100);
    assert_eq!(events[0].properties["n"], 119);
    assert_eq!(events[99].properties["n"], 20);
    assert!(events[0].id.starts_with("evt_"));
  }

  #[tokio::test]
  async fn disabled_collector_records_nothing() {
    let a = Analytics::new(false);
    a.track("s", "mission_requested", json!({})).await;
    assert!(a.recent().await.is_empty());
  }

  #[tokio::test]
  async fn clear_empties_the_log() {
    let a = Analytics::new(true);
    a.track("s", "x", json!({})).await;
    a.clear().await;
    assert!(a.recent().await.is_empty());
  }
}
