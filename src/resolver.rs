//! Mission resolution: the single entry point that turns (familiar, complex, goal)
//! into playable content.
//!
//! Lookup order, strictly sequential and short-circuiting:
//!   1. precomputed bank (curated, then the session memo)
//!   2. local cache            (hit is promoted into the memo)
//!   3. shared remote store    (hit is written to the local cache and the memo)
//!   4. generation             (shuffled, validated, written to the memo, local, then remote)
//!
//! Misses and write failures on tiers 2-3 never surface. Generation and
//! integrity failures are the only errors returned.
//!
//! Concurrent requests for the same key are serialized past the bank tier so at
//! most one generation per key is in flight; waiters re-read the caches.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::bank::PrecomputedBank;
use crate::cache::MissionCache;
use crate::domain::{DomainOption, Mission, MissionSource};
use crate::error::{GenerationError, ResolveError};
use crate::key::normalize_key;
use crate::openai::MissionGenerator;
use crate::remote::RemoteStore;
use crate::shuffle::shuffle_mission;

/// Outcome of a successful resolution.
#[derive(Debug)]
pub struct Resolved {
  pub key: String,
  pub mission: Arc<Mission>,
  pub source: MissionSource,
  /// Background write to the shared store, when one was started.
  pub remote_write: Option<JoinHandle<()>>,
}

pub struct MissionResolver {
  bank: Arc<PrecomputedBank>,
  local: Arc<dyn MissionCache>,
  remote: Arc<dyn RemoteStore>,
  generator: Option<Arc<dyn MissionGenerator>>,
  generation_timeout: Duration,
  inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MissionResolver {
  pub fn new(
    bank: Arc<PrecomputedBank>,
    local: Arc<dyn MissionCache>,
    remote: Arc<dyn RemoteStore>,
    generator: Option<Arc<dyn MissionGenerator>>,
    generation_timeout: Duration,
  ) -> Self {
    Self { bank, local, remote, generator, generation_timeout, inflight: Mutex::new(HashMap::new()) }
  }

  pub fn bank(&self) -> &PrecomputedBank {
    &self.bank
  }

  pub fn remote(&self) -> &dyn RemoteStore {
    self.remote.as_ref()
  }

  pub fn has_generator(&self) -> bool {
    self.generator.is_some()
  }

  pub async fn resolve_mission(
    &self,
    familiar: &DomainOption,
    complex: &DomainOption,
    goal: &str,
  ) -> Result<Resolved, ResolveError> {
    self.resolve_labels(&familiar.label, &complex.label, goal).await
  }

  #[instrument(level = "info", skip(self), fields(key))]
  pub async fn resolve_labels(&self, familiar: &str, complex: &str, goal: &str) -> Result<Resolved, ResolveError> {
    let key = normalize_key(familiar, complex, goal);
    tracing::Span::current().record("key", key.as_str());

    if let Some((mission, source)) = self.bank.lookup(&key).await {
      info!(target: "mission", %key, source = source.as_str(), "Served from precomputed bank");
      return Ok(Resolved { key, mission, source, remote_write: None });
    }

    let gate = self.gate_for(&key).await;
    let result = {
      let _held = gate.lock().await;
      self.resolve_past_bank(key.clone(), familiar, complex, goal).await
    };
    self.release_gate(&key, gate).await;
    result
  }

  async fn resolve_past_bank(
    &self,
    key: String,
    familiar: &str,
    complex: &str,
    goal: &str,
  ) -> Result<Resolved, ResolveError> {
    if let Some(m) = self.local.get(&key).await {
      match m.validate() {
        Ok(()) => {
          let mission = Arc::new(m);
          self.bank.remember(&key, mission.clone()).await;
          info!(target: "mission", %key, source = "local_cache", "Served from local cache");
          return Ok(Resolved { key, mission, source: MissionSource::LocalCache, remote_write: None });
        }
        Err(e) => warn!(target: "mission", %key, error = %e, "Local cache entry failed integrity check; treating as miss"),
      }
    }

    if self.remote.is_configured() {
      if let Some(m) = self.remote.get_mission(&key).await {
        match m.validate() {
          Ok(()) => {
            self.write_local(&key, &m).await;
            let mission = Arc::new(m);
            self.bank.remember(&key, mission.clone()).await;
            info!(target: "mission", %key, source = "remote", "Served from shared store");
            return Ok(Resolved { key, mission, source: MissionSource::Remote, remote_write: None });
          }
          Err(e) => warn!(target: "mission", %key, error = %e, "Shared store entry failed integrity check; treating as miss"),
        }
      }
    } else {
      debug!(target: "mission", %key, "Shared store not configured; skipping");
    }

    let raw = self.generate(familiar, complex, goal).await?;
    let mission = shuffle_mission(&raw, &mut rand::thread_rng());
    mission.validate()?;

    self.write_local(&key, &mission).await;
    let mission = Arc::new(mission);
    self.bank.remember(&key, mission.clone()).await;
    let remote_write = self.spawn_remote_save(&key, mission.clone());
    info!(target: "mission", %key, source = "generated", modules = mission.modules.len(), questions = mission.question_count(), "Generated new mission");
    Ok(Resolved { key, mission, source: MissionSource::Generated, remote_write })
  }

  async fn generate(&self, familiar: &str, complex: &str, goal: &str) -> Result<Mission, GenerationError> {
    let Some(generator) = &self.generator else {
      error!(target: "mission", "No content generator configured (OPENAI_API_KEY not set)");
      return Err(GenerationError::Unavailable("no generator configured".into()));
    };
    match tokio::time::timeout(self.generation_timeout, generator.generate(familiar, complex, goal)).await {
      Ok(Ok(m)) => Ok(m),
      Ok(Err(e)) => {
        error!(target: "mission", error = %e, "Mission generation failed");
        Err(e)
      }
      Err(_) => {
        error!(target: "mission", timeout = ?self.generation_timeout, "Mission generation timed out");
        Err(GenerationError::Timeout(self.generation_timeout))
      }
    }
  }

  async fn write_local(&self, key: &str, mission: &Mission) {
    if let Err(e) = self.local.set(key, mission).await {
      warn!(target: "mission", %key, error = %e, "Local cache write failed; continuing");
    }
  }

  fn spawn_remote_save(&self, key: &str, mission: Arc<Mission>) -> Option<JoinHandle<()>> {
    if !self.remote.is_configured() {
      return None;
    }
    let remote = self.remote.clone();
    let key = key.to_string();
    Some(tokio::spawn(async move {
      if let Err(e) = remote.save_mission(&key, &mission).await {
        warn!(target: "mission", %key, error = %e, "Shared store write failed; local copy kept");
      }
    }))
  }

  async fn gate_for(&self, key: &str) -> Arc<Mutex<()>> {
    let mut map = self.inflight.lock().await;
    map.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
  }

  async fn release_gate(&self, key: &str, gate: Arc<Mutex<()>>) {
    let mut map = self.inflight.lock().await;
    // Map + our handle; anyone else still holds a clone and will release later.
    if Arc::strong_count(&gate) <= 2 {
      map.remove(key);
    }
  }
}
