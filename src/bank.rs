//! Precomputed bank: curated missions keyed by normalized triple, plus a session memo.
//!
//! The curated table is filled once at startup and is never written afterwards.
//! The memo holds missions promoted from the local cache so repeat requests in the
//! same process skip disk I/O. Curated entries always win over the memo.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::{error, info, instrument};

use crate::domain::{Mission, MissionSource};
use crate::key::normalize_key;

/// One curated entry before key derivation.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct BankEntry {
  pub familiar: String,
  pub complex: String,
  pub goal: String,
  pub mission: Mission,
}

#[derive(Default)]
pub struct PrecomputedBank {
  curated: HashMap<String, Arc<Mission>>,
  memo: RwLock<HashMap<String, Arc<Mission>>>,
}

impl PrecomputedBank {
  /// Build from curated entries. Entries failing validation are dropped and logged.
  #[instrument(level = "info", skip_all, fields(entries = entries.len()))]
  pub fn from_entries(entries: Vec<BankEntry>) -> Self {
    let mut curated = HashMap::new();
    for e in entries {
      let key = normalize_key(&e.familiar, &e.complex, &e.goal);
      if let Err(err) = e.mission.validate() {
        error!(target: "mission", %key, error = %err, "Skipping invalid curated mission");
        continue;
      }
      curated.insert(key, Arc::new(e.mission));
    }
    info!(target: "mission", curated = curated.len(), "Precomputed bank ready");
    Self { curated, memo: RwLock::new(HashMap::new()) }
  }

  pub fn curated_len(&self) -> usize {
    self.curated.len()
  }

  /// Curated hits report `Precomputed`; memo hits report `LocalCache`, where they came from.
  pub async fn lookup(&self, key: &str) -> Option<(Arc<Mission>, MissionSource)> {
    if let Some(m) = self.curated.get(key) {
      return Some((m.clone(), MissionSource::Precomputed));
    }
    self.memo.read().await.get(key).map(|m| (m.clone(), MissionSource::LocalCache))
  }

  /// Remember a mission for the rest of the process. Ignored for curated keys.
  pub async fn remember(&self, key: &str, mission: Arc<Mission>) {
    if self.curated.contains_key(key) {
      return;
    }
    self.memo.write().await.insert(key.to_string(), mission);
  }
}
