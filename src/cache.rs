//! Local (device-scoped) mission cache.
//!
//! `FileCache` keeps one JSON document per key under a directory, file names
//! prefixed so the directory can be shared with other data. Long keys are
//! shortened with a content hash. `MemoryCache` is the
//! process-local variant used when no cache directory is configured.
//!
//! Reads never fail: a missing or unparsable entry is a miss. Writes overwrite
//! unconditionally (last write wins) and report errors for the caller to log.

use std::{collections::HashMap, path::PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::domain::Mission;
use crate::error::PersistenceError;

const FILE_PREFIX: &str = "playner_cache_";
const MAX_PLAIN_KEY_LEN: usize = 120;
const HASHED_PREFIX_CHARS: usize = 64;

#[async_trait]
pub trait MissionCache: Send + Sync {
  async fn get(&self, key: &str) -> Option<Mission>;
  async fn set(&self, key: &str, mission: &Mission) -> Result<(), PersistenceError>;
}

pub struct FileCache {
  dir: PathBuf,
}

impl FileCache {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &std::path::Path {
    &self.dir
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.dir.join(file_name_for(key))
  }
}

/// Short keys map to `playner_cache_{key}.json`. Longer keys keep a readable
/// prefix plus the SHA-256 of the full key, so names stay under filesystem limits.
fn file_name_for(key: &str) -> String {
  if key.len() <= MAX_PLAIN_KEY_LEN {
    return format!("{FILE_PREFIX}{key}.json");
  }
  let prefix: String = key.chars().take(HASHED_PREFIX_CHARS).collect();
  let digest = Sha256::digest(key.as_bytes());
  format!("{FILE_PREFIX}{prefix}_{:x}.json", digest)
}

#[async_trait]
impl MissionCache for FileCache {
  #[instrument(level = "debug", skip(self), fields(%key))]
  async fn get(&self, key: &str) -> Option<Mission> {
    let path = self.path_for(key);
    let raw = match tokio::fs::read_to_string(&path).await {
      Ok(s) => s,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
      Err(e) => {
        warn!(target: "mission", %key, error = %e, "Local cache read failed; treating as miss");
        return None;
      }
    };
    match serde_json::from_str::<Mission>(&raw) {
      Ok(m) => {
        debug!(target: "mission", %key, bytes = raw.len(), "Local cache hit");
        Some(m)
      }
      Err(e) => {
        warn!(target: "mission", %key, error = %e, "Corrupt local cache entry; treating as miss");
        None
      }
    }
  }

  #[instrument(level = "debug", skip(self, mission), fields(%key))]
  async fn set(&self, key: &str, mission: &Mission) -> Result<(), PersistenceError> {
    let body = serde_json::to_vec(mission)?;
    tokio::fs::create_dir_all(&self.dir).await?;
    // Entries are replaced atomically.
    let path = self.path_for(key);
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &body).await?;
    tokio::fs::rename(&tmp, &path).await?;
    debug!(target: "mission", %key, bytes = body.len(), "Local cache entry written");
    Ok(())
  }
}

#[derive(Default)]
pub struct MemoryCache {
  entries: RwLock<HashMap<String, Mission>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl MissionCache for MemoryCache {
  async fn get(&self, key: &str) -> Option<Mission> {
    self.entries.read().await.get(key).cloned()
  }

  async fn set(&self, key: &str, mission: &Mission) -> Result<(), PersistenceError> {
    self.entries.write().await.insert(key.to_string(), mission.clone());
    Ok(())
  }
}
