//! Application state: mission resolver and its tiers, domain catalog, live sessions, analytics.
//!
//! This module owns:
//!   - the resolver (precomputed bank, local cache, shared store, generator)
//!   - the familiar/complex domain catalog
//!   - learner sessions by id
//!   - the analytics collector
//!
//! Without OPENAI_API_KEY the service still serves curated and cached missions;
//! anything else fails with a generation error the client can retry.

use std::{collections::HashMap, path::Path, sync::Arc, time::Duration};

use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::analytics::Analytics;
use crate::bank::PrecomputedBank;
use crate::cache::{FileCache, MemoryCache, MissionCache};
use crate::config::{load_agent_config_from_env, load_bank_files};
use crate::domain::DomainOption;
use crate::openai::{MissionGenerator, OpenAI};
use crate::remote::{FirebaseStore, RemoteConfig};
use crate::resolver::MissionResolver;
use crate::seeds::{complex_domains, familiar_domains, precomputed_missions};
use crate::session::Session;

const DEFAULT_CACHE_DIR: &str = "./.playner_cache";
const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<MissionResolver>,
    pub familiar: Arc<Vec<DomainOption>>,
    pub complex: Arc<Vec<DomainOption>>,
    pub sessions: Arc<RwLock<HashMap<String, Session>>>,
    pub analytics: Arc<Analytics>,
    /// Live session cap; the least recently active session is evicted beyond it.
    pub max_sessions: usize,
}

impl AppState {
    /// Build state from env: load config, build the bank, pick cache tiers, init the generator.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg_opt = load_agent_config_from_env();
        let cfg = cfg_opt.clone().unwrap_or_default();

        let mut entries = precomputed_missions();
        if cfg_opt.is_some() {
            let base = std::env::var("AGENT_CONFIG_PATH")
                .ok()
                .and_then(|p| Path::new(&p).parent().map(Path::to_path_buf))
                .unwrap_or_default();
            entries.extend(load_bank_files(&cfg, &base));
        }
        let bank = Arc::new(PrecomputedBank::from_entries(entries));

        let local: Arc<dyn MissionCache> = match std::env::var("MISSION_CACHE_DIR") {
            Ok(dir) if dir.trim().is_empty() => {
                info!(target: "playner_backend", "Local mission cache: in-memory");
                Arc::new(MemoryCache::new())
            }
            other => {
                let cache = FileCache::new(other.unwrap_or_else(|_| DEFAULT_CACHE_DIR.into()));
                info!(target: "playner_backend", dir = %cache.dir().display(), "Local mission cache: on disk");
                Arc::new(cache)
            }
        };

        let remote = Arc::new(FirebaseStore::new(RemoteConfig::from_env()));

        let generator = OpenAI::from_env(cfg.prompts.clone(), &cfg.generation);
        if let Some(oa) = &generator {
            info!(target: "playner_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "playner_backend", "OpenAI disabled (OPENAI_API_KEY unset or client unavailable). Serving curated/cached missions only.");
        }
        let generator = generator.map(|g| Arc::new(g) as Arc<dyn MissionGenerator>);

        let resolver = MissionResolver::new(
            bank,
            local,
            remote,
            generator,
            Duration::from_secs(cfg.generation.timeout_secs),
        );
        let max_sessions = std::env::var("MAX_SESSIONS")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_SESSIONS);
        info!(target: "playner_backend", max_sessions, "Session cap");
        Self::with_resolver(resolver, Analytics::from_env()).with_session_cap(max_sessions)
    }

    /// Assemble state around an already-built resolver (tests substitute tiers here).
    pub fn with_resolver(resolver: MissionResolver, analytics: Analytics) -> Self {
        Self {
            resolver: Arc::new(resolver),
            familiar: Arc::new(familiar_domains()),
            complex: Arc::new(complex_domains()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            analytics: Arc::new(analytics),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_session_cap(mut self, cap: usize) -> Self {
        self.max_sessions = cap.max(1);
        self
    }

    pub fn find_familiar(&self, id: &str) -> Option<DomainOption> {
        self.familiar.iter().find(|d| d.id == id).cloned()
    }

    pub fn find_complex(&self, id: &str) -> Option<DomainOption> {
        self.complex.iter().find(|d| d.id == id).cloned()
    }

    #[instrument(level = "debug", skip(self, s), fields(id = %s.id))]
    pub async fn insert_session(&self, s: Session) {
        let mut sessions = self.sessions.write().await;
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions.values().min_by_key(|v| v.last_active()).map(|v| v.id.clone()) else {
                break;
            };
            sessions.remove(&oldest);
            debug!(target: "session", id = %oldest, "Evicted least recently active session");
        }
        sessions.insert(s.id.clone(), s);
    }

    /// Read-only snapshot of a session by id.
    pub async fn get_session(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{domain, test_state};

    #[tokio::test]
    async fn session_cap_evicts_least_recently_active() {
        let state = (*test_state(None)).clone().with_session_cap(2);
        state.insert_session(Session::new("first")).await;
        state.insert_session(Session::new("second")).await;
        {
            let mut sessions = state.sessions.write().await;
            let first = sessions.get_mut("first").unwrap();
            first.select(domain("ttt", "Tic-Tac-Toe"), domain("pm", "Project Mgmt"), "Read a Gantt Chart").unwrap();
        }

        state.insert_session(Session::new("third")).await;
        let sessions = state.sessions.read().await;
        assert_eq!(sessions.len(), 2);
        assert!(sessions.contains_key("first"));
        assert!(sessions.contains_key("third"));
        assert!(!sessions.contains_key("second"));
    }
}
