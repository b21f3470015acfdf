//! Test fixtures and tier doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::analytics::Analytics;
use crate::bank::PrecomputedBank;
use crate::cache::{MemoryCache, MissionCache};
use crate::domain::{BridgeKeywords, Briefing, DomainOption, Feedback, Mission, MissionModule, MissionStep};
use crate::error::{GenerationError, PersistenceError};
use crate::openai::MissionGenerator;
use crate::remote::RemoteStore;
use crate::resolver::MissionResolver;
use crate::seeds::precomputed_missions;
use crate::state::AppState;

pub fn sample_step(question: &str, correct: &str) -> MissionStep {
  MissionStep {
    question: question.to_string(),
    options: vec![
      correct.to_string(),
      format!("{correct} (distractor 1)"),
      format!("{correct} (distractor 2)"),
      format!("{correct} (distractor 3)"),
    ],
    correct_answer: correct.to_string(),
    explanation: format!("{correct} is right."),
    tip: Some("Think it through.".into()),
    tags: vec![],
    image_prompt: None,
    image_url: None,
  }
}

fn sample_module(tag: &str, idx: usize) -> MissionModule {
  MissionModule {
    id: format!("{tag}_{idx}"),
    concept_name: format!("{tag} concept {idx}"),
    bridge_keywords: BridgeKeywords {
      familiar: vec!["Grid".into(), "Draw".into()],
      complex: vec!["Portfolio".into(), "Equilibrium".into()],
    },
    prime: sample_step(&format!("{tag} prime {idx}?"), &format!("{tag}-prime-{idx}")),
    bridge: sample_step(&format!("{tag} bridge {idx}?"), &format!("{tag}-bridge-{idx}")),
    infer: sample_step(&format!("{tag} infer {idx}?"), &format!("{tag}-infer-{idx}")),
    reinforce: sample_step(&format!("{tag} reinforce {idx}?"), &format!("{tag}-reinforce-{idx}")),
    capstone: sample_step(&format!("{tag} capstone {idx}?"), &format!("{tag}-capstone-{idx}")),
    synthesis: format!("{tag} synthesis {idx}."),
  }
}

/// One-module mission whose text is tagged so tests can tell sources apart.
pub fn sample_mission(tag: &str) -> Mission {
  sample_mission_with_modules(tag, 1)
}

pub fn sample_mission_with_modules(tag: &str, modules: usize) -> Mission {
  Mission {
    briefing: Briefing {
      title: format!("Operation: {tag}"),
      scenario: format!("{tag} scenario"),
      objective: format!("{tag} objective"),
    },
    modules: (0..modules).map(|i| sample_module(tag, i)).collect(),
    final_challenge: sample_step(&format!("{tag} final?"), &format!("{tag}-final")),
  }
}

pub fn domain(id: &str, label: &str) -> DomainOption {
  DomainOption {
    id: id.into(),
    label: label.into(),
    icon: "*".into(),
    description: format!("{label} description"),
    suggested_goals: vec![],
    keywords: vec![],
  }
}

pub enum StubReply {
  Mission(Mission),
  Fail(String),
}

/// Generator double that counts calls and returns a canned reply.
pub struct StubGenerator {
  pub calls: AtomicUsize,
  reply: StubReply,
  delay: Option<Duration>,
}

impl StubGenerator {
  pub fn returning(m: Mission) -> Self {
    Self { calls: AtomicUsize::new(0), reply: StubReply::Mission(m), delay: None }
  }

  pub fn failing(msg: &str) -> Self {
    Self { calls: AtomicUsize::new(0), reply: StubReply::Fail(msg.into()), delay: None }
  }

  pub fn with_delay(mut self, d: Duration) -> Self {
    self.delay = Some(d);
    self
  }

  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl MissionGenerator for StubGenerator {
  async fn generate(&self, _familiar: &str, _complex: &str, _goal: &str) -> Result<Mission, GenerationError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(d) = self.delay {
      tokio::time::sleep(d).await;
    }
    match &self.reply {
      StubReply::Mission(m) => Ok(m.clone()),
      StubReply::Fail(msg) => Err(GenerationError::Malformed(msg.clone())),
    }
  }
}

/// Shared-store double backed by a map.
pub struct MemoryRemote {
  pub data: Mutex<HashMap<String, Mission>>,
  pub feedback: Mutex<Vec<Feedback>>,
  pub gets: AtomicUsize,
  pub saves: AtomicUsize,
  configured: bool,
  fail_saves: bool,
}

impl MemoryRemote {
  pub fn new() -> Self {
    Self {
      data: Mutex::new(HashMap::new()),
      feedback: Mutex::new(Vec::new()),
      gets: AtomicUsize::new(0),
      saves: AtomicUsize::new(0),
      configured: true,
      fail_saves: false,
    }
  }

  /// Holds data but reports itself unconfigured, like a store without credentials.
  pub fn unconfigured() -> Self {
    Self { configured: false, ..Self::new() }
  }

  /// Every save attempt is counted and then rejected.
  pub fn failing_saves() -> Self {
    Self { fail_saves: true, ..Self::new() }
  }

  pub async fn seed(&self, key: &str, m: Mission) {
    self.data.lock().await.insert(key.to_string(), m);
  }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
  fn is_configured(&self) -> bool {
    self.configured
  }

  async fn get_mission(&self, key: &str) -> Option<Mission> {
    self.gets.fetch_add(1, Ordering::SeqCst);
    self.data.lock().await.get(key).cloned()
  }

  async fn save_mission(&self, key: &str, mission: &Mission) -> Result<(), PersistenceError> {
    self.saves.fetch_add(1, Ordering::SeqCst);
    if self.fail_saves {
      return Err(PersistenceError::Http(503));
    }
    self.data.lock().await.insert(key.to_string(), mission.clone());
    Ok(())
  }

  async fn sync_feedback(&self, feedback: &Feedback) -> bool {
    if !self.configured {
      return false;
    }
    self.feedback.lock().await.push(feedback.clone());
    true
  }
}

/// Local cache double whose writes always fail and whose reads always miss.
#[derive(Default)]
pub struct FailingCache {
  pub writes: AtomicUsize,
}

#[async_trait]
impl MissionCache for FailingCache {
  async fn get(&self, _key: &str) -> Option<Mission> {
    None
  }

  async fn set(&self, _key: &str, _mission: &Mission) -> Result<(), PersistenceError> {
    self.writes.fetch_add(1, Ordering::SeqCst);
    Err(PersistenceError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
  }
}

/// App state over the shipped bank, in-memory tiers and the given generator.
pub fn test_state(generator: Option<Arc<StubGenerator>>) -> Arc<AppState> {
  test_state_with_remote(Arc::new(MemoryRemote::new()), generator)
}

pub fn test_state_with_remote(remote: Arc<MemoryRemote>, generator: Option<Arc<StubGenerator>>) -> Arc<AppState> {
  let resolver = MissionResolver::new(
    Arc::new(PrecomputedBank::from_entries(precomputed_missions())),
    Arc::new(MemoryCache::new()),
    remote,
    generator.map(|g| g as Arc<dyn MissionGenerator>),
    Duration::from_secs(5),
  );
  Arc::new(AppState::with_resolver(resolver, Analytics::new(true)))
}
