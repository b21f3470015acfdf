//! Loading agent configuration (prompts, generation settings, extra curated missions) from TOML.
//!
//! See `AgentConfig`, `Prompts` and `BankFileCfg` for the expected schema.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use crate::bank::BankEntry;
use crate::domain::Mission;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub generation: GenerationCfg,
  #[serde(default)]
  pub bank: Vec<BankFileCfg>,
}

/// Curated mission stored as a JSON file next to the config.
/// Relative `file` paths resolve against the config file's directory.
#[derive(Clone, Debug, Deserialize)]
pub struct BankFileCfg {
  pub familiar: String,
  pub complex: String,
  pub goal: String,
  pub file: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenerationCfg {
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  #[serde(default = "default_temperature")]
  pub temperature: f32,
}

fn default_timeout_secs() -> u64 { 45 }
fn default_temperature() -> f32 { 0.8 }

impl Default for GenerationCfg {
  fn default() -> Self {
    Self { timeout_secs: default_timeout_secs(), temperature: default_temperature() }
  }
}

/// Prompts used by the mission generator. Placeholders: `{familiar}`, `{complex}`, `{goal}`.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub mission_system: String,
  pub mission_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      mission_system: "You are a pedagogical architect who teaches unfamiliar subjects through analogies to subjects the learner already knows. Respond ONLY with JSON matching the provided schema.".into(),
      mission_user_template: r#"Create a learning mission that bridges "{familiar}" (what the learner knows) to "{complex}" (what they want to learn) for the goal: "{goal}".

Each module follows five steps, in order:
1. prime: activate the learner's intuition about a concrete situation in {familiar}.
2. bridge: draw an explicit analogy. The question MUST describe a concrete {familiar} scenario first, then ask about {complex}.
3. infer: ask the learner to predict a property of the {complex} concept from the analogy.
4. reinforce: state the technical truth about the {complex} concept.
5. capstone: a reasoning question combining both domains.
Close each module with a one-sentence synthesis, and list 3 familiar-side and 3 complex-side bridge keywords.
End with one finalChallenge that applies {complex} directly, without the {familiar} scaffold.

Rules:
- Every question has exactly 4 options and correctAnswer is copied verbatim from options.
- Distractors must be plausible and technically related to the topic.
- Vary the correct answer position evenly; it must not be predictable.
- Every step has a short, encouraging "tip" from the mascot."#.into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AgentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "playner_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "playner_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "playner_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// Read the curated mission files listed in the config. Unreadable files are skipped.
pub fn load_bank_files(cfg: &AgentConfig, base_dir: &Path) -> Vec<BankEntry> {
  let mut out = Vec::new();
  for b in &cfg.bank {
    let path = base_dir.join(&b.file);
    let mission = std::fs::read_to_string(&path)
      .map_err(|e| e.to_string())
      .and_then(|s| serde_json::from_str::<Mission>(&s).map_err(|e| e.to_string()));
    match mission {
      Ok(mission) => out.push(BankEntry {
        familiar: b.familiar.clone(),
        complex: b.complex.clone(),
        goal: b.goal.clone(),
        mission,
      }),
      Err(e) => {
        error!(target: "mission", path = %path.display(), error = %e, "Skipping curated mission file");
      }
    }
  }
  out
}
