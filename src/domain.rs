//! Domain models: selectable subjects, question steps, bridge modules and the mission itself.
//!
//! Wire names are camelCase so cached/remote payloads stay compatible with the
//! curated JSON bank and with what the frontend already reads.

use serde::{Deserialize, Serialize};

use crate::error::IntegrityError;

/// A selectable subject (familiar or complex side). Defined once at startup.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DomainOption {
  pub id: String,
  pub label: String,
  pub icon: String,
  pub description: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub suggested_goals: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub keywords: Vec<String>,
}

/// Pedagogical role of a question inside a mission.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
  Prime,
  Bridge,
  Infer,
  Reinforce,
  Capstone,
  FinalChallenge,
}

impl StepRole {
  /// Fixed traversal order of the five steps inside a module.
  pub const MODULE_ORDER: [StepRole; 5] = [
    StepRole::Prime,
    StepRole::Bridge,
    StepRole::Infer,
    StepRole::Reinforce,
    StepRole::Capstone,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      StepRole::Prime => "prime",
      StepRole::Bridge => "bridge",
      StepRole::Infer => "infer",
      StepRole::Reinforce => "reinforce",
      StepRole::Capstone => "capstone",
      StepRole::FinalChallenge => "final_challenge",
    }
  }
}

/// One multiple-choice question. `correct_answer` must be an exact member of `options`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MissionStep {
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: String,
  pub explanation: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tip: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_prompt: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_url: Option<String>,
}

impl MissionStep {
  /// Exact string equality, no trimming or case folding.
  pub fn is_correct(&self, answer: &str) -> bool {
    self.correct_answer == answer
  }

  fn validate(&self, location: &str) -> Result<(), IntegrityError> {
    if self.question.trim().is_empty() {
      return Err(IntegrityError::EmptyField { location: location.to_string(), field: "question" });
    }
    if self.options.len() < 2 {
      return Err(IntegrityError::TooFewOptions { location: location.to_string(), found: self.options.len() });
    }
    if !self.options.iter().any(|o| o == &self.correct_answer) {
      return Err(IntegrityError::AnswerNotInOptions {
        location: location.to_string(),
        answer: self.correct_answer.clone(),
      });
    }
    Ok(())
  }
}

/// Terms shown during the familiar → complex keyword transition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct BridgeKeywords {
  pub familiar: Vec<String>,
  pub complex: Vec<String>,
}

/// One analogy bridge unit: five ordered steps plus a closing synthesis sentence.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MissionModule {
  pub id: String,
  pub concept_name: String,
  pub bridge_keywords: BridgeKeywords,
  pub prime: MissionStep,
  pub bridge: MissionStep,
  pub infer: MissionStep,
  pub reinforce: MissionStep,
  pub capstone: MissionStep,
  pub synthesis: String,
}

impl MissionModule {
  pub fn step(&self, role: StepRole) -> Option<&MissionStep> {
    match role {
      StepRole::Prime => Some(&self.prime),
      StepRole::Bridge => Some(&self.bridge),
      StepRole::Infer => Some(&self.infer),
      StepRole::Reinforce => Some(&self.reinforce),
      StepRole::Capstone => Some(&self.capstone),
      StepRole::FinalChallenge => None,
    }
  }

  pub fn steps(&self) -> impl Iterator<Item = (StepRole, &MissionStep)> {
    StepRole::MODULE_ORDER
      .into_iter()
      .filter_map(move |role| self.step(role).map(|s| (role, s)))
  }

  /// Rebuild the module with every step passed through `f`, in traversal order.
  pub fn map_steps(&self, mut f: impl FnMut(&MissionStep) -> MissionStep) -> MissionModule {
    MissionModule {
      id: self.id.clone(),
      concept_name: self.concept_name.clone(),
      bridge_keywords: self.bridge_keywords.clone(),
      prime: f(&self.prime),
      bridge: f(&self.bridge),
      infer: f(&self.infer),
      reinforce: f(&self.reinforce),
      capstone: f(&self.capstone),
      synthesis: self.synthesis.clone(),
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Briefing {
  pub title: String,
  pub scenario: String,
  pub objective: String,
}

/// Root resolved content for one (familiar, complex, goal) triple. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
  pub briefing: Briefing,
  pub modules: Vec<MissionModule>,
  pub final_challenge: MissionStep,
}

impl Mission {
  /// Contract check applied to anything loaded or generated before it reaches a learner.
  pub fn validate(&self) -> Result<(), IntegrityError> {
    if self.briefing.title.trim().is_empty() {
      return Err(IntegrityError::EmptyField { location: "briefing".into(), field: "title" });
    }
    if self.modules.is_empty() {
      return Err(IntegrityError::NoModules);
    }
    for (i, m) in self.modules.iter().enumerate() {
      for (role, step) in m.steps() {
        step.validate(&format!("modules[{}].{}", i, role.as_str()))?;
      }
      if m.synthesis.trim().is_empty() {
        return Err(IntegrityError::EmptyField { location: format!("modules[{}]", i), field: "synthesis" });
      }
    }
    self.final_challenge.validate("final_challenge")
  }

  /// Number of answerable questions: five per module plus the final challenge.
  pub fn question_count(&self) -> usize {
    self.modules.len() * StepRole::MODULE_ORDER.len() + 1
  }
}

/// Learner feedback forwarded to the shared store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub session_id: Option<String>,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rating: Option<u8>,
  pub timestamp_ms: u64,
}

/// Which tier produced a resolved mission.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MissionSource {
  Precomputed,  // curated bank
  LocalCache,
  Remote,       // shared store
  Generated,
}

impl MissionSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      MissionSource::Precomputed => "precomputed",
      MissionSource::LocalCache => "local_cache",
      MissionSource::Remote => "remote",
      MissionSource::Generated => "generated",
    }
  }
}
