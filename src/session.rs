//! Learner session: selection, attached mission, position, score and answer history.
//!
//! Phase flow:
//!   Home → Setup → Briefing → Map → WordSync → Prime → Bridge → Infer → Reinforce
//!   → Capstone → Synthesis → (next module's Prime | FinalChallenge) → Summary
//!
//! Every transition has exactly one entry point, so question phases cannot be
//! skipped. Pure state, no I/O.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::domain::{DomainOption, Mission, MissionModule, MissionStep, StepRole};
use crate::error::SessionError;

/// Process-wide activity counter; orders sessions for eviction.
static ACTIVITY: AtomicU64 = AtomicU64::new(0);

fn next_tick() -> u64 {
  ACTIVITY.fetch_add(1, Ordering::Relaxed) + 1
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Home,
  Setup,
  Briefing,
  Map,
  WordSync,
  Prime,
  Bridge,
  Infer,
  Reinforce,
  Capstone,
  Synthesis,
  FinalChallenge,
  Summary,
}

impl Phase {
  pub fn role(&self) -> Option<StepRole> {
    match self {
      Phase::Prime => Some(StepRole::Prime),
      Phase::Bridge => Some(StepRole::Bridge),
      Phase::Infer => Some(StepRole::Infer),
      Phase::Reinforce => Some(StepRole::Reinforce),
      Phase::Capstone => Some(StepRole::Capstone),
      Phase::FinalChallenge => Some(StepRole::FinalChallenge),
      _ => None,
    }
  }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
  pub question_id: String,
  pub submitted_answer: String,
  pub is_correct: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnswerOutcome {
  pub question_id: String,
  pub is_correct: bool,
  pub correct_answer: String,
  pub explanation: String,
  pub next: Phase,
}

#[derive(Clone, Debug)]
pub struct Session {
  pub id: String,
  familiar: Option<DomainOption>,
  complex: Option<DomainOption>,
  goal: String,
  mission: Option<Arc<Mission>>,
  module_index: usize,
  score: u32,
  history: Vec<AnswerRecord>,
  phase: Phase,
  last_active: u64,
}

impl Session {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      familiar: None,
      complex: None,
      goal: String::new(),
      mission: None,
      module_index: 0,
      score: 0,
      history: Vec::new(),
      phase: Phase::Home,
      last_active: next_tick(),
    }
  }

  pub fn phase(&self) -> Phase { self.phase }
  pub fn score(&self) -> u32 { self.score }
  pub fn history(&self) -> &[AnswerRecord] { &self.history }
  pub fn module_index(&self) -> usize { self.module_index }
  pub fn mission(&self) -> Option<&Arc<Mission>> { self.mission.as_ref() }
  pub fn familiar(&self) -> Option<&DomainOption> { self.familiar.as_ref() }
  pub fn complex(&self) -> Option<&DomainOption> { self.complex.as_ref() }
  pub fn goal(&self) -> &str { &self.goal }
  /// Monotonic stamp of the last transition; higher is more recent.
  pub fn last_active(&self) -> u64 { self.last_active }

  /// Selected (familiar, complex, goal), if complete.
  pub fn selection(&self) -> Option<(DomainOption, DomainOption, String)> {
    match (&self.familiar, &self.complex) {
      (Some(f), Some(c)) if !self.goal.trim().is_empty() => Some((f.clone(), c.clone(), self.goal.clone())),
      _ => None,
    }
  }

  pub fn current_module(&self) -> Option<&MissionModule> {
    self.mission.as_ref()?.modules.get(self.module_index)
  }

  /// Step awaiting an answer, if the session is in a question phase.
  pub fn current_step(&self) -> Option<&MissionStep> {
    let mission = self.mission.as_ref()?;
    match self.phase.role()? {
      StepRole::FinalChallenge => Some(&mission.final_challenge),
      role => mission.modules.get(self.module_index)?.step(role),
    }
  }

  pub fn current_question_id(&self) -> Option<String> {
    match self.phase.role()? {
      StepRole::FinalChallenge => Some("final_challenge".to_string()),
      role => Some(format!("{}:{}", self.current_module()?.id, role.as_str())),
    }
  }

  /// Home/Setup → Setup. Re-selecting while still in Setup replaces the choice.
  pub fn select(&mut self, familiar: DomainOption, complex: DomainOption, goal: &str) -> Result<(), SessionError> {
    self.require_phase(&[Phase::Home, Phase::Setup], "select")?;
    self.familiar = Some(familiar);
    self.complex = Some(complex);
    self.goal = goal.trim().to_string();
    self.go(Phase::Setup);
    Ok(())
  }

  /// Setup → Briefing. The mission is checked before it becomes playable.
  pub fn attach_mission(&mut self, mission: Arc<Mission>) -> Result<(), SessionError> {
    self.require_phase(&[Phase::Setup], "attach_mission")?;
    if self.selection().is_none() {
      return Err(SessionError::IncompleteSelection);
    }
    mission.validate()?;
    self.mission = Some(mission);
    self.module_index = 0;
    self.go(Phase::Briefing);
    Ok(())
  }

  /// Briefing → Map.
  pub fn open_map(&mut self) -> Result<(), SessionError> {
    self.require_phase(&[Phase::Briefing], "open_map")?;
    self.go(Phase::Map);
    Ok(())
  }

  /// Map → WordSync: keyword transition for the current module.
  pub fn enter_module(&mut self) -> Result<(), SessionError> {
    self.require_phase(&[Phase::Map], "enter_module")?;
    self.go(Phase::WordSync);
    Ok(())
  }

  /// WordSync → Prime.
  pub fn start_questions(&mut self) -> Result<(), SessionError> {
    self.require_phase(&[Phase::WordSync], "start_questions")?;
    self.go(Phase::Prime);
    Ok(())
  }

  /// Grade the current step by exact string equality, record it, and move on.
  pub fn submit_answer(&mut self, answer: &str) -> Result<AnswerOutcome, SessionError> {
    if self.mission.is_none() {
      return Err(SessionError::NoMission);
    }
    let (step, question_id) = match (self.current_step(), self.current_question_id()) {
      (Some(s), Some(q)) => (s.clone(), q),
      _ => return Err(SessionError::WrongPhase { action: "submit_answer", phase: self.phase }),
    };

    let is_correct = step.is_correct(answer);
    if is_correct {
      self.score += 1;
    }
    self.history.push(AnswerRecord {
      question_id: question_id.clone(),
      submitted_answer: answer.to_string(),
      is_correct,
    });

    let next = match self.phase {
      Phase::Prime => Phase::Bridge,
      Phase::Bridge => Phase::Infer,
      Phase::Infer => Phase::Reinforce,
      Phase::Reinforce => Phase::Capstone,
      Phase::Capstone => Phase::Synthesis,
      _ => Phase::Summary, // final challenge
    };
    self.go(next);

    Ok(AnswerOutcome {
      question_id,
      is_correct,
      correct_answer: step.correct_answer,
      explanation: step.explanation,
      next,
    })
  }

  /// Synthesis → next module's Prime, or FinalChallenge once modules are exhausted.
  pub fn advance_module(&mut self) -> Result<Phase, SessionError> {
    self.require_phase(&[Phase::Synthesis], "advance_module")?;
    let total = self.mission.as_ref().map(|m| m.modules.len()).ok_or(SessionError::NoMission)?;
    self.module_index = (self.module_index + 1).min(total);
    let next = if self.module_index < total { Phase::Prime } else { Phase::FinalChallenge };
    self.go(next);
    Ok(next)
  }

  /// Back to an empty Home session; the id is kept.
  pub fn reset(&mut self) {
    *self = Session::new(std::mem::take(&mut self.id));
    debug!(target: "session", id = %self.id, "Session reset");
  }

  fn require_phase(&self, allowed: &[Phase], action: &'static str) -> Result<(), SessionError> {
    if allowed.contains(&self.phase) {
      Ok(())
    } else {
      Err(SessionError::WrongPhase { action, phase: self.phase })
    }
  }

  fn go(&mut self, next: Phase) {
    debug!(target: "session", id = %self.id, from = ?self.phase, to = ?next, module = self.module_index, "Phase transition");
    self.phase = next;
    self.last_active = next_tick();
  }
}
