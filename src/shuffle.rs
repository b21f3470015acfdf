//! Answer de-biasing for freshly generated content.
//!
//! Models tend to park the correct answer in the same slot. Every generated step
//! gets its options permuted uniformly (Fisher-Yates via `SliceRandom::shuffle`).
//! Curated and cached missions are served as stored.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{Mission, MissionStep};

/// New step with the same option multiset and correct answer, options in random order.
pub fn shuffle_step<R: Rng + ?Sized>(step: &MissionStep, rng: &mut R) -> MissionStep {
  let mut options = step.options.clone();
  options.shuffle(rng);
  MissionStep { options, ..step.clone() }
}

/// Shuffle all five steps of every module plus the final challenge.
pub fn shuffle_mission<R: Rng + ?Sized>(mission: &Mission, rng: &mut R) -> Mission {
  let modules = mission
    .modules
    .iter()
    .map(|m| m.map_steps(|s| shuffle_step(s, rng)))
    .collect();
  Mission {
    briefing: mission.briefing.clone(),
    modules,
    final_challenge: shuffle_step(&mission.final_challenge, rng),
  }
}
