//! Built-in content: the domain catalog and curated missions for trending triples.

use tracing::error;

use crate::bank::BankEntry;
use crate::domain::DomainOption;

const PRECOMPUTED_JSON: &str = include_str!("../data/precomputed_missions.json");

fn opt(id: &str, label: &str, icon: &str, description: &str, goals: &[&str], keywords: &[&str]) -> DomainOption {
  DomainOption {
    id: id.into(),
    label: label.into(),
    icon: icon.into(),
    description: description.into(),
    suggested_goals: goals.iter().map(|g| g.to_string()).collect(),
    keywords: keywords.iter().map(|k| k.to_string()).collect(),
  }
}

/// Subjects the learner already knows.
pub fn familiar_domains() -> Vec<DomainOption> {
  vec![
    opt("ttt", "Tic-Tac-Toe", "⭕️", "Simple 3x3 grid strategy", &[], &["grid", "fork", "draw"]),
    opt("nfl", "NFL / Football", "🏈", "Plays, yardage, and strategy", &[], &["drive", "down", "yard line"]),
    opt("cook", "Cooking", "🍳", "Recipes and chemical reactions", &[], &["recipe", "heat", "ingredients"]),
    opt("cricket", "Cricket", "🏏", "Innings, wickets, and runs", &[], &["innings", "wicket", "run rate"]),
    opt("hide", "Hide and Seek", "🙈", "Spatial awareness and stealth", &[], &["hiding spot", "seeker", "count"]),
  ]
}

/// Subjects the learner wants to learn.
pub fn complex_domains() -> Vec<DomainOption> {
  vec![
    opt("bridge", "Bridge (Card Game)", "🃏", "Complex bidding and play",
        &["Understand a bidding sequence", "Know when to play a high card", "Explain \"Tricks\" to a friend"], &[]),
    opt("stocks", "Stock Market", "📈", "Trading and risk management",
        &["Read a price chart", "Understand \"Buying the Dip\"", "Explain what a Dividend is"], &[]),
    opt("prob", "Probability", "🎲", "Odds and statistical chance",
        &["Calculate winning odds", "Understand \"Expected Value\"", "Identify the Gamblers Fallacy"], &[]),
    opt("pm", "Project Mgmt", "📂", "Deadlines and resource flow",
        &["Read a Gantt Chart", "Identify a \"Bottleneck\"", "Explain a \"Sprint\""], &[]),
    opt("quantum", "Quantum Physics", "⚛️", "The weird world of atoms",
        &["Explain Superposition", "Understand \"Entanglement\"", "Visualize a Wave Function"], &[]),
  ]
}

/// Curated missions shipped with the binary.
pub fn precomputed_missions() -> Vec<BankEntry> {
  serde_json::from_str(PRECOMPUTED_JSON).unwrap_or_else(|e| {
    error!(target: "mission", error = %e, "Built-in mission bank is unreadable");
    Vec::new()
  })
}
