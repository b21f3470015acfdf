//! Canonical cache key for a (familiar, complex, goal) triple.
//!
//! Every tier (curated bank, session memo, local cache, remote store) reads and
//! writes through `normalize_key`; nothing else formats keys.

const SEPARATOR: char = '_';

/// Lowercase, trim, collapse whitespace runs to `-`, drop anything outside `[a-z0-9-]`,
/// then join the three fields as `familiar_complex_goal`.
pub fn normalize_key(familiar: &str, complex: &str, goal: &str) -> String {
  let mut key = normalize_field(familiar);
  key.push(SEPARATOR);
  key.push_str(&normalize_field(complex));
  key.push(SEPARATOR);
  key.push_str(&normalize_field(goal));
  key
}

fn normalize_field(s: &str) -> String {
  s.to_lowercase()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join("-")
    .chars()
    .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn case_and_spacing_variants_share_a_key() {
    let a = normalize_key("NFL / Football", "Stock Market", "Read a price chart");
    let b = normalize_key("nfl / football", "stock   market", "READ A PRICE CHART");
    assert_eq!(a, b);
    assert_eq!(a, "nfl--football_stock-market_read-a-price-chart");
  }

  #[test]
  fn repeated_calls_are_stable() {
    let first = normalize_key(" Tic-Tac-Toe ", "Economics", "Market Volatility Explained");
    for _ in 0..5 {
      assert_eq!(normalize_key(" Tic-Tac-Toe ", "Economics", "Market Volatility Explained"), first);
    }
    assert_eq!(first, "tic-tac-toe_economics_market-volatility-explained");
  }

  #[test]
  fn punctuation_and_non_ascii_are_stripped() {
    assert_eq!(normalize_key("Café!", "Q&A", "Why?\tNow"), "caf_qa_why-now");
  }

  #[test]
  fn empty_inputs_yield_only_separators() {
    assert_eq!(normalize_key("", "  ", "\n"), "__");
  }

  #[test]
  fn field_order_matters() {
    assert_ne!(normalize_key("a", "b", "c"), normalize_key("b", "a", "c"));
  }
}
