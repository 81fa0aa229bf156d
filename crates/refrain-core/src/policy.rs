//! Interval policy — maps a rating onto the next due time and review state.
//!
//! The policy decides both the timestamp and the resulting state in one
//! call, so there is a single source of truth per transition.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::item::{Rating, ReviewState};

/// Days added on an Easy rating under the standard table.
pub const EASY_STANDARD_DAYS: i64 = 3;
/// Days added on an Easy rating under the first-pass table.
pub const EASY_FIRST_PASS_DAYS: i64 = 7;

// ─── Transition ──────────────────────────────────────────────────────────────

/// The outcome of one policy decision: when the item comes back and which
/// state it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub due_at: DateTime<Utc>,
  pub state:  ReviewState,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Strategy seam for interval computation.
///
/// The shipped implementation is a fixed offset table; a richer
/// stability/difficulty model can be swapped in without touching the
/// scheduler's control flow.
pub trait ReviewPolicy: Send + Sync {
  /// Deterministic in `(state, rating, now)` — no hidden randomness.
  fn compute_next(
    &self,
    state: ReviewState,
    rating: Rating,
    now: DateTime<Utc>,
  ) -> Transition;
}

// ─── Fixed table ─────────────────────────────────────────────────────────────

/// Which offset an Easy rating earns. Historical revisions of this system
/// disagreed (+3 days vs +7 days); both survive as named variants, with
/// [`EasyInterval::Standard`] as the default.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EasyInterval {
  #[default]
  Standard,
  FirstPass,
}

impl EasyInterval {
  fn delta(self) -> TimeDelta {
    match self {
      Self::Standard => TimeDelta::days(EASY_STANDARD_DAYS),
      Self::FirstPass => TimeDelta::days(EASY_FIRST_PASS_DAYS),
    }
  }
}

/// The fixed offset table:
///
/// | rating | offset          | resulting state |
/// |--------|-----------------|-----------------|
/// | Again  | +10 minutes     | Relearning      |
/// | Hard   | +12 hours       | Learning        |
/// | Good   | +1 day          | Review          |
/// | Easy   | +3 days (or +7) | Review          |
///
/// Offsets are taken from the instant the rating is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedIntervalPolicy {
  easy: EasyInterval,
}

impl FixedIntervalPolicy {
  pub fn new(easy: EasyInterval) -> Self { Self { easy } }
}

impl ReviewPolicy for FixedIntervalPolicy {
  fn compute_next(
    &self,
    _state: ReviewState,
    rating: Rating,
    now: DateTime<Utc>,
  ) -> Transition {
    // The fixed table depends only on the rating; the state parameter
    // exists for richer policies behind the same trait.
    let (delta, state) = match rating {
      Rating::Again => (TimeDelta::minutes(10), ReviewState::Relearning),
      Rating::Hard => (TimeDelta::hours(12), ReviewState::Learning),
      Rating::Good => (TimeDelta::days(1), ReviewState::Review),
      Rating::Easy => (self.easy.delta(), ReviewState::Review),
    };
    Transition { due_at: now + delta, state }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn now() -> DateTime<Utc> {
    "2026-08-07T12:00:00Z".parse().unwrap()
  }

  #[test]
  fn offset_table() {
    let policy = FixedIntervalPolicy::default();
    let at = now();

    let t = policy.compute_next(ReviewState::New, Rating::Again, at);
    assert_eq!(t.due_at - at, TimeDelta::minutes(10));
    assert_eq!(t.state, ReviewState::Relearning);

    let t = policy.compute_next(ReviewState::New, Rating::Hard, at);
    assert_eq!(t.due_at - at, TimeDelta::hours(12));
    assert_eq!(t.state, ReviewState::Learning);

    let t = policy.compute_next(ReviewState::New, Rating::Good, at);
    assert_eq!(t.due_at - at, TimeDelta::days(1));
    assert_eq!(t.state, ReviewState::Review);

    let t = policy.compute_next(ReviewState::New, Rating::Easy, at);
    assert_eq!(t.due_at - at, TimeDelta::days(3));
    assert_eq!(t.state, ReviewState::Review);
  }

  #[test]
  fn first_pass_easy_variant() {
    let policy = FixedIntervalPolicy::new(EasyInterval::FirstPass);
    let at = now();

    let t = policy.compute_next(ReviewState::Review, Rating::Easy, at);
    assert_eq!(t.due_at - at, TimeDelta::days(7));
    assert_eq!(t.state, ReviewState::Review);
  }

  #[test]
  fn pure_in_all_inputs() {
    let policy = FixedIntervalPolicy::default();
    let at = now();

    for state in [
      ReviewState::New,
      ReviewState::Learning,
      ReviewState::Review,
      ReviewState::Relearning,
    ] {
      for rating in [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy]
      {
        let a = policy.compute_next(state, rating, at);
        let b = policy.compute_next(state, rating, at);
        assert_eq!(a, b);
      }
    }
  }
}
