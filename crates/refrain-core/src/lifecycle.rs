//! Review lifecycle — the counter rules applied atomically with each state
//! transition.
//!
//! The policy chooses where an item goes ([`Transition`]); this module
//! applies that choice together with the bookkeeping that must never be
//! separated from it.

use chrono::{DateTime, Utc};

use crate::{
  item::{Item, Rating},
  policy::Transition,
};

/// Apply one rating to `item`, producing the successor row.
///
/// In a single step:
/// - `review_state` and `due_at` take the policy-chosen transition,
/// - `repetitions += 1` unless the rating is Again,
/// - `lapses += 1` iff the rating is Again,
/// - `last_rating` records the rating,
/// - `updated_at` moves to `now`,
/// - `revision` bumps, pairing with the store's update-if-unchanged write.
///
/// `text`, `partition`, `item_id`, and `created_at` are untouched.
pub fn advance(
  item: &Item,
  rating: Rating,
  transition: Transition,
  now: DateTime<Utc>,
) -> Item {
  Item {
    review_state: transition.state,
    repetitions: item.repetitions + u32::from(rating.is_success()),
    lapses: item.lapses + u32::from(!rating.is_success()),
    last_rating: Some(rating),
    due_at: transition.due_at,
    updated_at: now,
    revision: item.revision + 1,
    ..item.clone()
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeDelta;

  use super::*;
  use crate::item::{Partition, ReviewState};

  fn fresh_item() -> Item {
    let at = "2026-08-07T12:00:00Z".parse().unwrap();
    Item {
      item_id:      1,
      partition:    Partition::Es,
      text:         "La pomme est rouge".into(),
      review_state: ReviewState::New,
      repetitions:  0,
      lapses:       0,
      last_rating:  None,
      due_at:       at,
      created_at:   at,
      updated_at:   at,
      revision:     0,
    }
  }

  #[test]
  fn success_rating_counts_repetition() {
    let item = fresh_item();
    let now = item.created_at + TimeDelta::minutes(1);
    let transition = Transition {
      due_at: now + TimeDelta::days(1),
      state:  ReviewState::Review,
    };

    let next = advance(&item, Rating::Good, transition, now);

    assert_eq!(next.review_state, ReviewState::Review);
    assert_eq!(next.repetitions, 1);
    assert_eq!(next.lapses, 0);
    assert_eq!(next.last_rating, Some(Rating::Good));
    assert_eq!(next.due_at, transition.due_at);
    assert_eq!(next.updated_at, now);
    assert_eq!(next.revision, 1);
  }

  #[test]
  fn again_rating_counts_lapse() {
    let item = fresh_item();
    let now = item.created_at + TimeDelta::minutes(1);
    let transition = Transition {
      due_at: now + TimeDelta::minutes(10),
      state:  ReviewState::Relearning,
    };

    let next = advance(&item, Rating::Again, transition, now);

    assert_eq!(next.review_state, ReviewState::Relearning);
    assert_eq!(next.repetitions, 0);
    assert_eq!(next.lapses, 1);
    assert_eq!(next.last_rating, Some(Rating::Again));
  }

  #[test]
  fn immutable_fields_survive() {
    let item = fresh_item();
    let now = item.created_at + TimeDelta::minutes(1);
    let transition = Transition {
      due_at: now + TimeDelta::days(1),
      state:  ReviewState::Review,
    };

    let next = advance(&item, Rating::Easy, transition, now);

    assert_eq!(next.item_id, item.item_id);
    assert_eq!(next.partition, item.partition);
    assert_eq!(next.text, item.text);
    assert_eq!(next.created_at, item.created_at);
  }
}
