//! Scheduler events for push-delivery listeners.
//!
//! Delivery is fire-and-forget: the scheduler never blocks on a listener,
//! and a failed or slow consumer never rolls back the transition it was
//! told about.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::item::{Item, ItemId, Rating, ReviewState};

/// Emitted by [`crate::Scheduler`]; consumed by notification side-channels
/// (reminder push, chat delivery).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulerEvent {
  /// The selector handed a due item to a caller.
  ItemDue { item: Item },

  /// A rating was applied and the item rescheduled.
  RatingApplied {
    item_id:   ItemId,
    rating:    Rating,
    new_state: ReviewState,
    due_at:    DateTime<Utc>,
  },
}
