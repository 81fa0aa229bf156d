//! The scheduler — ingestion gate, due-queue selection, and the rating
//! transaction coordinator.
//!
//! This is the only component that mutates items after creation. Per-item
//! atomicity comes from the store's compare-and-swap primitive, so the
//! guarantees hold across process instances; the scheduler holds no lock of
//! its own.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::{
  error::{Error, Result},
  event::SchedulerEvent,
  item::{Item, ItemId, NewItemRecord, Partition, Rating, ReviewState},
  lifecycle,
  policy::ReviewPolicy,
  store::{CasOutcome, CreateOutcome, ItemStore},
};

/// CAS attempts before [`Scheduler::apply_rating`] reports contention.
const CAS_RETRY_BUDGET: u32 = 8;

/// Buffered events per subscriber; laggards drop the oldest.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// ─── Configuration ───────────────────────────────────────────────────────────

/// When a freshly ingested item first becomes due. Historical revisions of
/// this system varied silently between the two; here the choice is explicit
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialDue {
  /// Due the instant it is created.
  #[default]
  Immediate,
  /// Due after a fixed grace period.
  Grace(TimeDelta),
}

impl InitialDue {
  fn first_due(self, created_at: DateTime<Utc>) -> DateTime<Utc> {
    match self {
      Self::Immediate => created_at,
      Self::Grace(delta) => created_at + delta,
    }
  }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
  /// Reject ingest of text identical to an existing item in the same
  /// partition.
  pub dedup_per_partition: bool,
  /// Creation default for `due_at`.
  pub initial_due:         InitialDue,
  /// Window within which a repeated identical `(item, rating)` submission
  /// is treated as a duplicate delivery (webhook retry, double tap) and
  /// answered without mutating.
  pub dedup_window:        TimeDelta,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      dedup_per_partition: true,
      initial_due:         InitialDue::Immediate,
      dedup_window:        TimeDelta::seconds(30),
    }
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Why an ingest submission was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectReason {
  Empty,
  Duplicate,
}

/// Outcome of [`Scheduler::ingest`]. Rejection is a normal outcome, not an
/// error — upstream webhook delivery commonly repeats blanks and
/// duplicates, and callers must not treat those as failures.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
  Accepted(Item),
  Rejected(RejectReason),
}

/// What a caller gets back from [`Scheduler::apply_rating`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewReceipt {
  pub item_id:   ItemId,
  pub new_state: ReviewState,
  pub due_at:    DateTime<Utc>,
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

/// Orchestrates the review lifecycle over an [`ItemStore`] and a
/// [`ReviewPolicy`].
pub struct Scheduler<S> {
  store:  Arc<S>,
  policy: Box<dyn ReviewPolicy>,
  config: SchedulerConfig,
  events: broadcast::Sender<SchedulerEvent>,
}

impl<S: ItemStore> Scheduler<S> {
  pub fn new(
    store: Arc<S>,
    policy: Box<dyn ReviewPolicy>,
    config: SchedulerConfig,
  ) -> Self {
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    Self { store, policy, config, events }
  }

  /// Subscribe to scheduler events. Receivers that fall behind lose the
  /// oldest events rather than slowing the scheduler down.
  pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
    self.events.subscribe()
  }

  fn emit(&self, event: SchedulerEvent) {
    // No subscribers is fine.
    let _ = self.events.send(event);
  }

  // ── Ingestion gate ──────────────────────────────────────────────────────

  /// Normalize and store a new sentence.
  ///
  /// Trims whitespace; empty-after-trim text is rejected, not failed. When
  /// per-partition dedup is enabled, the duplicate check and insert are a
  /// single atomic store call.
  pub async fn ingest(
    &self,
    text: &str,
    partition: Partition,
  ) -> Result<IngestOutcome> {
    let text = text.trim();
    if text.is_empty() {
      return Ok(IngestOutcome::Rejected(RejectReason::Empty));
    }

    let now = Utc::now();
    let record = NewItemRecord {
      partition,
      text: text.to_owned(),
      due_at: self.config.initial_due.first_due(now),
      created_at: now,
    };

    let outcome = self
      .store
      .create(record, self.config.dedup_per_partition)
      .await
      .map_err(Error::store)?;

    match outcome {
      CreateOutcome::Created(item) => {
        tracing::debug!(
          item_id = item.item_id,
          partition = partition.as_str(),
          "ingested item"
        );
        Ok(IngestOutcome::Accepted(item))
      }
      CreateOutcome::DuplicateText(existing) => {
        tracing::debug!(existing_id = existing, "rejected duplicate text");
        Ok(IngestOutcome::Rejected(RejectReason::Duplicate))
      }
    }
  }

  // ── Due selection ───────────────────────────────────────────────────────

  /// The single most urgent due item in `partition`, or `None` when
  /// nothing is due. Emits [`SchedulerEvent::ItemDue`] on a hit.
  pub async fn next_due(&self, partition: Partition) -> Result<Option<Item>> {
    let item = self
      .store
      .next_due(partition, Utc::now())
      .await
      .map_err(Error::store)?;
    if let Some(item) = &item {
      self.emit(SchedulerEvent::ItemDue { item: item.clone() });
    }
    Ok(item)
  }

  /// Snapshot of all currently-due items in selection order, bounded by
  /// `limit`, for batch reminder delivery. Not restartable across
  /// concurrent mutation: rating an item mid-iteration does not remove it
  /// from an already-taken snapshot.
  pub async fn due_batch(
    &self,
    partition: Partition,
    limit: usize,
  ) -> Result<Vec<Item>> {
    self
      .store
      .due_before(partition, Utc::now(), limit)
      .await
      .map_err(Error::store)
  }

  // ── Reads ───────────────────────────────────────────────────────────────

  pub async fn get(&self, id: ItemId) -> Result<Item> {
    self
      .store
      .get(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ItemNotFound(id))
  }

  /// Newest-first (by id) page of items in a partition.
  pub async fn recent(
    &self,
    partition: Partition,
    limit: usize,
    offset: usize,
  ) -> Result<Vec<Item>> {
    self
      .store
      .recent(partition, limit, offset)
      .await
      .map_err(Error::store)
  }

  // ── Rating transaction ──────────────────────────────────────────────────

  /// Apply one rating to one item.
  ///
  /// Idempotent under at-least-once delivery: a repeat of the identical
  /// `(item, rating)` pair inside the configured dedup window is detected
  /// from the stored row itself (`last_rating` plus `updated_at`), so the
  /// guarantee holds across process instances. Two concurrent *different*
  /// ratings serialize through the store's compare-and-swap — the loser
  /// reloads and applies on top of the winner's result.
  pub async fn apply_rating(
    &self,
    id: ItemId,
    rating: Rating,
  ) -> Result<ReviewReceipt> {
    for attempt in 0..CAS_RETRY_BUDGET {
      let item = self
        .store
        .get(id)
        .await
        .map_err(Error::store)?
        .ok_or(Error::ItemNotFound(id))?;
      let now = Utc::now();

      // Duplicate delivery of the identical rating inside the window:
      // answer from the stored row without mutating.
      if item.last_rating == Some(rating)
        && now - item.updated_at < self.config.dedup_window
      {
        tracing::debug!(
          item_id = id,
          rating = rating.as_str(),
          "duplicate rating delivery, answering idempotently"
        );
        return Ok(ReviewReceipt {
          item_id:   id,
          new_state: item.review_state,
          due_at:    item.due_at,
        });
      }

      let transition = self.policy.compute_next(item.review_state, rating, now);
      let updated = lifecycle::advance(&item, rating, transition, now);
      let receipt = ReviewReceipt {
        item_id:   id,
        new_state: updated.review_state,
        due_at:    updated.due_at,
      };

      match self
        .store
        .update_if_unchanged(updated, item.revision)
        .await
        .map_err(Error::store)?
      {
        CasOutcome::Applied => {
          tracing::debug!(
            item_id = id,
            rating = rating.as_str(),
            new_state = receipt.new_state.as_str(),
            "rating applied"
          );
          self.emit(SchedulerEvent::RatingApplied {
            item_id: id,
            rating,
            new_state: receipt.new_state,
            due_at: receipt.due_at,
          });
          return Ok(receipt);
        }
        CasOutcome::RevisionMismatch => {
          tracing::debug!(item_id = id, attempt, "revision raced, retrying");
          continue;
        }
        CasOutcome::Missing => return Err(Error::ItemNotFound(id)),
      }
    }

    Err(Error::Contention(id))
  }
}
