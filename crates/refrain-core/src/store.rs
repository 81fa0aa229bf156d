//! The `ItemStore` trait and supporting outcome types.
//!
//! The trait is implemented by storage backends (e.g.
//! `refrain-store-sqlite`). Semantic outcomes (duplicate text, revision
//! mismatch) travel in the `Ok` types; the associated `Error` carries only
//! transient backend failures, which callers may retry.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::item::{Item, ItemId, NewItemRecord, Partition};

// ─── Outcome types ───────────────────────────────────────────────────────────

/// Result of [`ItemStore::create`].
#[derive(Debug, Clone)]
pub enum CreateOutcome {
  Created(Item),
  /// Dedup was requested and an item with identical text already exists in
  /// the partition. Carries the existing item's id; nothing was inserted.
  DuplicateText(ItemId),
}

/// Result of [`ItemStore::update_if_unchanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
  Applied,
  /// The stored revision differs from the expected one; nothing was
  /// written. The caller should reload and retry.
  RevisionMismatch,
  /// No row with this id exists.
  Missing,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Refrain item store backend.
///
/// The store is the single shared mutable resource of the system; the
/// per-item atomicity it provides (atomic check-and-insert, atomic
/// compare-and-swap) is what the scheduler's concurrency guarantees rest
/// on — no in-process lock is layered on top.
pub trait ItemStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert a new item in state `New` with zero counters.
  ///
  /// When `dedup` is set, the existence check and the insert are one atomic
  /// step: two concurrent creates of the same text in the same partition
  /// produce exactly one row.
  fn create(
    &self,
    input: NewItemRecord,
    dedup: bool,
  ) -> impl Future<Output = Result<CreateOutcome, Self::Error>> + Send + '_;

  /// Retrieve an item by id. Returns `None` if not found.
  fn get(
    &self,
    id: ItemId,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  /// The single most urgent due item in `partition`: smallest
  /// `due_at <= now`, ties broken by smallest id. `None` when nothing is
  /// due — a normal outcome, not an error.
  fn next_due(
    &self,
    partition: Partition,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  /// All currently-due items in selection order, bounded by `limit`.
  ///
  /// The sequence is a snapshot taken at call time; it is finite and not
  /// restartable across concurrent mutation.
  fn due_before(
    &self,
    partition: Partition,
    now: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Item>, Self::Error>> + Send + '_;

  /// Write `item` only if the stored revision still equals
  /// `expected_revision`, comparing and swapping in a single statement.
  /// This is the only mutation the store accepts after creation.
  fn update_if_unchanged(
    &self,
    item: Item,
    expected_revision: u64,
  ) -> impl Future<Output = Result<CasOutcome, Self::Error>> + Send + '_;

  /// Newest-first (by id) page of items in a partition.
  fn recent(
    &self,
    partition: Partition,
    limit: usize,
    offset: usize,
  ) -> impl Future<Output = Result<Vec<Item>, Self::Error>> + Send + '_;
}
