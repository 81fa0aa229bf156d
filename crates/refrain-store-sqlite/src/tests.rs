//! Integration tests for `SqliteStore` — and the scheduler on top of it —
//! against an in-memory database.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use refrain_core::{
  Error as CoreError, Scheduler,
  event::SchedulerEvent,
  item::{Item, Partition, Rating, ReviewState},
  policy::{EasyInterval, FixedIntervalPolicy},
  scheduler::{IngestOutcome, InitialDue, RejectReason, SchedulerConfig},
  store::{CasOutcome, ItemStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn scheduler(store: SqliteStore) -> Scheduler<SqliteStore> {
  scheduler_with(store, SchedulerConfig::default())
}

fn scheduler_with(
  store: SqliteStore,
  config: SchedulerConfig,
) -> Scheduler<SqliteStore> {
  Scheduler::new(
    Arc::new(store),
    Box::new(FixedIntervalPolicy::default()),
    config,
  )
}

async fn ingest(
  s: &Scheduler<SqliteStore>,
  text: &str,
  partition: Partition,
) -> Item {
  match s.ingest(text, partition).await.unwrap() {
    IngestOutcome::Accepted(item) => item,
    other => panic!("expected acceptance, got {other:?}"),
  }
}

/// Overwrite an item's due time through the CAS primitive, returning the
/// updated row.
async fn set_due(
  store: &SqliteStore,
  item: &Item,
  due_at: DateTime<Utc>,
) -> Item {
  let mut updated = item.clone();
  updated.due_at = due_at;
  updated.revision += 1;
  let out = store
    .update_if_unchanged(updated.clone(), item.revision)
    .await
    .unwrap();
  assert_eq!(out, CasOutcome::Applied);
  updated
}

/// Wall-clock assertions leave slack for test execution time.
fn assert_close(actual: DateTime<Utc>, expected: DateTime<Utc>) {
  let delta = (actual - expected).num_milliseconds().abs();
  assert!(
    delta < 5_000,
    "timestamps differ by {delta}ms: {actual} vs {expected}"
  );
}

// ─── Ingestion ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_creates_new_item() {
  let s = scheduler(store().await);

  let item = ingest(&s, "La pomme est rouge", Partition::Es).await;

  assert_eq!(item.text, "La pomme est rouge");
  assert_eq!(item.partition, Partition::Es);
  assert_eq!(item.review_state, ReviewState::New);
  assert_eq!(item.repetitions, 0);
  assert_eq!(item.lapses, 0);
  assert_eq!(item.last_rating, None);
  // Default configuration: immediately due.
  assert_eq!(item.due_at, item.created_at);
}

#[tokio::test]
async fn ingest_trims_whitespace() {
  let s = scheduler(store().await);
  let item = ingest(&s, "  bonjour  \n", Partition::Fr).await;
  assert_eq!(item.text, "bonjour");
}

#[tokio::test]
async fn blank_text_rejected_without_creating() {
  let s = scheduler(store().await);

  let outcome = s.ingest("   ", Partition::En).await.unwrap();
  assert!(matches!(
    outcome,
    IngestOutcome::Rejected(RejectReason::Empty)
  ));

  let items = s.recent(Partition::En, 10, 0).await.unwrap();
  assert!(items.is_empty());
}

#[tokio::test]
async fn duplicate_text_rejected_within_partition() {
  let s = scheduler(store().await);

  ingest(&s, "hola", Partition::Es).await;
  let outcome = s.ingest("hola", Partition::Es).await.unwrap();
  assert!(matches!(
    outcome,
    IngestOutcome::Rejected(RejectReason::Duplicate)
  ));

  let items = s.recent(Partition::Es, 10, 0).await.unwrap();
  assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn same_text_accepted_across_partitions() {
  let s = scheduler(store().await);

  ingest(&s, "hola", Partition::Es).await;
  ingest(&s, "hola", Partition::En).await;

  assert_eq!(s.recent(Partition::Es, 10, 0).await.unwrap().len(), 1);
  assert_eq!(s.recent(Partition::En, 10, 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn dedup_disabled_allows_duplicates() {
  let config = SchedulerConfig {
    dedup_per_partition: false,
    ..SchedulerConfig::default()
  };
  let s = scheduler_with(store().await, config);

  ingest(&s, "hola", Partition::Es).await;
  ingest(&s, "hola", Partition::Es).await;

  assert_eq!(s.recent(Partition::Es, 10, 0).await.unwrap().len(), 2);
}

#[tokio::test]
async fn grace_period_defers_first_due() {
  let config = SchedulerConfig {
    initial_due: InitialDue::Grace(TimeDelta::minutes(10)),
    ..SchedulerConfig::default()
  };
  let s = scheduler_with(store().await, config);

  let item = ingest(&s, "hola", Partition::Es).await;
  assert_eq!(item.due_at, item.created_at + TimeDelta::minutes(10));

  // Not yet due.
  assert!(s.next_due(Partition::Es).await.unwrap().is_none());
}

// ─── Due selection ───────────────────────────────────────────────────────────

#[tokio::test]
async fn next_due_none_when_empty() {
  let s = scheduler(store().await);
  assert!(s.next_due(Partition::En).await.unwrap().is_none());
}

#[tokio::test]
async fn next_due_orders_by_due_time_then_advances() {
  let db = store().await;
  let s = scheduler(db.clone());
  let now = Utc::now();

  let a = ingest(&s, "first", Partition::Es).await;
  let b = ingest(&s, "second", Partition::Es).await;
  let c = ingest(&s, "third", Partition::Es).await;

  // Most overdue first, regardless of insertion order.
  set_due(&db, &c, now - TimeDelta::hours(3)).await;
  set_due(&db, &a, now - TimeDelta::hours(2)).await;
  set_due(&db, &b, now - TimeDelta::hours(1)).await;

  let due = s.next_due(Partition::Es).await.unwrap().unwrap();
  assert_eq!(due.item_id, c.item_id);

  // Rating it pushes it out of the due window; the next most urgent wins.
  s.apply_rating(c.item_id, Rating::Good).await.unwrap();
  let due = s.next_due(Partition::Es).await.unwrap().unwrap();
  assert_eq!(due.item_id, a.item_id);
}

#[tokio::test]
async fn due_tie_broken_by_insertion_order() {
  let db = store().await;
  let s = scheduler(db.clone());
  let past = Utc::now() - TimeDelta::hours(1);

  let a = ingest(&s, "first", Partition::Es).await;
  let b = ingest(&s, "second", Partition::Es).await;
  set_due(&db, &a, past).await;
  set_due(&db, &b, past).await;

  let due = s.next_due(Partition::Es).await.unwrap().unwrap();
  assert_eq!(due.item_id, a.item_id);
}

#[tokio::test]
async fn due_selection_scoped_to_partition() {
  let s = scheduler(store().await);

  ingest(&s, "hola", Partition::Es).await;
  assert!(s.next_due(Partition::En).await.unwrap().is_none());
  assert!(s.next_due(Partition::Es).await.unwrap().is_some());
}

#[tokio::test]
async fn due_batch_snapshot_order_and_limit() {
  let db = store().await;
  let s = scheduler(db.clone());
  let now = Utc::now();

  let a = ingest(&s, "first", Partition::Es).await;
  let b = ingest(&s, "second", Partition::Es).await;
  set_due(&db, &b, now - TimeDelta::hours(2)).await;
  set_due(&db, &a, now - TimeDelta::hours(1)).await;

  let batch = s.due_batch(Partition::Es, 10).await.unwrap();
  assert_eq!(
    batch.iter().map(|i| i.item_id).collect::<Vec<_>>(),
    vec![b.item_id, a.item_id]
  );

  let bounded = s.due_batch(Partition::Es, 1).await.unwrap();
  assert_eq!(bounded.len(), 1);
  assert_eq!(bounded[0].item_id, b.item_id);
}

// ─── Rating application ──────────────────────────────────────────────────────

#[tokio::test]
async fn good_rating_schedules_one_day_out() {
  let s = scheduler(store().await);
  let item = ingest(&s, "La pomme est rouge", Partition::Es).await;

  let due = s.next_due(Partition::Es).await.unwrap().unwrap();
  assert_eq!(due.item_id, item.item_id);

  let receipt = s.apply_rating(item.item_id, Rating::Good).await.unwrap();
  assert_eq!(receipt.new_state, ReviewState::Review);
  assert_close(receipt.due_at, item.created_at + TimeDelta::days(1));

  let stored = s.get(item.item_id).await.unwrap();
  assert_eq!(stored.repetitions, 1);
  assert_eq!(stored.lapses, 0);
  assert_eq!(stored.last_rating, Some(Rating::Good));
}

#[tokio::test]
async fn again_rating_lapses_and_relearns() {
  let s = scheduler(store().await);
  let item = ingest(&s, "La pomme est rouge", Partition::Es).await;

  s.apply_rating(item.item_id, Rating::Good).await.unwrap();
  let receipt = s.apply_rating(item.item_id, Rating::Again).await.unwrap();

  assert_eq!(receipt.new_state, ReviewState::Relearning);
  assert_close(receipt.due_at, Utc::now() + TimeDelta::minutes(10));

  let stored = s.get(item.item_id).await.unwrap();
  assert_eq!(stored.repetitions, 1);
  assert_eq!(stored.lapses, 1);
  assert_eq!(stored.last_rating, Some(Rating::Again));
}

#[tokio::test]
async fn hard_rating_schedules_twelve_hours_out() {
  let s = scheduler(store().await);
  let item = ingest(&s, "hola", Partition::Es).await;

  let receipt = s.apply_rating(item.item_id, Rating::Hard).await.unwrap();
  assert_eq!(receipt.new_state, ReviewState::Learning);
  assert_close(receipt.due_at, Utc::now() + TimeDelta::hours(12));
}

#[tokio::test]
async fn easy_first_pass_variant_schedules_seven_days_out() {
  let s = Scheduler::new(
    Arc::new(store().await),
    Box::new(FixedIntervalPolicy::new(EasyInterval::FirstPass)),
    SchedulerConfig::default(),
  );
  let item = ingest(&s, "hola", Partition::Es).await;

  let receipt = s.apply_rating(item.item_id, Rating::Easy).await.unwrap();
  assert_eq!(receipt.new_state, ReviewState::Review);
  assert_close(receipt.due_at, Utc::now() + TimeDelta::days(7));
}

#[tokio::test]
async fn rating_unknown_item_is_not_found() {
  let s = scheduler(store().await);
  ingest(&s, "hola", Partition::Es).await;

  let err = s.apply_rating(9999, Rating::Good).await.unwrap_err();
  assert!(matches!(err, CoreError::ItemNotFound(9999)));

  // Nothing was mutated.
  let items = s.recent(Partition::Es, 10, 0).await.unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0].repetitions, 0);
}

// ─── Idempotence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_rating_within_window_counts_once() {
  let s = scheduler(store().await);
  let item = ingest(&s, "hola", Partition::Es).await;

  let first = s.apply_rating(item.item_id, Rating::Good).await.unwrap();
  let second = s.apply_rating(item.item_id, Rating::Good).await.unwrap();

  // Both callers observe the same final state.
  assert_eq!(first, second);

  let stored = s.get(item.item_id).await.unwrap();
  assert_eq!(stored.repetitions, 1);
  assert_eq!(stored.lapses, 0);
}

#[tokio::test]
async fn zero_dedup_window_counts_every_delivery() {
  let config = SchedulerConfig {
    dedup_window: TimeDelta::zero(),
    ..SchedulerConfig::default()
  };
  let s = scheduler_with(store().await, config);
  let item = ingest(&s, "hola", Partition::Es).await;

  s.apply_rating(item.item_id, Rating::Good).await.unwrap();
  s.apply_rating(item.item_id, Rating::Good).await.unwrap();

  let stored = s.get(item.item_id).await.unwrap();
  assert_eq!(stored.repetitions, 2);
}

#[tokio::test]
async fn different_rating_within_window_still_applies() {
  let s = scheduler(store().await);
  let item = ingest(&s, "hola", Partition::Es).await;

  s.apply_rating(item.item_id, Rating::Good).await.unwrap();
  s.apply_rating(item.item_id, Rating::Again).await.unwrap();

  let stored = s.get(item.item_id).await.unwrap();
  assert_eq!(stored.repetitions, 1);
  assert_eq!(stored.lapses, 1);
}

// ─── Compare-and-swap ────────────────────────────────────────────────────────

#[tokio::test]
async fn stale_revision_is_rejected_untouched() {
  let db = store().await;
  let s = scheduler(db.clone());
  let item = ingest(&s, "hola", Partition::Es).await;

  let mut updated = item.clone();
  updated.repetitions = 42;
  updated.revision += 1;

  // Wrong expectation: the row is at revision 0.
  let out = db.update_if_unchanged(updated, 7).await.unwrap();
  assert_eq!(out, CasOutcome::RevisionMismatch);

  let stored = s.get(item.item_id).await.unwrap();
  assert_eq!(stored.repetitions, 0);
  assert_eq!(stored.revision, 0);
}

#[tokio::test]
async fn cas_on_missing_item_reports_missing() {
  let db = store().await;
  let s = scheduler(db.clone());
  let item = ingest(&s, "hola", Partition::Es).await;

  let mut ghost = item.clone();
  ghost.item_id = 9999;

  let out = db.update_if_unchanged(ghost, 0).await.unwrap();
  assert_eq!(out, CasOutcome::Missing);
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_item_is_not_found() {
  let s = scheduler(store().await);
  let err = s.get(123).await.unwrap_err();
  assert!(matches!(err, CoreError::ItemNotFound(123)));
}

#[tokio::test]
async fn recent_is_newest_first_with_pagination() {
  let s = scheduler(store().await);

  let a = ingest(&s, "uno", Partition::Es).await;
  let b = ingest(&s, "dos", Partition::Es).await;
  let c = ingest(&s, "tres", Partition::Es).await;

  let page = s.recent(Partition::Es, 2, 0).await.unwrap();
  assert_eq!(
    page.iter().map(|i| i.item_id).collect::<Vec<_>>(),
    vec![c.item_id, b.item_id]
  );

  let page = s.recent(Partition::Es, 2, 2).await.unwrap();
  assert_eq!(
    page.iter().map(|i| i.item_id).collect::<Vec<_>>(),
    vec![a.item_id]
  );
}

#[tokio::test]
async fn items_survive_a_roundtrip() {
  let s = scheduler(store().await);
  let item = ingest(&s, "hola", Partition::Es).await;

  s.apply_rating(item.item_id, Rating::Hard).await.unwrap();

  let stored = s.get(item.item_id).await.unwrap();
  assert_eq!(stored.text, "hola");
  assert_eq!(stored.partition, Partition::Es);
  assert_eq!(stored.review_state, ReviewState::Learning);
  assert_eq!(stored.last_rating, Some(Rating::Hard));
  assert_eq!(stored.created_at, item.created_at);
  assert!(stored.updated_at >= item.updated_at);
  assert_eq!(stored.revision, 1);
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rating_applied_event_is_emitted() {
  let s = scheduler(store().await);
  let item = ingest(&s, "hola", Partition::Es).await;

  let mut events = s.subscribe();
  s.apply_rating(item.item_id, Rating::Good).await.unwrap();

  match events.try_recv().unwrap() {
    SchedulerEvent::RatingApplied { item_id, rating, new_state, .. } => {
      assert_eq!(item_id, item.item_id);
      assert_eq!(rating, Rating::Good);
      assert_eq!(new_state, ReviewState::Review);
    }
    other => panic!("unexpected event: {other:?}"),
  }
}

#[tokio::test]
async fn item_due_event_is_emitted() {
  let s = scheduler(store().await);
  let item = ingest(&s, "hola", Partition::Es).await;

  let mut events = s.subscribe();
  s.next_due(Partition::Es).await.unwrap().unwrap();

  match events.try_recv().unwrap() {
    SchedulerEvent::ItemDue { item: due } => {
      assert_eq!(due.item_id, item.item_id);
    }
    other => panic!("unexpected event: {other:?}"),
  }
}

#[tokio::test]
async fn no_subscriber_is_not_an_error() {
  let s = scheduler(store().await);
  let item = ingest(&s, "hola", Partition::Es).await;

  // No subscribe() call anywhere; emission must be a no-op.
  s.apply_rating(item.item_id, Rating::Good).await.unwrap();
}
