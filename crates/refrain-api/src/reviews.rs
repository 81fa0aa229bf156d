//! Handlers for `/reviews` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reviews/next` | `?partition=` — body is `null` when nothing is due |
//! | `GET`  | `/reviews/due` | `?partition=` — snapshot of due items, optional `limit` |
//! | `POST` | `/reviews/:id` | Body: `{"rating":"again\|hard\|good\|easy"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use refrain_core::{
  Scheduler,
  item::{Item, ItemId, Partition, Rating},
  scheduler::ReviewReceipt,
  store::ItemStore,
};
use serde::Deserialize;

use crate::error::ApiError;

/// Snapshot bound when the caller does not pass one.
const DEFAULT_DUE_LIMIT: usize = 50;

// ─── Next due ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NextParams {
  pub partition: Partition,
}

/// `GET /reviews/next?partition=es`
///
/// An empty queue is a normal outcome: the response is `200` with a `null`
/// body, never an error status.
pub async fn next_due<S>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Query(params): Query<NextParams>,
) -> Result<Json<Option<Item>>, ApiError>
where
  S: ItemStore,
{
  Ok(Json(scheduler.next_due(params.partition).await?))
}

// ─── Due batch ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DueParams {
  pub partition: Partition,
  pub limit:     Option<usize>,
}

/// `GET /reviews/due?partition=es[&limit=...]` — snapshot-at-call of
/// currently-due items in selection order, for batch reminder delivery.
pub async fn due_batch<S>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Query(params): Query<DueParams>,
) -> Result<Json<Vec<Item>>, ApiError>
where
  S: ItemStore,
{
  let items = scheduler
    .due_batch(params.partition, params.limit.unwrap_or(DEFAULT_DUE_LIMIT))
    .await?;
  Ok(Json(items))
}

// ─── Rate ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RateBody {
  /// Wire form of the rating; parsed once here into the typed enum so the
  /// core never sees the encoding. Unknown values are a 400, never
  /// defaulted.
  pub rating: String,
}

/// `POST /reviews/:id` — body: `{"rating":"good"}`
pub async fn rate<S>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Path(id): Path<ItemId>,
  Json(body): Json<RateBody>,
) -> Result<Json<ReviewReceipt>, ApiError>
where
  S: ItemStore,
{
  let rating: Rating = body.rating.parse()?;
  Ok(Json(scheduler.apply_rating(id, rating).await?))
}
