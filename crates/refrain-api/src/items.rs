//! Handlers for `/items` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/items` | Body: `{"text":"...","partition":"es"}` |
//! | `GET`  | `/items` | `?partition=` required; optional `limit`, `offset` |
//! | `GET`  | `/items/:id` | 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use refrain_core::{
  Scheduler,
  item::{Item, ItemId, Partition},
  scheduler::{IngestOutcome, RejectReason},
  store::ItemStore,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

// ─── Ingest ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IngestBody {
  pub text:      String,
  pub partition: Partition,
}

/// Wire shape for ingest. Rejection is a payload, not an HTTP error —
/// upstream webhook retries routinely deliver blanks and duplicates, and
/// treating those as failures would make the channel retry them forever.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
  pub accepted: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id:       Option<ItemId>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason:   Option<RejectReason>,
}

/// `POST /items` — body: `{"text":"...","partition":"es"}`
pub async fn ingest<S>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Json(body): Json<IngestBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ItemStore,
{
  let outcome = scheduler.ingest(&body.text, body.partition).await?;
  Ok(match outcome {
    IngestOutcome::Accepted(item) => (
      StatusCode::CREATED,
      Json(IngestResponse {
        accepted: true,
        id:       Some(item.item_id),
        reason:   None,
      }),
    ),
    IngestOutcome::Rejected(reason) => (
      StatusCode::OK,
      Json(IngestResponse {
        accepted: false,
        id:       None,
        reason:   Some(reason),
      }),
    ),
  })
}

// ─── Recent ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecentParams {
  pub partition: Partition,
  pub limit:     Option<usize>,
  pub offset:    Option<usize>,
}

/// `GET /items?partition=es[&limit=...][&offset=...]` — newest first by id.
pub async fn recent<S>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Query(params): Query<RecentParams>,
) -> Result<Json<Vec<Item>>, ApiError>
where
  S: ItemStore,
{
  let items = scheduler
    .recent(
      params.partition,
      params.limit.unwrap_or(20),
      params.offset.unwrap_or(0),
    )
    .await?;
  Ok(Json(items))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /items/:id`
pub async fn get_one<S>(
  State(scheduler): State<Arc<Scheduler<S>>>,
  Path(id): Path<ItemId>,
) -> Result<Json<Item>, ApiError>
where
  S: ItemStore,
{
  Ok(Json(scheduler.get(id).await?))
}
