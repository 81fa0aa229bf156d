//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, which for a fixed UTC offset
//! order lexicographically the same as chronologically — the due-queue
//! `ORDER BY due_at` relies on this. Enums are stored as their lowercase
//! wire names.

use chrono::{DateTime, Utc};
use refrain_core::item::{Item, Partition, Rating, ReviewState};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_partition(p: Partition) -> &'static str { p.as_str() }

pub fn decode_partition(s: &str) -> Result<Partition> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown partition: {s:?}")))
}

pub fn encode_review_state(state: ReviewState) -> &'static str {
  state.as_str()
}

pub fn decode_review_state(s: &str) -> Result<ReviewState> {
  match s {
    "new" => Ok(ReviewState::New),
    "learning" => Ok(ReviewState::Learning),
    "review" => Ok(ReviewState::Review),
    "relearning" => Ok(ReviewState::Relearning),
    other => Err(Error::Decode(format!("unknown review state: {other:?}"))),
  }
}

pub fn encode_rating(r: Rating) -> &'static str { r.as_str() }

pub fn decode_rating(s: &str) -> Result<Rating> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown rating: {s:?}")))
}

// ─── Row shape ───────────────────────────────────────────────────────────────

/// Column order shared by every SELECT over `items`.
pub const ITEM_COLUMNS: &str = "item_id, partition, text, review_state, \
                                repetitions, lapses, last_rating, due_at, \
                                created_at, updated_at, revision";

/// The raw row as SQLite hands it back, before domain decoding.
pub struct RawItem {
  pub item_id:      i64,
  pub partition:    String,
  pub text:         String,
  pub review_state: String,
  pub repetitions:  i64,
  pub lapses:       i64,
  pub last_rating:  Option<String>,
  pub due_at:       String,
  pub created_at:   String,
  pub updated_at:   String,
  pub revision:     i64,
}

impl RawItem {
  /// Map a row selected with [`ITEM_COLUMNS`] in that order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:      row.get(0)?,
      partition:    row.get(1)?,
      text:         row.get(2)?,
      review_state: row.get(3)?,
      repetitions:  row.get(4)?,
      lapses:       row.get(5)?,
      last_rating:  row.get(6)?,
      due_at:       row.get(7)?,
      created_at:   row.get(8)?,
      updated_at:   row.get(9)?,
      revision:     row.get(10)?,
    })
  }

  pub fn into_item(self) -> Result<Item> {
    Ok(Item {
      item_id:      self.item_id,
      partition:    decode_partition(&self.partition)?,
      text:         self.text,
      review_state: decode_review_state(&self.review_state)?,
      repetitions:  self.repetitions as u32,
      lapses:       self.lapses as u32,
      last_rating:  self
        .last_rating
        .as_deref()
        .map(decode_rating)
        .transpose()?,
      due_at:       decode_dt(&self.due_at)?,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
      revision:     self.revision as u64,
    })
  }
}
