//! Item — one captured sentence under spaced review.
//!
//! An item's text is fixed at ingestion. Everything else that changes
//! (state, counters, due time) is mutated only by the scheduler's rating
//! transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Store-assigned identifier, monotonically increasing at insertion, so
/// ordering by id reproduces insertion order.
pub type ItemId = i64;

// ─── Partition ───────────────────────────────────────────────────────────────

/// The language-scoped collection an item belongs to; also the uniqueness
/// scope when ingest dedup is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
  En,
  Es,
  Fr,
  De,
}

impl Partition {
  /// The wire/storage form of the partition.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::En => "en",
      Self::Es => "es",
      Self::Fr => "fr",
      Self::De => "de",
    }
  }
}

impl std::str::FromStr for Partition {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Error> {
    match s {
      "en" => Ok(Self::En),
      "es" => Ok(Self::Es),
      "fr" => Ok(Self::Fr),
      "de" => Ok(Self::De),
      other => Err(Error::UnknownPartition(other.to_owned())),
    }
  }
}

// ─── Rating ──────────────────────────────────────────────────────────────────

/// User feedback on recall difficulty; drives the next interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
  Again,
  Hard,
  Good,
  Easy,
}

impl Rating {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Again => "again",
      Self::Hard => "hard",
      Self::Good => "good",
      Self::Easy => "easy",
    }
  }

  /// `true` for every rating except [`Rating::Again`].
  pub fn is_success(&self) -> bool { !matches!(self, Self::Again) }
}

impl std::str::FromStr for Rating {
  type Err = Error;

  /// Parse the wire form (`"again" | "hard" | "good" | "easy"`). Anything
  /// else is a validation error; unknown ratings never fall back to a
  /// default offset.
  fn from_str(s: &str) -> Result<Self, Error> {
    match s {
      "again" => Ok(Self::Again),
      "hard" => Ok(Self::Hard),
      "good" => Ok(Self::Good),
      "easy" => Ok(Self::Easy),
      other => Err(Error::UnknownRating(other.to_owned())),
    }
  }
}

// ─── Review state ────────────────────────────────────────────────────────────

/// Coarse lifecycle stage, distinct from the raw due timestamp. There is no
/// terminal state; items remain reviewable indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewState {
  New,
  Learning,
  Review,
  Relearning,
}

impl ReviewState {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::New => "new",
      Self::Learning => "learning",
      Self::Review => "review",
      Self::Relearning => "relearning",
    }
  }
}

// ─── Item ────────────────────────────────────────────────────────────────────

/// One captured sentence under spaced review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
  pub item_id:      ItemId,
  pub partition:    Partition,
  /// Non-empty, whitespace-trimmed; immutable after creation.
  pub text:         String,
  pub review_state: ReviewState,
  /// Successful (non-Again) ratings applied; monotonically non-decreasing.
  pub repetitions:  u32,
  /// Again ratings applied; monotonically non-decreasing.
  pub lapses:       u32,
  /// Unset until the first review.
  pub last_rating:  Option<Rating>,
  /// The item is eligible for review once `due_at <= now`.
  pub due_at:       DateTime<Utc>,
  pub created_at:   DateTime<Utc>,
  /// Changes on every state-affecting write.
  pub updated_at:   DateTime<Utc>,
  /// Optimistic-concurrency counter backing the store's update-if-unchanged
  /// primitive; bumped on every state-affecting write. Not part of the wire
  /// format.
  #[serde(skip)]
  pub revision:     u64,
}

// ─── NewItemRecord ───────────────────────────────────────────────────────────

/// Input to [`crate::store::ItemStore::create`]. The id is assigned by the
/// store; the remaining review fields start at their creation defaults
/// (state `New`, zero counters, no rating).
#[derive(Debug, Clone)]
pub struct NewItemRecord {
  pub partition:  Partition,
  pub text:       String,
  /// Creation default for the due time, chosen by the ingestion gate's
  /// configuration — immediate or after a grace period, never implicit.
  pub due_at:     DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}
