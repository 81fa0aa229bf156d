//! Error types for `refrain-core`.

use thiserror::Error;

use crate::item::ItemId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("item not found: {0}")]
  ItemNotFound(ItemId),

  /// An unrecognised rating string reached the boundary parser. Unknown
  /// ratings are rejected before any mutation, never mapped to a default.
  #[error("unknown rating: {0:?}")]
  UnknownRating(String),

  #[error("unknown partition: {0:?}")]
  UnknownPartition(String),

  /// The compare-and-swap loop on an item lost more races than its retry
  /// budget allows. Retryable by the caller.
  #[error("concurrent updates on item {0} exceeded the retry budget")]
  Contention(ItemId),

  /// A transient failure from the storage collaborator, propagated
  /// unchanged. Every scheduler operation is safe to retry after one.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error from the storage collaborator.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
