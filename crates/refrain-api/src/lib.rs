//! JSON REST API for Refrain.
//!
//! Exposes an axum [`Router`] backed by a [`Scheduler`] over any
//! [`refrain_core::store::ItemStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", refrain_api::api_router(scheduler.clone()))
//! ```

pub mod error;
pub mod items;
pub mod reviews;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use refrain_core::{Scheduler, store::ItemStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `scheduler`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(scheduler: Arc<Scheduler<S>>) -> Router<()>
where
  S: ItemStore + 'static,
{
  Router::new()
    // Items
    .route("/items", get(items::recent::<S>).post(items::ingest::<S>))
    .route("/items/{id}", get(items::get_one::<S>))
    // Reviews
    .route("/reviews/next", get(reviews::next_due::<S>))
    .route("/reviews/due", get(reviews::due_batch::<S>))
    .route("/reviews/{id}", post(reviews::rate::<S>))
    .with_state(scheduler)
}
