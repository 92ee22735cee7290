//! JSON REST API for course listings and teacher registration.
//!
//! Exposes an axum [`Router`] backed by any [`courses_core::repository::Store`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", courses_api::api_router(ApiState::new(store, None)))
//! ```

pub mod courses;
pub mod error;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use courses_core::repository::Store;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:            Arc<S>,
  /// Semester listed by `GET /courses` when no `semester` is given.
  pub current_semester: Option<String>,
}

impl<S> ApiState<S> {
  pub fn new(store: Arc<S>, current_semester: Option<String>) -> Self {
    Self {
      store,
      current_semester,
    }
  }
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:            Arc::clone(&self.store),
      current_semester: self.current_semester.clone(),
    }
  }
}

/// Build the API router for `state`.
///
/// Every request gets its own unit of work from the store.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: Store + 'static,
{
  Router::new()
    .route("/courses", get(courses::list::<S>))
    .route("/courses/{id}/teachers", post(courses::add_teacher::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
