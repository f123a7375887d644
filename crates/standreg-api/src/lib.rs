//! JSON REST API for the taxi-stand registry.
//!
//! Exposes an axum [`Router`] backed by any
//! [`standreg_core::store::StandStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", standreg_api::api_router(store.clone(), Actor::system()))
//! ```

pub mod error;
pub mod history;
pub mod plates;
pub mod stands;

use std::sync::Arc;

use axum::{
  Router,
  http::HeaderMap,
  routing::{get, post, put},
};
use standreg_core::{change::Actor, store::StandStore};

pub use error::ApiError;

/// Header a client may use to name the actor behind a write.
pub const ACTOR_HEADER: &str = "x-actor";

/// Shared handler state.
pub struct ApiState<S> {
  pub store:         Arc<S>,
  /// Actor credited when a request names none.
  pub default_actor: Actor,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:         Arc::clone(&self.store),
      default_actor: self.default_actor.clone(),
    }
  }
}

impl<S> ApiState<S> {
  /// The body's actor if given, else the `X-Actor` header, else the default.
  pub fn actor(&self, headers: &HeaderMap, from_body: Option<String>) -> Actor {
    from_body
      .filter(|a| !a.trim().is_empty())
      .or_else(|| {
        headers
          .get(ACTOR_HEADER)
          .and_then(|v| v.to_str().ok())
          .filter(|a| !a.trim().is_empty())
          .map(str::to_owned)
      })
      .map(Actor::new)
      .unwrap_or_else(|| self.default_actor.clone())
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, default_actor: Actor) -> Router<()>
where
  S: StandStore + 'static,
{
  let state = ApiState { store, default_actor };
  Router::new()
    // Stands
    .route("/stands", get(stands::list::<S>).post(stands::create::<S>))
    .route("/stands/{id}", get(stands::get_one::<S>).delete(stands::delete_one::<S>))
    .route("/stands/{id}/revision", put(stands::revise::<S>))
    .route("/stands/{id}/correction", put(stands::correct::<S>))
    // History
    .route("/stands/{id}/history", get(history::list::<S>))
    .route("/stands/{id}/as-of", get(history::as_of::<S>))
    // Plates
    .route("/plates", get(plates::list::<S>))
    .route("/plates/{plate}", get(plates::get_one::<S>))
    .route("/plates/{plate}/transfer", post(plates::transfer::<S>))
    .with_state(state)
}
