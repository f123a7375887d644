//! Handlers for a stand's change history.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/stands/{id}/history` | Transactions, newest first |
//! | `GET`  | `/stands/{id}/as-of` | `?key=<transaction key>`; no key means now |
//!
//! Decision references may contain `/`, so the key travels in the query
//! string rather than the path.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use standreg_core::{
  group::{GroupKey, Transaction},
  revision::{list_history, load_stand, view_past_state},
  stand::Stand,
  store::StandStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `GET /stands/{id}/history`
pub async fn list<S: StandStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
  let stand = load_stand(&*state.store, id).await?;
  Ok(Json(list_history(&stand)))
}

#[derive(Debug, Default, Deserialize)]
pub struct AsOfParams {
  pub key: Option<String>,
}

/// `GET /stands/{id}/as-of[?key=<key>]`
pub async fn as_of<S: StandStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AsOfParams>,
) -> Result<Json<Stand>, ApiError> {
  let key = params
    .key
    .as_deref()
    .map(str::parse::<GroupKey>)
    .transpose()?;
  let stand = load_stand(&*state.store, id).await?;
  Ok(Json(view_past_state(&stand, key.as_ref())))
}
