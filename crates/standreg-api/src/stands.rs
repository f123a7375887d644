//! Handlers for `/stands` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/stands` | Optional `?q=` substring search |
//! | `POST`   | `/stands` | Body: `{"stand":{..},"actor":"..."}` |
//! | `GET`    | `/stands/{id}` | 404 if not found |
//! | `DELETE` | `/stands/{id}` | 204, or 404 if not found |
//! | `PUT`    | `/stands/{id}/revision` | Same body as `POST`; filed under the new decision |
//! | `PUT`    | `/stands/{id}/correction` | Same body; filed as a manual edit |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use serde::Deserialize;
use standreg_core::{
  revision::{create_stand, delete_stand, load_stand, save_correction, save_revision, search},
  stand::{NewStand, Stand},
  store::StandStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// Body of every stand write.
#[derive(Debug, Deserialize)]
pub struct SaveBody {
  pub stand: NewStand,
  #[serde(default)]
  pub actor: Option<String>,
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub q: String,
}

/// `GET /stands[?q=<needle>]`
pub async fn list<S: StandStore + 'static>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Stand>>, ApiError> {
  Ok(Json(search(&*state.store, &params.q).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /stands`
pub async fn create<S: StandStore + 'static>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
  Json(body): Json<SaveBody>,
) -> Result<impl IntoResponse, ApiError> {
  let actor = state.actor(&headers, body.actor);
  let stand = create_stand(&*state.store, body.stand, &actor).await?;
  Ok((StatusCode::CREATED, Json(stand)))
}

// ─── Get / delete ────────────────────────────────────────────────────────────

/// `GET /stands/{id}`
pub async fn get_one<S: StandStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Stand>, ApiError> {
  Ok(Json(load_stand(&*state.store, id).await?))
}

/// `DELETE /stands/{id}`
pub async fn delete_one<S: StandStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
  let actor = state.actor(&headers, None);
  delete_stand(&*state.store, id, &actor).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Saves ───────────────────────────────────────────────────────────────────

/// `PUT /stands/{id}/revision`
pub async fn revise<S: StandStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<SaveBody>,
) -> Result<Json<Stand>, ApiError> {
  let actor = state.actor(&headers, body.actor);
  let old = load_stand(&*state.store, id).await?;
  let candidate = old.revised(body.stand);
  Ok(Json(save_revision(&*state.store, &old, candidate, &actor).await?))
}

/// `PUT /stands/{id}/correction`
pub async fn correct<S: StandStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<SaveBody>,
) -> Result<Json<Stand>, ApiError> {
  let actor = state.actor(&headers, body.actor);
  let old = load_stand(&*state.store, id).await?;
  let candidate = old.revised(body.stand);
  Ok(Json(save_correction(&*state.store, &old, candidate, &actor).await?))
}
