//! Handlers for `/plates` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/plates` | Every assigned plate, sorted |
//! | `GET`  | `/plates/{plate}` | Current holder and movement history; 404 if never seen |
//! | `POST` | `/plates/{plate}/transfer` | Body: `{"target_stand_id":"..","actor":".."}` |

use axum::{
  Json,
  extract::{Path, State},
  http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use standreg_core::{
  plates::{
    PlateMovement, TransferOutcome, holder_of, normalize_plate, plate_history,
    plate_index, transfer_plate,
  },
  stand::Stand,
  store::StandStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

async fn all_stands<S: StandStore>(store: &S) -> Result<Vec<Stand>, ApiError> {
  store
    .load_all()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))
}

/// `GET /plates`
pub async fn list<S: StandStore + 'static>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<String>>, ApiError> {
  let stands = all_stands(&*state.store).await?;
  Ok(Json(plate_index(&stands)))
}

/// The stand a plate is assigned to.
#[derive(Debug, Serialize)]
pub struct Holder {
  pub stand_id: Uuid,
  pub name:     String,
}

#[derive(Debug, Serialize)]
pub struct PlateReport {
  pub plate:     String,
  pub holder:    Option<Holder>,
  pub movements: Vec<PlateMovement>,
}

/// `GET /plates/{plate}`
pub async fn get_one<S: StandStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(plate): Path<String>,
) -> Result<Json<PlateReport>, ApiError> {
  let plate = normalize_plate(&plate);
  let stands = all_stands(&*state.store).await?;
  let holder = holder_of(&stands, &plate).map(|s| Holder {
    stand_id: s.stand_id,
    name:     s.name.clone(),
  });
  let movements = plate_history(&stands, &plate);
  if holder.is_none() && movements.is_empty() {
    return Err(ApiError::NotFound(format!("plate {plate} not found")));
  }
  Ok(Json(PlateReport { plate, holder, movements }))
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
  pub target_stand_id: Uuid,
  #[serde(default)]
  pub actor:           Option<String>,
}

/// `POST /plates/{plate}/transfer`
pub async fn transfer<S: StandStore + 'static>(
  State(state): State<ApiState<S>>,
  Path(plate): Path<String>,
  headers: HeaderMap,
  Json(body): Json<TransferBody>,
) -> Result<Json<TransferOutcome>, ApiError> {
  let actor = state.actor(&headers, body.actor);
  let outcome = transfer_plate(&*state.store, &plate, body.target_stand_id, &actor).await?;
  Ok(Json(outcome))
}
