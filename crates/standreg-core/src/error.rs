//! Error types for `standreg-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("stand not found: {0}")]
  StandNotFound(Uuid),

  #[error("plate {plate} is already assigned to stand {stand_id}")]
  PlateAlreadyAssigned { plate: String, stand_id: Uuid },

  #[error("plate identifier is blank")]
  BlankPlate,

  #[error("invalid transaction key: {0:?}")]
  InvalidGroupKey(String),

  #[error("in-memory store lock poisoned")]
  StorePoisoned,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error returned by a [`StandStore`](crate::store::StandStore).
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
