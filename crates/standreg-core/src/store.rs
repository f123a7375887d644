//! The `StandStore` trait — the persistence contract of the registry.
//!
//! The trait is implemented by storage backends (e.g. `standreg-store-sqlite`
//! and [`MemoryStore`](crate::memory::MemoryStore)). The change-log engine
//! treats a store as an opaque key-value map of whole snapshots keyed by
//! stand id; it never writes individual records.

use std::future::Future;

use uuid::Uuid;

use crate::stand::Stand;

/// Abstraction over a stand store backend.
///
/// `upsert` persists the full snapshot, history included. Backends must
/// treat history as append-only: records already stored for a stand are
/// never rewritten or dropped by a later upsert.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait StandStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every stored stand, in no particular order.
  fn load_all(
    &self,
  ) -> impl Future<Output = Result<Vec<Stand>, Self::Error>> + Send + '_;

  /// Retrieve a stand by id. Returns `None` if not found.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Stand>, Self::Error>> + Send + '_;

  /// Insert or replace the snapshot keyed by `stand.stand_id`.
  fn upsert(
    &self,
    stand: Stand,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove a stand and its history. Returns `false` if it did not exist.
  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
