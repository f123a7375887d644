//! Save, list and view entry points over a [`StandStore`].
//!
//! Saving builds the next snapshot as a new value: the derived records are
//! appended to a copy of the old history and the copy is upserted. The
//! caller's snapshot is never touched, so a failed upsert leaves no orphaned
//! history behind. The append counts only once the store has accepted it.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  change::{Actor, ChangeOrigin, ChangeRecord},
  derive::derive_changes_at,
  group::{GroupKey, Transaction, group_history},
  reconstruct::reconstruct,
  stand::{NewStand, Stand},
  store::StandStore,
};

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Create and persist a new stand with an empty history.
pub async fn create_stand<S: StandStore>(
  store: &S,
  input: NewStand,
  actor: &Actor,
) -> Result<Stand> {
  let stand = Stand::create(input, Utc::now());
  store.upsert(stand.clone()).await.map_err(Error::store)?;
  info!(stand_id = %stand.stand_id, %actor, "stand created");
  Ok(stand)
}

/// Persist `candidate` as a regulatory revision of `old`.
///
/// The derived records are filed under `candidate`'s decision reference.
/// Returns the persisted snapshot, or `old` unchanged when nothing differs.
pub async fn save_revision<S: StandStore>(
  store: &S,
  old: &Stand,
  candidate: Stand,
  actor: &Actor,
) -> Result<Stand> {
  persist(store, old, candidate, actor, ChangeOrigin::Revision).await
}

/// Persist `candidate` as a plain correction of `old`.
///
/// The derived records carry no decision tag, so the save forms its own
/// manual-edit transaction.
pub async fn save_correction<S: StandStore>(
  store: &S,
  old: &Stand,
  candidate: Stand,
  actor: &Actor,
) -> Result<Stand> {
  persist(store, old, candidate, actor, ChangeOrigin::Correction).await
}

async fn persist<S: StandStore>(
  store: &S,
  old: &Stand,
  candidate: Stand,
  actor: &Actor,
  origin: ChangeOrigin,
) -> Result<Stand> {
  let at = Utc::now();
  let candidate = candidate.normalized();
  let mut records = derive_changes_at(old, &candidate, actor, at);
  if records.is_empty() {
    debug!(stand_id = %old.stand_id, "no changes to persist");
    return Ok(old.clone());
  }
  for record in &mut records {
    record.origin = origin;
    if origin == ChangeOrigin::Correction {
      record.decision = None;
    }
  }

  let count = records.len();
  let next = advance(old, candidate, records, at);
  store.upsert(next.clone()).await.map_err(Error::store)?;
  info!(
    stand_id = %next.stand_id,
    %actor,
    ?origin,
    changes = count,
    "stand saved"
  );
  Ok(next)
}

/// The snapshot that follows `old`: `candidate`'s fields, `old`'s identity,
/// and `old`'s history with `records` appended.
pub(crate) fn advance(
  old: &Stand,
  candidate: Stand,
  records: Vec<ChangeRecord>,
  at: DateTime<Utc>,
) -> Stand {
  let mut history = Vec::with_capacity(old.history.len() + records.len());
  history.extend(old.history.iter().cloned());
  history.extend(records);
  Stand {
    stand_id: old.stand_id,
    created_at: old.created_at,
    updated_at: at,
    history,
    ..candidate
  }
}

/// Remove a stand and its history from the store.
pub async fn delete_stand<S: StandStore>(
  store: &S,
  id: Uuid,
  actor: &Actor,
) -> Result<()> {
  if !store.delete(id).await.map_err(Error::store)? {
    return Err(Error::StandNotFound(id));
  }
  info!(stand_id = %id, %actor, "stand deleted");
  Ok(())
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// Load a stand, failing with [`Error::StandNotFound`] if it is missing.
pub async fn load_stand<S: StandStore>(store: &S, id: Uuid) -> Result<Stand> {
  store
    .get(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::StandNotFound(id))
}

/// Stands matching `needle` (see [`Stand::matches`]), sorted by name.
pub async fn search<S: StandStore>(store: &S, needle: &str) -> Result<Vec<Stand>> {
  let mut stands: Vec<Stand> = store
    .load_all()
    .await
    .map_err(Error::store)?
    .into_iter()
    .filter(|s| s.matches(needle))
    .collect();
  stands.sort_by(|a, b| a.name.cmp(&b.name).then(a.stand_id.cmp(&b.stand_id)));
  Ok(stands)
}

/// The stand's history as transactions, newest first.
pub fn list_history(stand: &Stand) -> Vec<Transaction> {
  group_history(&stand.history)
}

/// The stand as it stood right after the transaction keyed `key`; the
/// current state when `key` is `None` or unknown.
pub fn view_past_state(stand: &Stand, key: Option<&GroupKey>) -> Stand {
  reconstruct(stand, &stand.history, key)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{change::FieldName, memory::MemoryStore, stand::Decision};

  fn input(name: &str) -> NewStand {
    NewStand {
      name: name.into(),
      district: "Konak".into(),
      capacity: 5,
      ..NewStand::default()
    }
  }

  #[tokio::test]
  async fn create_then_load() {
    let store = MemoryStore::new();
    let stand = create_stand(&store, input("Central Stand"), &Actor::system())
      .await
      .unwrap();
    let loaded = load_stand(&store, stand.stand_id).await.unwrap();
    assert_eq!(loaded, stand);
    assert!(loaded.history.is_empty());
  }

  #[tokio::test]
  async fn load_missing_is_not_found() {
    let store = MemoryStore::new();
    let err = load_stand(&store, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, Error::StandNotFound(_)));
  }

  #[tokio::test]
  async fn revision_appends_tagged_records_and_persists() {
    let store = MemoryStore::new();
    let actor = Actor::new("clerk");
    let s0 = create_stand(&store, input("Central Stand"), &actor).await.unwrap();

    let mut candidate = s0.revised(input("Central Stand"));
    candidate.decision = Decision { reference: "2024/1-1".into(), ..Decision::default() };
    candidate.capacity = 8;
    candidate.stand_id = Uuid::new_v4();

    let s1 = save_revision(&store, &s0, candidate, &actor).await.unwrap();
    assert_eq!(s1.stand_id, s0.stand_id, "identity is immutable");
    assert_eq!(s1.created_at, s0.created_at);
    assert!(s1.updated_at >= s0.updated_at);
    assert_eq!(s1.history.len(), 2);
    assert!(s1.history.iter().all(|r| r.decision_reference() == Some("2024/1-1")));
    assert!(s1.history.iter().all(|r| r.recorded_at == s1.updated_at));

    assert_eq!(load_stand(&store, s0.stand_id).await.unwrap(), s1);
    assert!(s0.history.is_empty(), "caller's snapshot untouched");
  }

  #[tokio::test]
  async fn correction_lands_in_manual_bucket() {
    let store = MemoryStore::new();
    let mut first = input("Central Stand");
    first.decision.reference = "2024/1-1".into();
    let s0 = create_stand(&store, first, &Actor::system()).await.unwrap();

    let mut candidate = s0.clone();
    candidate.phone = "0232 000 00 00".into();
    let s1 = save_correction(&store, &s0, candidate, &Actor::system()).await.unwrap();

    let transactions = list_history(&s1);
    assert_eq!(transactions.len(), 1);
    assert!(matches!(transactions[0].key, GroupKey::Manual(_)));
    assert_eq!(transactions[0].origin, ChangeOrigin::Correction);
    assert_eq!(transactions[0].records[0].field, FieldName::Phone);
  }

  #[tokio::test]
  async fn unchanged_save_persists_nothing() {
    let store = MemoryStore::new();
    let s0 = create_stand(&store, input("Central Stand"), &Actor::system())
      .await
      .unwrap();
    let mut candidate = s0.clone();
    candidate.name = " Central Stand ".into();
    let s1 = save_revision(&store, &s0, candidate, &Actor::system()).await.unwrap();
    assert_eq!(s1, s0);
  }

  #[tokio::test]
  async fn view_past_state_after_two_revisions() {
    let store = MemoryStore::new();
    let actor = Actor::system();
    let s0 = create_stand(&store, input("Central Stand"), &actor).await.unwrap();

    let mut c1 = s0.clone();
    c1.decision.reference = "2024/1-1".into();
    c1.capacity = 8;
    c1.plates = vec!["35T2".into(), "35T1".into()];
    let s1 = save_revision(&store, &s0, c1, &actor).await.unwrap();

    // Distinct timestamps between saves.
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;

    let mut c2 = s1.clone();
    c2.decision.reference = "2024/2-5".into();
    c2.name = "Central Stand North".into();
    let s2 = save_revision(&store, &s1, c2, &actor).await.unwrap();

    let t1 = GroupKey::Decision("2024/1-1".into());
    let past = view_past_state(&s2, Some(&t1));
    assert_eq!(past, s1);
    assert_eq!(view_past_state(&s2, None), s2);
  }

  #[tokio::test]
  async fn delete_removes_stand() {
    let store = MemoryStore::new();
    let s0 = create_stand(&store, input("Central Stand"), &Actor::system())
      .await
      .unwrap();
    delete_stand(&store, s0.stand_id, &Actor::system()).await.unwrap();
    assert!(store.get(s0.stand_id).await.unwrap().is_none());

    let err = delete_stand(&store, s0.stand_id, &Actor::system()).await.unwrap_err();
    assert!(matches!(err, Error::StandNotFound(_)));
  }

  #[tokio::test]
  async fn search_filters_and_sorts() {
    let store = MemoryStore::new();
    for name in ["Karşıyaka", "Alsancak", "Bornova"] {
      create_stand(&store, input(name), &Actor::system()).await.unwrap();
    }
    let all: Vec<String> = search(&store, "").await.unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(all, ["Alsancak", "Bornova", "Karşıyaka"]);

    let hits = search(&store, "BORN").await.unwrap();
    assert_eq!(hits.len(), 1);
  }

  // ── Failure handling ────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("store offline")]
  struct Offline;

  /// A store whose writes always fail.
  struct OfflineStore(MemoryStore);

  impl StandStore for OfflineStore {
    type Error = Offline;

    async fn load_all(&self) -> Result<Vec<Stand>, Offline> {
      Ok(self.0.load_all().await.unwrap_or_default())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Stand>, Offline> {
      Ok(self.0.get(id).await.ok().flatten())
    }

    async fn upsert(&self, _stand: Stand) -> Result<(), Offline> { Err(Offline) }

    async fn delete(&self, _id: Uuid) -> Result<bool, Offline> { Err(Offline) }
  }

  #[tokio::test]
  async fn failed_save_reports_error_and_keeps_history() {
    let inner = MemoryStore::new();
    let s0 = create_stand(&inner, input("Central Stand"), &Actor::system())
      .await
      .unwrap();
    let store = OfflineStore(inner.clone());

    let mut candidate = s0.clone();
    candidate.capacity = 9;
    let err = save_revision(&store, &s0, candidate, &Actor::system())
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Store(_)));

    let stored = inner.get(s0.stand_id).await.unwrap().unwrap();
    assert!(stored.history.is_empty());
    assert!(s0.history.is_empty());
  }
}
