//! [`MemoryStore`] — a process-local [`StandStore`].
//!
//! Useful for tests and as a fallback when no persistent backend is
//! configured.

use std::{
  collections::{BTreeMap, HashSet},
  sync::{Arc, RwLock},
};

use uuid::Uuid;

use crate::{Error, Result, stand::Stand, store::StandStore};

/// Stands held in a shared map.
///
/// Cloning is cheap: clones share the same map. An upsert replaces the
/// snapshot fields but only appends history: stored records are kept and
/// incoming records whose change id is already stored are ignored.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  stands: Arc<RwLock<BTreeMap<Uuid, Stand>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

impl StandStore for MemoryStore {
  type Error = Error;

  async fn load_all(&self) -> Result<Vec<Stand>> {
    let stands = self.stands.read().map_err(|_| Error::StorePoisoned)?;
    Ok(stands.values().cloned().collect())
  }

  async fn get(&self, id: Uuid) -> Result<Option<Stand>> {
    let stands = self.stands.read().map_err(|_| Error::StorePoisoned)?;
    Ok(stands.get(&id).cloned())
  }

  async fn upsert(&self, stand: Stand) -> Result<()> {
    let mut stands = self.stands.write().map_err(|_| Error::StorePoisoned)?;
    let mut stand = stand;
    if let Some(stored) = stands.remove(&stand.stand_id) {
      let mut history = stored.history;
      let mut known: HashSet<Uuid> = history.iter().map(|r| r.change_id).collect();
      history.extend(
        stand
          .history
          .drain(..)
          .filter(|r| known.insert(r.change_id)),
      );
      stand.history = history;
    }
    stands.insert(stand.stand_id, stand);
    Ok(())
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let mut stands = self.stands.write().map_err(|_| Error::StorePoisoned)?;
    Ok(stands.remove(&id).is_some())
  }
}
