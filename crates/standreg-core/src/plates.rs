//! Plate workflows: normalisation, the plate index, transfers between
//! stands, and per-plate movement history.
//!
//! A plate should belong to at most one stand. Plain saves do not check
//! that, so a transfer releases the plate from every stand holding it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  change::{Actor, ChangeOrigin, DecisionTag, FieldName, FieldValue},
  derive::derive_changes_at,
  revision::advance,
  stand::Stand,
  store::StandStore,
};

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Canonical plate form: trimmed and upper-cased.
pub fn normalize_plate(plate: &str) -> String { plate.trim().to_uppercase() }

/// Normalise, drop blanks, sort and de-duplicate.
pub fn normalize_plates(plates: &[String]) -> Vec<String> {
  let mut out: Vec<String> = plates
    .iter()
    .map(|p| normalize_plate(p))
    .filter(|p| !p.is_empty())
    .collect();
  out.sort();
  out.dedup();
  out
}

// ─── Index ───────────────────────────────────────────────────────────────────

/// Every plate assigned anywhere, sorted and unique.
pub fn plate_index(stands: &[Stand]) -> Vec<String> {
  let mut plates: Vec<String> =
    stands.iter().flat_map(|s| s.plates.iter().cloned()).collect();
  plates.sort();
  plates.dedup();
  plates
}

/// The stand currently holding `plate`.
pub fn holder_of<'a>(stands: &'a [Stand], plate: &str) -> Option<&'a Stand> {
  let plate = normalize_plate(plate);
  stands.iter().find(|s| s.holds_plate(&plate))
}

/// Every stand currently holding `plate`.
pub fn holders_of<'a>(stands: &'a [Stand], plate: &str) -> Vec<&'a Stand> {
  let plate = normalize_plate(plate);
  stands.iter().filter(|s| s.holds_plate(&plate)).collect()
}

// ─── Transfer ────────────────────────────────────────────────────────────────

/// Reference a transfer's records are filed under.
pub fn transfer_reference(plate: &str, on: NaiveDate) -> String {
  format!("TRANSFER-{}-{}", on.format("%Y%m%d"), plate)
}

/// The snapshots persisted by [`transfer_plate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferOutcome {
  /// The stands the plate left; empty if it was assigned nowhere.
  pub sources: Vec<Stand>,
  pub target:  Stand,
}

/// Move `plate` to the stand `target_id`, removing it from every stand that
/// currently holds it.
///
/// Each touched stand gets one plate-list record filed under
/// [`transfer_reference`]. Sources are persisted first; if persisting the
/// target then fails, the error is returned and the sources keep their saved
/// state.
pub async fn transfer_plate<S: StandStore>(
  store: &S,
  plate: &str,
  target_id: Uuid,
  actor: &Actor,
) -> Result<TransferOutcome> {
  let plate = normalize_plate(plate);
  if plate.is_empty() {
    return Err(Error::BlankPlate);
  }

  let stands = store.load_all().await.map_err(Error::store)?;
  let target = stands
    .iter()
    .find(|s| s.stand_id == target_id)
    .ok_or(Error::StandNotFound(target_id))?;
  if target.holds_plate(&plate) {
    return Err(Error::PlateAlreadyAssigned {
      plate,
      stand_id: target_id,
    });
  }

  let at = Utc::now();
  let tag = DecisionTag {
    reference: transfer_reference(&plate, at.date_naive()),
    date:      Some(at.date_naive()),
  };

  let holders = holders_of(&stands, &plate);
  if holders.len() > 1 {
    warn!(
      %plate,
      holders = ?holders.iter().map(|s| s.stand_id).collect::<Vec<_>>(),
      "plate held by several stands, releasing from all"
    );
  }

  let mut sources = Vec::with_capacity(holders.len());
  for holder in holders {
    let mut candidate = holder.clone();
    candidate.plates.retain(|p| p != &plate);
    let next = move_plates(holder, candidate, actor, &tag, at);
    store.upsert(next.clone()).await.map_err(Error::store)?;
    sources.push(next);
  }

  let mut candidate = target.clone();
  candidate.plates.push(plate.clone());
  let target = move_plates(target, candidate, actor, &tag, at);
  store.upsert(target.clone()).await.map_err(Error::store)?;

  info!(
    %plate,
    from = ?sources.iter().map(|s| s.stand_id).collect::<Vec<_>>(),
    to = %target.stand_id,
    %actor,
    reference = %tag.reference,
    "plate transferred"
  );
  Ok(TransferOutcome { sources, target })
}

fn move_plates(
  old: &Stand,
  candidate: Stand,
  actor: &Actor,
  tag: &DecisionTag,
  at: DateTime<Utc>,
) -> Stand {
  let candidate = candidate.normalized();
  let mut records = derive_changes_at(old, &candidate, actor, at);
  for record in &mut records {
    record.origin = ChangeOrigin::Transfer;
    record.decision = Some(tag.clone());
  }
  advance(old, candidate, records, at)
}

// ─── Movement history ────────────────────────────────────────────────────────

/// Whether a plate joined or left a stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
  Joined,
  Left,
}

/// One appearance of a plate in some stand's plate-list history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateMovement {
  pub change_id:   Uuid,
  pub recorded_at: DateTime<Utc>,
  pub stand_id:    Uuid,
  pub stand_name:  String,
  pub direction:   Direction,
  /// Decision or transfer reference; `None` for a manual edit.
  pub reference:   Option<String>,
  pub actor:       Actor,
}

/// Every time `plate` joined or left any of `stands`, newest first.
pub fn plate_history(stands: &[Stand], plate: &str) -> Vec<PlateMovement> {
  let plate = normalize_plate(plate);
  let mut movements: Vec<PlateMovement> = Vec::new();

  for stand in stands {
    for record in stand.history.iter().filter(|r| r.field == FieldName::Plates) {
      let (FieldValue::Plates(old), FieldValue::Plates(new)) =
        (&record.old_value, &record.new_value)
      else {
        warn!(
          stand_id = %stand.stand_id,
          change_id = %record.change_id,
          "plate record without plate lists, skipping"
        );
        continue;
      };

      let was_in = old.contains(&plate);
      let is_in = new.contains(&plate);
      let direction = match (was_in, is_in) {
        (false, true) => Direction::Joined,
        (true, false) => Direction::Left,
        _ => continue,
      };
      movements.push(PlateMovement {
        change_id: record.change_id,
        recorded_at: record.recorded_at,
        stand_id: stand.stand_id,
        stand_name: stand.name.clone(),
        direction,
        reference: record.decision_reference().map(str::to_owned),
        actor: record.actor.clone(),
      });
    }
  }

  movements.sort_by(|a, b| {
    b.recorded_at
      .cmp(&a.recorded_at)
      .then_with(|| a.change_id.cmp(&b.change_id))
  });
  movements
}
