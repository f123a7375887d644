//! State reconstructor: the stand as it stood right after a past transaction.
//!
//! Reconstruction walks backward from the current snapshot. Every record
//! newer than the target transaction is undone, newest first, by restoring
//! its old value; a field touched several times after the target therefore
//! ends up with the value it held before the oldest of those changes.

use tracing::{debug, warn};

use crate::{
  change::{ChangeOrigin, ChangeRecord, FieldName, FieldValue},
  group::{GroupKey, find_transaction},
  stand::Stand,
};

/// Rebuild `current` as of the transaction keyed `target`.
///
/// - `target == None` returns `current` unchanged ("now").
/// - An unknown key also returns `current` unchanged.
/// - A record whose old value does not fit its field is skipped, leaving
///   that field as it was.
///
/// Neither `current` nor `history` is modified. The result's `updated_at` is
/// the target transaction's timestamp and its `history` holds only the
/// records up to and including that transaction.
pub fn reconstruct(
  current: &Stand,
  history: &[ChangeRecord],
  target: Option<&GroupKey>,
) -> Stand {
  let Some(key) = target else {
    return current.clone();
  };
  let Some(transaction) = find_transaction(history, key) else {
    debug!(stand_id = %current.stand_id, %key, "no such transaction, showing current state");
    return current.clone();
  };
  let cutoff = transaction.recorded_at;

  // Newest first. Iterating in reverse before the stable sort keeps records
  // of one save in reverse append order.
  let mut undo: Vec<&ChangeRecord> = history
    .iter()
    .rev()
    .filter(|r| r.recorded_at > cutoff)
    .collect();
  undo.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
  debug!(stand_id = %current.stand_id, %key, undo = undo.len(), "replaying history backward");

  let mut snapshot = current.clone();
  for record in undo {
    if !snapshot.set_field(record.field, record.old_value.clone()) {
      warn!(
        stand_id = %current.stand_id,
        change_id = %record.change_id,
        field = %record.field,
        "old value does not fit field, leaving it unchanged"
      );
    }
  }

  // Show the selected transaction's own decision, even where none of its
  // records touched the decision fields. Transfers are filed under a
  // transfer reference that is not a decision.
  if transaction.origin != ChangeOrigin::Transfer
    && let Some(reference) = &transaction.decision_reference
  {
    snapshot.decision.reference = reference.clone();
    if let Some(date) = transaction.decision_date {
      snapshot.decision.date = Some(date);
    }
    let summary = transaction
      .records
      .iter()
      .rev()
      .find(|r| r.field == FieldName::DecisionSummary)
      .map(|r| &r.new_value);
    if let Some(FieldValue::Text(summary)) = summary {
      snapshot.decision.summary = summary.clone();
    }
  }

  snapshot.updated_at = cutoff;
  snapshot.history = history
    .iter()
    .filter(|r| r.recorded_at <= cutoff)
    .cloned()
    .collect();
  snapshot
}
