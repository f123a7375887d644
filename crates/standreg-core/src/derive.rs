//! Change-set deriver: two snapshots in, ordered field-level changes out.

use chrono::{DateTime, Utc};
use strum::IntoEnumIterator as _;
use uuid::Uuid;

use crate::{
  change::{Actor, ChangeOrigin, ChangeRecord, DecisionTag, FieldName},
  stand::Stand,
};

/// Compare `old` and `new` field by field, stamping the records with the
/// current time.
///
/// See [`derive_changes_at`].
pub fn derive_changes(
  old: &Stand,
  new: &Stand,
  actor: &Actor,
) -> Vec<ChangeRecord> {
  derive_changes_at(old, new, actor, Utc::now())
}

/// Compare `old` and `new` field by field.
///
/// Fields are visited in [`FieldName`] declaration order. Text is compared
/// trimmed; plate lists are compared sorted and produce at most one record
/// for the whole list; the coordinate produces one record when either
/// component differs. Identity is not re-checked.
///
/// Every record carries `at`, the given actor, and a decision tag copied from
/// `new`'s current decision.
pub fn derive_changes_at(
  old: &Stand,
  new: &Stand,
  actor: &Actor,
  at: DateTime<Utc>,
) -> Vec<ChangeRecord> {
  let decision = DecisionTag::from_decision(&new.decision);

  FieldName::iter()
    .filter_map(|field| {
      let old_value = old.field(field).canonical();
      let new_value = new.field(field).canonical();
      if old_value == new_value {
        return None;
      }
      Some(ChangeRecord {
        change_id: Uuid::new_v4(),
        recorded_at: at,
        field,
        old_value,
        new_value,
        actor: actor.clone(),
        origin: ChangeOrigin::Revision,
        decision: decision.clone(),
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeZone};

  use super::*;
  use crate::{
    change::FieldValue,
    stand::{Coordinate, Decision, NewStand, StandStatus},
  };

  fn at() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap() }

  fn base() -> Stand {
    Stand::create(
      NewStand {
        name: "Central Stand".into(),
        district: "Konak".into(),
        capacity: 5,
        ..NewStand::default()
      },
      at(),
    )
  }

  #[test]
  fn identical_snapshots_yield_nothing() {
    let s = base();
    assert!(derive_changes(&s, &s, &Actor::system()).is_empty());
  }

  #[test]
  fn single_field_change_yields_one_record() {
    let old = base();
    let mut new = old.clone();
    new.notes = "moved kiosk".into();

    let changes = derive_changes_at(&old, &new, &Actor::new("clerk"), at());
    assert_eq!(changes.len(), 1);
    let c = &changes[0];
    assert_eq!(c.field, FieldName::Notes);
    assert_eq!(c.old_value, FieldValue::Text(String::new()));
    assert_eq!(c.new_value, FieldValue::Text("moved kiosk".into()));
    assert_eq!(c.actor.as_str(), "clerk");
    assert_eq!(c.recorded_at, at());
    assert!(c.decision.is_none());
  }

  #[test]
  fn whitespace_only_difference_is_ignored() {
    let old = base();
    let mut new = old.clone();
    new.name = "  Central Stand  ".into();
    new.phone = "   ".into();
    assert!(derive_changes(&old, &new, &Actor::system()).is_empty());
  }

  #[test]
  fn plate_changes_collapse_into_one_record() {
    let mut old = base();
    old.plates = vec!["35 T 1".into()];
    let mut new = old.clone();
    new.plates = vec!["35 T 4".into(), "35 T 2".into(), "35 T 3".into()];

    let changes = derive_changes(&old, &new, &Actor::system());
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].field, FieldName::Plates);
    assert_eq!(
      changes[0].new_value,
      FieldValue::Plates(vec!["35 T 2".into(), "35 T 3".into(), "35 T 4".into()])
    );
  }

  #[test]
  fn plate_reordering_is_not_a_change() {
    let mut old = base();
    old.plates = vec!["B".into(), "A".into()];
    let mut new = old.clone();
    new.plates = vec!["A".into(), "B".into()];
    assert!(derive_changes(&old, &new, &Actor::system()).is_empty());
  }

  #[test]
  fn coordinate_logged_as_single_record() {
    let mut old = base();
    old.location = Some(Coordinate { lat: 38.1, lng: 27.1 });
    let mut new = old.clone();
    new.location = Some(Coordinate { lat: 38.1, lng: 27.2 });

    let changes = derive_changes(&old, &new, &Actor::system());
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].field, FieldName::Location);

    new.location = None;
    let changes = derive_changes(&old, &new, &Actor::system());
    assert_eq!(changes[0].new_value, FieldValue::Location(None));
  }

  #[test]
  fn decision_tag_comes_from_new_snapshot() {
    let mut old = base();
    old.decision = Decision {
      reference: "2023/9-9".into(),
      date:      NaiveDate::from_ymd_opt(2023, 9, 9),
      summary:   String::new(),
    };
    let mut new = old.clone();
    new.decision = Decision {
      reference: "2024/1-1".into(),
      date:      NaiveDate::from_ymd_opt(2024, 1, 1),
      summary:   String::new(),
    };
    new.capacity = 8;

    let changes = derive_changes(&old, &new, &Actor::system());
    let fields: Vec<_> = changes.iter().map(|c| c.field).collect();
    assert_eq!(
      fields,
      [FieldName::Capacity, FieldName::DecisionReference, FieldName::DecisionDate]
    );
    assert!(
      changes
        .iter()
        .all(|c| c.decision_reference() == Some("2024/1-1")
          && c.decision.as_ref().unwrap().date == NaiveDate::from_ymd_opt(2024, 1, 1))
    );
  }

  #[test]
  fn typed_scalars_are_compared() {
    let old = base();
    let mut new = old.clone();
    new.status = StandStatus::Passive;
    new.capacity = 0;

    let changes = derive_changes(&old, &new, &Actor::system());
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].old_value, FieldValue::Capacity(5));
    assert_eq!(changes[0].new_value, FieldValue::Capacity(0));
    assert_eq!(changes[1].new_value, FieldValue::Status(StandStatus::Passive));
  }

  #[test]
  fn record_ids_are_unique_within_a_call() {
    let old = base();
    let mut new = old.clone();
    new.name = "N".into();
    new.phone = "P".into();
    new.city = "C".into();
    let changes = derive_changes_at(&old, &new, &Actor::system(), at());
    assert_eq!(changes.len(), 3);
    assert_ne!(changes[0].change_id, changes[1].change_id);
    assert_ne!(changes[1].change_id, changes[2].change_id);
  }
}
