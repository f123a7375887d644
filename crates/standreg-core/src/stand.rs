//! Stand — the entity snapshot the registry records and audits.
//!
//! A [`Stand`] is a plain value. Every engine operation takes a snapshot by
//! reference and hands back a new one; nothing shares the history vector.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  change::{ChangeRecord, FieldName, FieldValue},
  plates::normalize_plates,
};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Operating status of a stand.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StandStatus {
  #[default]
  Active,
  Passive,
  PendingApproval,
}

// ─── Value sub-types ─────────────────────────────────────────────────────────

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
  pub lat: f64,
  pub lng: f64,
}

/// The most recently applied regulatory decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Decision {
  /// External decision number, e.g. `"2024/1-1"`. Blank when none applies.
  pub reference: String,
  pub date:      Option<NaiveDate>,
  pub summary:   String,
}

// ─── NewStand ────────────────────────────────────────────────────────────────

/// The editable part of a stand: everything except identity, timestamps and
/// history.
///
/// Used both for creating a stand and as the candidate for a revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewStand {
  pub name:           String,
  pub phone:          String,
  pub city:           String,
  pub district:       String,
  pub neighborhood:   String,
  pub street:         String,
  pub address:        String,
  pub location:       Option<Coordinate>,
  pub capacity:       u32,
  pub plates:         Vec<String>,
  pub decision:       Decision,
  pub status:         StandStatus,
  pub office_type:    String,
  pub responsibility: String,
  pub notes:          String,
}

// ─── Stand ───────────────────────────────────────────────────────────────────

/// The full recorded state of one taxi stand at a persisted instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stand {
  /// Assigned at creation; never changes.
  pub stand_id:       Uuid,
  pub name:           String,
  pub phone:          String,
  pub city:           String,
  pub district:       String,
  pub neighborhood:   String,
  pub street:         String,
  pub address:        String,
  pub location:       Option<Coordinate>,
  pub capacity:       u32,
  /// Plates of the vehicles currently assigned here, sorted.
  pub plates:         Vec<String>,
  pub decision:       Decision,
  pub status:         StandStatus,
  pub office_type:    String,
  pub responsibility: String,
  pub notes:          String,
  pub created_at:     DateTime<Utc>,
  /// Set on every persisted mutation.
  pub updated_at:     DateTime<Utc>,
  /// Append-only; never reordered or truncated in storage.
  #[serde(default)]
  pub history:        Vec<ChangeRecord>,
}

impl Stand {
  /// Build a brand-new stand with an empty history.
  pub fn create(input: NewStand, at: DateTime<Utc>) -> Self {
    let mut stand = Self {
      stand_id:       Uuid::new_v4(),
      name:           String::new(),
      phone:          String::new(),
      city:           String::new(),
      district:       String::new(),
      neighborhood:   String::new(),
      street:         String::new(),
      address:        String::new(),
      location:       None,
      capacity:       0,
      plates:         Vec::new(),
      decision:       Decision::default(),
      status:         StandStatus::default(),
      office_type:    String::new(),
      responsibility: String::new(),
      notes:          String::new(),
      created_at:     at,
      updated_at:     at,
      history:        Vec::new(),
    };
    stand.assign(input);
    stand.normalized()
  }

  /// A revision candidate: `input`'s editable fields on top of this stand's
  /// identity, timestamps and history.
  pub fn revised(&self, input: NewStand) -> Self {
    let mut candidate = self.clone();
    candidate.assign(input);
    candidate
  }

  fn assign(&mut self, input: NewStand) {
    self.name = input.name;
    self.phone = input.phone;
    self.city = input.city;
    self.district = input.district;
    self.neighborhood = input.neighborhood;
    self.street = input.street;
    self.address = input.address;
    self.location = input.location;
    self.capacity = input.capacity;
    self.plates = input.plates;
    self.decision = input.decision;
    self.status = input.status;
    self.office_type = input.office_type;
    self.responsibility = input.responsibility;
    self.notes = input.notes;
  }

  /// Trim every text field and normalise the plate list.
  ///
  /// Persisted snapshots are always normalised, so reconstructing one from
  /// its history reproduces it exactly.
  pub fn normalized(mut self) -> Self {
    for field in FieldName::TEXT {
      if let Some(slot) = self.text_slot(field) {
        let trimmed = slot.trim();
        if trimmed.len() != slot.len() {
          *slot = trimmed.to_owned();
        }
      }
    }
    self.plates = normalize_plates(&self.plates);
    self
  }

  // ── Field access ──────────────────────────────────────────────────────────

  /// The typed value currently held by `field`.
  pub fn field(&self, field: FieldName) -> FieldValue {
    match field {
      FieldName::Capacity => FieldValue::Capacity(self.capacity),
      FieldName::DecisionDate => FieldValue::Date(self.decision.date),
      FieldName::Status => FieldValue::Status(self.status),
      FieldName::Location => FieldValue::Location(self.location),
      FieldName::Plates => FieldValue::Plates(self.plates.clone()),
      text => FieldValue::Text(self.text(text).unwrap_or_default().to_owned()),
    }
  }

  /// Assign `value` to `field`. Returns `false` and leaves the stand
  /// untouched when the value's kind does not fit the field.
  pub fn set_field(&mut self, field: FieldName, value: FieldValue) -> bool {
    match (field, value) {
      (FieldName::Capacity, FieldValue::Capacity(n)) => self.capacity = n,
      (FieldName::DecisionDate, FieldValue::Date(d)) => self.decision.date = d,
      (FieldName::Status, FieldValue::Status(s)) => self.status = s,
      (FieldName::Location, FieldValue::Location(c)) => self.location = c,
      (FieldName::Plates, FieldValue::Plates(p)) => self.plates = p,
      (field, FieldValue::Text(text)) => match self.text_slot(field) {
        Some(slot) => *slot = text,
        None => return false,
      },
      _ => return false,
    }
    true
  }

  fn text(&self, field: FieldName) -> Option<&str> {
    let s = match field {
      FieldName::Name => &self.name,
      FieldName::Phone => &self.phone,
      FieldName::City => &self.city,
      FieldName::District => &self.district,
      FieldName::Neighborhood => &self.neighborhood,
      FieldName::Street => &self.street,
      FieldName::Address => &self.address,
      FieldName::DecisionReference => &self.decision.reference,
      FieldName::DecisionSummary => &self.decision.summary,
      FieldName::OfficeType => &self.office_type,
      FieldName::Responsibility => &self.responsibility,
      FieldName::Notes => &self.notes,
      _ => return None,
    };
    Some(s)
  }

  fn text_slot(&mut self, field: FieldName) -> Option<&mut String> {
    let slot = match field {
      FieldName::Name => &mut self.name,
      FieldName::Phone => &mut self.phone,
      FieldName::City => &mut self.city,
      FieldName::District => &mut self.district,
      FieldName::Neighborhood => &mut self.neighborhood,
      FieldName::Street => &mut self.street,
      FieldName::Address => &mut self.address,
      FieldName::DecisionReference => &mut self.decision.reference,
      FieldName::DecisionSummary => &mut self.decision.summary,
      FieldName::OfficeType => &mut self.office_type,
      FieldName::Responsibility => &mut self.responsibility,
      FieldName::Notes => &mut self.notes,
      _ => return None,
    };
    Some(slot)
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  /// Case-insensitive substring match over name, district, neighbourhood and
  /// decision reference. An empty needle matches everything.
  pub fn matches(&self, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
      return true;
    }
    [
      &self.name,
      &self.district,
      &self.neighborhood,
      &self.decision.reference,
    ]
    .into_iter()
    .any(|s| s.to_lowercase().contains(&needle))
  }

  pub fn holds_plate(&self, plate: &str) -> bool {
    self.plates.iter().any(|p| p == plate)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() }

  #[test]
  fn create_normalises_text_and_plates() {
    let stand = Stand::create(
      NewStand {
        name: "  Central Stand ".into(),
        plates: vec!["35 t 2".into(), " 35 T 1".into(), "35 T 2".into(), "".into()],
        ..NewStand::default()
      },
      at(),
    );

    assert_eq!(stand.name, "Central Stand");
    assert_eq!(stand.plates, ["35 T 1", "35 T 2"]);
    assert!(stand.history.is_empty());
    assert_eq!(stand.created_at, stand.updated_at);
  }

  #[test]
  fn set_field_rejects_mismatched_kind() {
    let mut stand = Stand::create(
      NewStand { capacity: 4, ..NewStand::default() },
      at(),
    );

    assert!(!stand.set_field(FieldName::Capacity, FieldValue::Text("x".into())));
    assert_eq!(stand.capacity, 4);

    assert!(stand.set_field(FieldName::Capacity, FieldValue::Capacity(9)));
    assert_eq!(stand.capacity, 9);

    assert!(!stand.set_field(FieldName::Plates, FieldValue::Capacity(1)));
  }

  #[test]
  fn field_and_set_field_agree_for_every_field() {
    let mut stand = Stand::create(
      NewStand {
        name: "A".into(),
        location: Some(Coordinate { lat: 38.4, lng: 27.1 }),
        ..NewStand::default()
      },
      at(),
    );
    let copy = stand.clone();
    for field in <FieldName as strum::IntoEnumIterator>::iter() {
      assert!(stand.set_field(field, copy.field(field)), "{field}");
    }
    assert_eq!(stand, copy);
  }

  #[test]
  fn matches_searches_decision_reference() {
    let stand = Stand::create(
      NewStand {
        name: "Konak".into(),
        decision: Decision { reference: "2024/3-7".into(), ..Decision::default() },
        ..NewStand::default()
      },
      at(),
    );
    assert!(stand.matches("konak"));
    assert!(stand.matches("2024/3"));
    assert!(stand.matches(""));
    assert!(!stand.matches("bornova"));
  }
}
