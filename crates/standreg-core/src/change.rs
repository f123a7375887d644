//! Change records — the atomic unit of a stand's audit trail.
//!
//! Old and new values are typed ([`FieldValue`]) rather than text blobs, so
//! the reconstructor never has to re-parse coordinates or plate lists. The
//! [`Display`](std::fmt::Display) impls produce the canonical text form for
//! display and export only.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stand::{Coordinate, Decision, StandStatus};

// ─── Field names ─────────────────────────────────────────────────────────────

/// Every field the change-set deriver compares, in comparison order.
///
/// `Location` and `Plates` each stand for a structured value that is logged
/// as a single record.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldName {
  Name,
  Phone,
  City,
  District,
  Neighborhood,
  Street,
  Address,
  Capacity,
  DecisionReference,
  DecisionDate,
  DecisionSummary,
  Status,
  OfficeType,
  Responsibility,
  Notes,
  Location,
  Plates,
}

impl FieldName {
  /// Fields whose value is free text.
  pub const TEXT: [FieldName; 12] = [
    FieldName::Name,
    FieldName::Phone,
    FieldName::City,
    FieldName::District,
    FieldName::Neighborhood,
    FieldName::Street,
    FieldName::Address,
    FieldName::DecisionReference,
    FieldName::DecisionSummary,
    FieldName::OfficeType,
    FieldName::Responsibility,
    FieldName::Notes,
  ];
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// Blank marker rendered for empty scalar values.
pub const EMPTY_MARKER: &str = "(empty)";
/// Blank marker rendered for an absent coordinate.
pub const NO_LOCATION_MARKER: &str = "(no location)";
/// Blank marker rendered for an empty plate list.
pub const NO_PLATES_MARKER: &str = "(no plates)";

/// A typed old or new value of a [`ChangeRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
  Text(String),
  Capacity(u32),
  Date(Option<NaiveDate>),
  Status(StandStatus),
  Location(Option<Coordinate>),
  /// Sorted plate identifiers.
  Plates(Vec<String>),
}

impl FieldValue {
  /// The comparison form: text trimmed, plates sorted.
  pub fn canonical(self) -> Self {
    match self {
      Self::Text(s) => {
        let trimmed = s.trim();
        if trimmed.len() == s.len() {
          Self::Text(s)
        } else {
          Self::Text(trimmed.to_owned())
        }
      }
      Self::Plates(mut plates) => {
        plates.sort();
        Self::Plates(plates)
      }
      other => other,
    }
  }

  pub fn is_blank(&self) -> bool {
    match self {
      Self::Text(s) => s.trim().is_empty(),
      Self::Date(d) => d.is_none(),
      Self::Location(c) => c.is_none(),
      Self::Plates(p) => p.is_empty(),
      Self::Capacity(_) | Self::Status(_) => false,
    }
  }
}

impl fmt::Display for FieldValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Text(s) if s.trim().is_empty() => f.write_str(EMPTY_MARKER),
      Self::Text(s) => f.write_str(s.trim()),
      Self::Capacity(n) => write!(f, "{n}"),
      Self::Date(Some(d)) => write!(f, "{}", d.format("%Y-%m-%d")),
      Self::Date(None) => f.write_str(EMPTY_MARKER),
      Self::Status(s) => write!(f, "{s}"),
      Self::Location(Some(c)) => write!(f, "{}, {}", c.lat, c.lng),
      Self::Location(None) => f.write_str(NO_LOCATION_MARKER),
      Self::Plates(p) if p.is_empty() => f.write_str(NO_PLATES_MARKER),
      Self::Plates(p) => {
        let mut sorted: Vec<&str> = p.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        f.write_str(&sorted.join(", "))
      }
    }
  }
}

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Who a change is attributed to.
///
/// There is no authentication; callers pass whatever label they have and
/// fall back to [`Actor::system`].
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
  pub const SYSTEM: &'static str = "system";

  /// A trimmed label; blank input becomes [`Actor::system`].
  pub fn new(label: impl Into<String>) -> Self {
    let label = label.into();
    let trimmed = label.trim();
    if trimmed.is_empty() {
      Self::system()
    } else {
      Self(trimmed.to_owned())
    }
  }

  pub fn system() -> Self { Self(Self::SYSTEM.to_owned()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for Actor {
  fn default() -> Self { Self::system() }
}

impl fmt::Display for Actor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Which workflow produced a change record.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
  /// A save tied to a new regulatory decision.
  #[default]
  Revision,
  /// A plain correction, grouped as a manual edit.
  Correction,
  /// A plate moved between stands.
  Transfer,
}

/// The decision a change record is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTag {
  pub reference: String,
  pub date:      Option<NaiveDate>,
}

impl DecisionTag {
  /// Tag taken from a snapshot's current decision; `None` when its
  /// reference is blank.
  pub fn from_decision(decision: &Decision) -> Option<Self> {
    let reference = decision.reference.trim();
    (!reference.is_empty()).then(|| Self {
      reference: reference.to_owned(),
      date:      decision.date,
    })
  }
}

// ─── ChangeRecord ────────────────────────────────────────────────────────────

/// One field-level mutation of a stand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
  pub change_id:   Uuid,
  pub recorded_at: DateTime<Utc>,
  pub field:       FieldName,
  pub old_value:   FieldValue,
  pub new_value:   FieldValue,
  pub actor:       Actor,
  #[serde(default)]
  pub origin:      ChangeOrigin,
  /// Copied from the *target* snapshot's decision when the record was made.
  pub decision:    Option<DecisionTag>,
}

impl ChangeRecord {
  pub fn decision_reference(&self) -> Option<&str> {
    self.decision.as_ref().map(|d| d.reference.as_str())
  }
}
