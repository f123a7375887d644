//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, dates as `YYYY-MM-DD`.
//! Field values and plate lists are stored as compact JSON. UUIDs are stored
//! as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use standreg_core::{
  change::{Actor, ChangeOrigin, ChangeRecord, DecisionTag, FieldName, FieldValue},
  stand::{Coordinate, Decision, Stand, StandStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: Option<NaiveDate>) -> Option<String> {
  d.map(|d| d.format("%Y-%m-%d").to_string())
}

pub fn decode_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
  s.map(|s| {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
      .map_err(|e| Error::DateParse(e.to_string()))
  })
  .transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_status(s: StandStatus) -> String { s.to_string() }

pub fn decode_status(s: &str) -> Result<StandStatus> {
  s.parse().map_err(|_| Error::UnknownValue {
    column: "status",
    value:  s.to_owned(),
  })
}

pub fn encode_field(f: FieldName) -> String { f.to_string() }

pub fn decode_field(s: &str) -> Result<FieldName> {
  s.parse().map_err(|_| Error::UnknownValue {
    column: "field",
    value:  s.to_owned(),
  })
}

pub fn encode_origin(o: ChangeOrigin) -> &'static str {
  match o {
    ChangeOrigin::Revision => "revision",
    ChangeOrigin::Correction => "correction",
    ChangeOrigin::Transfer => "transfer",
  }
}

pub fn decode_origin(s: &str) -> Result<ChangeOrigin> {
  match s {
    "revision" => Ok(ChangeOrigin::Revision),
    "correction" => Ok(ChangeOrigin::Correction),
    "transfer" => Ok(ChangeOrigin::Transfer),
    other => Err(Error::UnknownValue {
      column: "origin",
      value:  other.to_owned(),
    }),
  }
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_value(v: &FieldValue) -> Result<String> { Ok(serde_json::to_string(v)?) }

pub fn decode_value(s: &str) -> Result<FieldValue> { Ok(serde_json::from_str(s)?) }

pub fn encode_plates(plates: &[String]) -> Result<String> {
  Ok(serde_json::to_string(plates)?)
}

pub fn decode_plates(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values bound into a `stands` row.
pub struct StandRow {
  pub stand_id:           String,
  pub name:               String,
  pub phone:              String,
  pub city:               String,
  pub district:           String,
  pub neighborhood:       String,
  pub street:             String,
  pub address:            String,
  pub lat:                Option<f64>,
  pub lng:                Option<f64>,
  pub capacity:           i64,
  pub plates:             String,
  pub decision_reference: String,
  pub decision_date:      Option<String>,
  pub decision_summary:   String,
  pub status:             String,
  pub office_type:        String,
  pub responsibility:     String,
  pub notes:              String,
  pub created_at:         String,
  pub updated_at:         String,
}

impl StandRow {
  /// The snapshot columns of `stand`; its history is encoded separately.
  pub fn encode(stand: &Stand) -> Result<Self> {
    Ok(Self {
      stand_id:           encode_uuid(stand.stand_id),
      name:               stand.name.clone(),
      phone:              stand.phone.clone(),
      city:               stand.city.clone(),
      district:           stand.district.clone(),
      neighborhood:       stand.neighborhood.clone(),
      street:             stand.street.clone(),
      address:            stand.address.clone(),
      lat:                stand.location.map(|c| c.lat),
      lng:                stand.location.map(|c| c.lng),
      capacity:           i64::from(stand.capacity),
      plates:             encode_plates(&stand.plates)?,
      decision_reference: stand.decision.reference.clone(),
      decision_date:      encode_date(stand.decision.date),
      decision_summary:   stand.decision.summary.clone(),
      status:             encode_status(stand.status),
      office_type:        stand.office_type.clone(),
      responsibility:     stand.responsibility.clone(),
      notes:              stand.notes.clone(),
      created_at:         encode_dt(stand.created_at),
      updated_at:         encode_dt(stand.updated_at),
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      stand_id:           row.get(0)?,
      name:               row.get(1)?,
      phone:              row.get(2)?,
      city:               row.get(3)?,
      district:           row.get(4)?,
      neighborhood:       row.get(5)?,
      street:             row.get(6)?,
      address:            row.get(7)?,
      lat:                row.get(8)?,
      lng:                row.get(9)?,
      capacity:           row.get(10)?,
      plates:             row.get(11)?,
      decision_reference: row.get(12)?,
      decision_date:      row.get(13)?,
      decision_summary:   row.get(14)?,
      status:             row.get(15)?,
      office_type:        row.get(16)?,
      responsibility:     row.get(17)?,
      notes:              row.get(18)?,
      created_at:         row.get(19)?,
      updated_at:         row.get(20)?,
    })
  }

  pub fn into_stand(self, history: Vec<ChangeRecord>) -> Result<Stand> {
    let location = match (self.lat, self.lng) {
      (Some(lat), Some(lng)) => Some(Coordinate { lat, lng }),
      _ => None,
    };
    let capacity = u32::try_from(self.capacity).map_err(|_| Error::UnknownValue {
      column: "capacity",
      value:  self.capacity.to_string(),
    })?;

    Ok(Stand {
      stand_id: decode_uuid(&self.stand_id)?,
      name: self.name,
      phone: self.phone,
      city: self.city,
      district: self.district,
      neighborhood: self.neighborhood,
      street: self.street,
      address: self.address,
      location,
      capacity,
      plates: decode_plates(&self.plates)?,
      decision: Decision {
        reference: self.decision_reference,
        date:      decode_date(self.decision_date.as_deref())?,
        summary:   self.decision_summary,
      },
      status: decode_status(&self.status)?,
      office_type: self.office_type,
      responsibility: self.responsibility,
      notes: self.notes,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      history,
    })
  }
}

/// Column values of a `change_records` row.
pub struct RecordRow {
  pub change_id:          String,
  pub stand_id:           String,
  pub seq:                i64,
  pub recorded_at:        String,
  pub field:              String,
  pub old_value:          String,
  pub new_value:          String,
  pub actor:              String,
  pub origin:             String,
  pub decision_reference: Option<String>,
  pub decision_date:      Option<String>,
}

impl RecordRow {
  pub fn encode(stand_id: Uuid, seq: usize, record: &ChangeRecord) -> Result<Self> {
    let decision = record.decision.as_ref();
    Ok(Self {
      change_id:          encode_uuid(record.change_id),
      stand_id:           encode_uuid(stand_id),
      seq:                i64::try_from(seq).unwrap_or(i64::MAX),
      recorded_at:        encode_dt(record.recorded_at),
      field:              encode_field(record.field),
      old_value:          encode_value(&record.old_value)?,
      new_value:          encode_value(&record.new_value)?,
      actor:              record.actor.as_str().to_owned(),
      origin:             encode_origin(record.origin).to_owned(),
      decision_reference: decision.map(|d| d.reference.clone()),
      decision_date:      decision.and_then(|d| encode_date(d.date)),
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      change_id:          row.get(0)?,
      stand_id:           row.get(1)?,
      seq:                row.get(2)?,
      recorded_at:        row.get(3)?,
      field:              row.get(4)?,
      old_value:          row.get(5)?,
      new_value:          row.get(6)?,
      actor:              row.get(7)?,
      origin:             row.get(8)?,
      decision_reference: row.get(9)?,
      decision_date:      row.get(10)?,
    })
  }

  pub fn into_record(self) -> Result<ChangeRecord> {
    let decision = self
      .decision_reference
      .map(|reference| -> Result<DecisionTag> {
        Ok(DecisionTag {
          reference,
          date: decode_date(self.decision_date.as_deref())?,
        })
      })
      .transpose()?;

    Ok(ChangeRecord {
      change_id: decode_uuid(&self.change_id)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      field: decode_field(&self.field)?,
      old_value: decode_value(&self.old_value)?,
      new_value: decode_value(&self.new_value)?,
      actor: Actor::new(self.actor),
      origin: decode_origin(&self.origin)?,
      decision,
    })
  }
}
