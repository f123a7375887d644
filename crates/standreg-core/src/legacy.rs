//! Import of the legacy JSON document format.
//!
//! The legacy file is a JSON array of stands with camelCase keys. Its change
//! logs hold every value as display text, with Turkish blank markers and
//! status labels. Import decodes those texts back into typed
//! [`FieldValue`]s per field.
//!
//! Import is lenient. A value that does not decode for its field is kept as
//! [`FieldValue::Text`] and a warning is logged; reconstruction later skips
//! such records. A record with an unparseable timestamp or an unknown field
//! name is dropped, never the whole document.
//!
//! Legacy saves stamped each record separately, so one manual save can spread
//! over a few milliseconds. Untagged records by the same actor that fall
//! within [`SAVE_WINDOW_MS`] of the first record of their run are moved onto
//! that first timestamp and so form a single manual transaction.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Result,
  change::{Actor, ChangeOrigin, ChangeRecord, DecisionTag, FieldName, FieldValue},
  plates::normalize_plates,
  stand::{Coordinate, Decision, Stand, StandStatus},
};

const BLANK: &str = "(Boş)";
const NO_LOCATION: &str = "(Konum Yok)";
const NO_PLATES: &str = "(Plaka Yok)";
const TRANSFER_PREFIX: &str = "TRANSFER-";

/// Widest spread of timestamps, in milliseconds, treated as one legacy
/// manual save.
pub const SAVE_WINDOW_MS: i64 = 50;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyStand {
  id:                 String,
  name:               String,
  phone:              String,
  city:               String,
  district:           String,
  neighborhood:       String,
  street:             String,
  address:            String,
  location:           Option<Coordinate>,
  capacity:           serde_json::Value,
  plates:             Vec<String>,
  ukome_decision_no:  String,
  ukome_date:         String,
  ukome_summary:      String,
  status:             String,
  office_type:        String,
  responsibility:     String,
  notes:              String,
  history:            Vec<LegacyChangeLog>,
  created_at:         String,
  updated_at:         String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyChangeLog {
  id:                 String,
  timestamp:          String,
  field_name:         String,
  old_value:          String,
  new_value:          String,
  changed_by:         String,
  related_ukome_no:   Option<String>,
  related_ukome_date: Option<String>,
}

/// Convert a legacy document into stands.
///
/// Identifiers become deterministic v5 UUIDs, so importing the same
/// document twice yields the same stand and change ids.
pub fn import_document(json: &str) -> Result<Vec<Stand>> {
  let legacy: Vec<LegacyStand> = serde_json::from_str(json)?;
  let stands: Vec<Stand> = legacy.into_iter().map(convert_stand).collect();
  info!(
    stands = stands.len(),
    records = stands.iter().map(|s| s.history.len()).sum::<usize>(),
    "legacy document imported"
  );
  Ok(stands)
}

fn legacy_id(raw: &str) -> Uuid { Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_bytes()) }

fn convert_stand(legacy: LegacyStand) -> Stand {
  let stand_id = legacy_id(&legacy.id);

  let mut history: Vec<ChangeRecord> = legacy
    .history
    .into_iter()
    .filter_map(|log| convert_record(stand_id, log))
    .collect();
  history.sort_by_key(|r| r.recorded_at);
  merge_split_saves(stand_id, &mut history);

  let newest = history.last().map(|r| r.recorded_at);
  let created_at = parse_timestamp(&legacy.created_at)
    .or(history.first().map(|r| r.recorded_at))
    .unwrap_or(DateTime::UNIX_EPOCH);
  let updated_at = parse_timestamp(&legacy.updated_at)
    .or(newest)
    .unwrap_or(created_at);

  let capacity = match &legacy.capacity {
    serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
    serde_json::Value::String(s) => decode_capacity(s),
    serde_json::Value::Null => Some(0),
    _ => None,
  }
  .unwrap_or_else(|| {
    warn!(%stand_id, capacity = %legacy.capacity, "unreadable capacity, using 0");
    0
  });

  Stand {
    stand_id,
    name: legacy.name,
    phone: legacy.phone,
    city: legacy.city,
    district: legacy.district,
    neighborhood: legacy.neighborhood,
    street: legacy.street,
    address: legacy.address,
    location: legacy.location,
    capacity,
    plates: legacy.plates,
    decision: Decision {
      reference: legacy.ukome_decision_no,
      date:      decode_date(&legacy.ukome_date).flatten(),
      summary:   legacy.ukome_summary,
    },
    status: decode_status(&legacy.status).unwrap_or_default(),
    office_type: legacy.office_type,
    responsibility: legacy.responsibility,
    notes: legacy.notes,
    created_at,
    updated_at,
    history,
  }
  .normalized()
}

fn convert_record(stand_id: Uuid, log: LegacyChangeLog) -> Option<ChangeRecord> {
  let Some(recorded_at) = parse_timestamp(&log.timestamp) else {
    warn!(%stand_id, log_id = %log.id, timestamp = %log.timestamp, "unparseable timestamp, dropping record");
    return None;
  };
  let Some(field) = legacy_field(&log.field_name) else {
    warn!(%stand_id, log_id = %log.id, field = %log.field_name, "unknown field, dropping record");
    return None;
  };

  let decision = log
    .related_ukome_no
    .as_deref()
    .map(str::trim)
    .filter(|r| !r.is_empty())
    .map(|reference| DecisionTag {
      reference: reference.to_owned(),
      date:      log
        .related_ukome_date
        .as_deref()
        .and_then(decode_date)
        .flatten(),
    });
  let origin = match &decision {
    Some(tag) if tag.reference.starts_with(TRANSFER_PREFIX) => ChangeOrigin::Transfer,
    Some(_) => ChangeOrigin::Revision,
    None => ChangeOrigin::Correction,
  };

  Some(ChangeRecord {
    change_id: Uuid::new_v5(&stand_id, log.id.as_bytes()),
    recorded_at,
    field,
    old_value: decode_value(stand_id, field, &log.old_value),
    new_value: decode_value(stand_id, field, &log.new_value),
    actor: Actor::new(&log.changed_by),
    origin,
    decision,
  })
}

/// Snap each run of untagged same-actor records in time-sorted `history` onto
/// the run's first timestamp.
fn merge_split_saves(stand_id: Uuid, history: &mut [ChangeRecord]) {
  let window = Duration::milliseconds(SAVE_WINDOW_MS);
  let mut anchor: Option<(DateTime<Utc>, Actor)> = None;
  let mut merged = 0usize;
  for record in history.iter_mut() {
    if record.decision.is_some() {
      anchor = None;
      continue;
    }
    match &anchor {
      Some((at, actor))
        if *actor == record.actor && record.recorded_at - *at <= window =>
      {
        if record.recorded_at != *at {
          record.recorded_at = *at;
          merged += 1;
        }
      }
      _ => anchor = Some((record.recorded_at, record.actor.clone())),
    }
  }
  if merged > 0 {
    debug!(%stand_id, merged, "merged split legacy saves");
  }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(raw.trim())
    .ok()
    .map(|t| t.with_timezone(&Utc))
}

fn legacy_field(name: &str) -> Option<FieldName> {
  Some(match name {
    "name" => FieldName::Name,
    "phone" => FieldName::Phone,
    "city" => FieldName::City,
    "district" => FieldName::District,
    "neighborhood" => FieldName::Neighborhood,
    "street" => FieldName::Street,
    "address" => FieldName::Address,
    "capacity" => FieldName::Capacity,
    "ukomeDecisionNo" => FieldName::DecisionReference,
    "ukomeDate" => FieldName::DecisionDate,
    "ukomeSummary" => FieldName::DecisionSummary,
    "status" => FieldName::Status,
    "officeType" => FieldName::OfficeType,
    "responsibility" => FieldName::Responsibility,
    "notes" => FieldName::Notes,
    "location" => FieldName::Location,
    "plates" => FieldName::Plates,
    _ => return None,
  })
}

fn is_blank(raw: &str) -> bool {
  let raw = raw.trim();
  raw.is_empty() || raw == BLANK
}

fn decode_value(stand_id: Uuid, field: FieldName, raw: &str) -> FieldValue {
  let decoded = match field {
    FieldName::Capacity => decode_capacity(raw).map(FieldValue::Capacity),
    FieldName::DecisionDate => decode_date(raw).map(FieldValue::Date),
    FieldName::Status => decode_status(raw).map(FieldValue::Status),
    FieldName::Location => decode_location(raw).map(FieldValue::Location),
    FieldName::Plates => Some(FieldValue::Plates(decode_plates(raw))),
    _ if is_blank(raw) => Some(FieldValue::Text(String::new())),
    _ => Some(FieldValue::Text(raw.trim().to_owned())),
  };
  decoded.unwrap_or_else(|| {
    warn!(%stand_id, %field, value = raw, "value does not decode for its field, keeping text");
    FieldValue::Text(raw.to_owned())
  })
}

fn decode_capacity(raw: &str) -> Option<u32> {
  if is_blank(raw) {
    return Some(0);
  }
  raw.trim().parse().ok()
}

/// `Some(None)` for a blank date, `None` when the text is not a date.
fn decode_date(raw: &str) -> Option<Option<NaiveDate>> {
  if is_blank(raw) {
    return Some(None);
  }
  let raw = raw.trim();
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .or_else(|_| NaiveDate::parse_from_str(raw, "%d.%m.%Y"))
    .ok()
    .map(Some)
}

fn decode_status(raw: &str) -> Option<StandStatus> {
  match raw.trim() {
    "Aktif" => Some(StandStatus::Active),
    "Pasif" => Some(StandStatus::Passive),
    "Onay Bekliyor" => Some(StandStatus::PendingApproval),
    other => other.parse().ok(),
  }
}

fn decode_location(raw: &str) -> Option<Option<Coordinate>> {
  let raw = raw.trim();
  if raw.is_empty() || raw == NO_LOCATION || raw == BLANK {
    return Some(None);
  }
  let (lat, lng) = raw.split_once(',')?;
  Some(Some(Coordinate {
    lat: lat.trim().parse().ok()?,
    lng: lng.trim().parse().ok()?,
  }))
}

fn decode_plates(raw: &str) -> Vec<String> {
  let raw = raw.trim();
  if raw.is_empty() || raw == NO_PLATES || raw == BLANK {
    return Vec::new();
  }
  let plates: Vec<String> = raw.split(',').map(str::to_owned).collect();
  normalize_plates(&plates)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    group::{GroupKey, group_history},
    reconstruct::reconstruct,
  };

  const DOCUMENT: &str = r#"[
    {
      "id": "1717000000000",
      "name": "Alsancak Taksi",
      "phone": "0232 111 22 33",
      "city": "İzmir",
      "district": "Konak",
      "neighborhood": "Alsancak",
      "street": "Kıbrıs Şehitleri Cd.",
      "address": "Kıbrıs Şehitleri Cd. No:1",
      "location": { "lat": 38.43, "lng": 27.14 },
      "capacity": 8,
      "plates": ["35 T 1001", "35 t 1002"],
      "ukomeDecisionNo": "2024/3-12",
      "ukomeDate": "2024-03-10",
      "ukomeSummary": "Kapasite artışı",
      "status": "Aktif",
      "officeType": "Konteyner",
      "responsibility": "Belediye",
      "notes": "",
      "createdAt": "2024-01-05T09:00:00.000Z",
      "updatedAt": "2024-03-11T10:00:00.000Z",
      "history": [
        {
          "id": "a1",
          "timestamp": "2024-03-11T10:00:00.000Z",
          "fieldName": "capacity",
          "oldValue": "5",
          "newValue": "8",
          "changedBy": "Admin",
          "relatedUkomeNo": "2024/3-12",
          "relatedUkomeDate": "2024-03-10"
        },
        {
          "id": "a2",
          "timestamp": "2024-03-11T10:00:00.000Z",
          "fieldName": "plates",
          "oldValue": "(Plaka Yok)",
          "newValue": "35 T 1001, 35 T 1002",
          "changedBy": "Admin",
          "relatedUkomeNo": "2024/3-12",
          "relatedUkomeDate": "2024-03-10"
        },
        {
          "id": "a3",
          "timestamp": "2024-02-01T08:00:00.000Z",
          "fieldName": "location",
          "oldValue": "(Konum Yok)",
          "newValue": "38.43, 27.14",
          "changedBy": "",
          "relatedUkomeNo": ""
        },
        {
          "id": "a4",
          "timestamp": "yesterday",
          "fieldName": "notes",
          "oldValue": "(Boş)",
          "newValue": "x",
          "changedBy": "Admin"
        }
      ]
    }
  ]"#;

  #[test]
  fn imports_snapshot_fields() {
    let stands = import_document(DOCUMENT).unwrap();
    assert_eq!(stands.len(), 1);
    let stand = &stands[0];

    assert_eq!(stand.stand_id, legacy_id("1717000000000"));
    assert_eq!(stand.capacity, 8);
    assert_eq!(stand.plates, ["35 T 1001", "35 T 1002"]);
    assert_eq!(stand.status, StandStatus::Active);
    assert_eq!(stand.decision.date, NaiveDate::from_ymd_opt(2024, 3, 10));
    assert_eq!(stand.location, Some(Coordinate { lat: 38.43, lng: 27.14 }));
  }

  #[test]
  fn decodes_records_and_drops_bad_timestamps() {
    let stands = import_document(DOCUMENT).unwrap();
    let history = &stands[0].history;
    assert_eq!(history.len(), 3, "record with bad timestamp dropped");

    // Oldest first after import.
    let location = &history[0];
    assert_eq!(location.field, FieldName::Location);
    assert_eq!(location.old_value, FieldValue::Location(None));
    assert_eq!(location.origin, ChangeOrigin::Correction);
    assert!(location.decision.is_none());
    assert_eq!(location.actor, Actor::system());

    let plates = history.iter().find(|r| r.field == FieldName::Plates).unwrap();
    assert_eq!(plates.old_value, FieldValue::Plates(vec![]));
    assert_eq!(
      plates.new_value,
      FieldValue::Plates(vec!["35 T 1001".into(), "35 T 1002".into()])
    );
    assert_eq!(plates.decision_reference(), Some("2024/3-12"));
  }

  #[test]
  fn imported_history_groups_and_reconstructs() {
    let stands = import_document(DOCUMENT).unwrap();
    let stand = &stands[0];
    let groups = group_history(&stand.history);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, GroupKey::Decision("2024/3-12".into()));
    assert!(matches!(groups[1].key, GroupKey::Manual(_)));

    let past = reconstruct(stand, &stand.history, Some(&groups[1].key));
    assert_eq!(past.capacity, 5);
    assert!(past.plates.is_empty());
    assert_eq!(past.location, Some(Coordinate { lat: 38.43, lng: 27.14 }));
  }

  #[test]
  fn import_is_deterministic() {
    let a = import_document(DOCUMENT).unwrap();
    let b = import_document(DOCUMENT).unwrap();
    assert_eq!(a, b);
  }

  #[test]
  fn undecodable_values_are_kept_as_text() {
    let id = Uuid::nil();
    assert_eq!(
      decode_value(id, FieldName::Capacity, "many"),
      FieldValue::Text("many".into())
    );
    assert_eq!(
      decode_value(id, FieldName::Status, "Onay Bekliyor"),
      FieldValue::Status(StandStatus::PendingApproval)
    );
    assert_eq!(decode_value(id, FieldName::Phone, "(Boş)"), FieldValue::Text(String::new()));
    assert_eq!(decode_value(id, FieldName::DecisionDate, "(Boş)"), FieldValue::Date(None));
  }

  #[test]
  fn transfer_references_mark_transfer_origin() {
    let log = LegacyChangeLog {
      id: "t1".into(),
      timestamp: "2024-04-01T00:00:00Z".into(),
      field_name: "plates".into(),
      old_value: "35 T 1".into(),
      new_value: "(Plaka Yok)".into(),
      changed_by: "PlakaYönetim".into(),
      related_ukome_no: Some("TRANSFER-2024-04-01".into()),
      related_ukome_date: Some("2024-04-01".into()),
    };
    let record = convert_record(Uuid::nil(), log).unwrap();
    assert_eq!(record.origin, ChangeOrigin::Transfer);
    assert_eq!(record.actor.as_str(), "PlakaYönetim");
  }

  fn manual_log(
    id: &str,
    timestamp: &str,
    field: &str,
    old: &str,
    new: &str,
  ) -> LegacyChangeLog {
    LegacyChangeLog {
      id: id.into(),
      timestamp: timestamp.into(),
      field_name: field.into(),
      old_value: old.into(),
      new_value: new.into(),
      changed_by: "Admin".into(),
      ..LegacyChangeLog::default()
    }
  }

  #[test]
  fn save_spread_over_milliseconds_is_one_transaction() {
    let legacy = LegacyStand {
      id: "1717000000001".into(),
      name: "Bornova Taksi".into(),
      phone: "0232 000".into(),
      notes: "gece açık".into(),
      status: "Aktif".into(),
      history: vec![
        manual_log("b1", "2024-03-11T10:00:00.000Z", "name", "Bornova", "Bornova Taksi"),
        manual_log("b2", "2024-03-11T10:00:00.002Z", "notes", "(Boş)", "gece açık"),
        manual_log("b3", "2024-03-11T11:00:00.000Z", "phone", "(Boş)", "0232 000"),
      ],
      ..LegacyStand::default()
    };
    let stand = convert_stand(legacy);
    let groups = group_history(&stand.history);
    assert_eq!(groups.len(), 2);

    let first_save = &groups[1];
    assert_eq!(first_save.records.len(), 2);
    assert_eq!(first_save.key.to_string(), "manual@2024-03-11T10:00:00Z");

    let past = reconstruct(&stand, &stand.history, Some(&first_save.key));
    assert_eq!(past.name, "Bornova Taksi");
    assert_eq!(past.notes, "gece açık");
    assert_eq!(past.phone, "");
  }

  #[test]
  fn separate_saves_stay_apart() {
    let mut other_actor =
      manual_log("c2", "2024-03-11T10:00:00.001Z", "notes", "(Boş)", "x");
    other_actor.changed_by = "Clerk".into();
    let legacy = LegacyStand {
      id: "1717000000002".into(),
      notes: "x".into(),
      phone: "1".into(),
      history: vec![
        manual_log("c1", "2024-03-11T10:00:00.000Z", "phone", "(Boş)", "1"),
        other_actor,
      ],
      ..LegacyStand::default()
    };
    let stand = convert_stand(legacy);
    assert_eq!(group_history(&stand.history).len(), 2);
  }

  #[test]
  fn malformed_document_is_an_error() {
    assert!(import_document("{not json").is_err());
  }
}
