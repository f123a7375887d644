//! [`SqliteStore`] — the SQLite implementation of [`StandStore`].

use std::{collections::HashMap, path::Path};

use rusqlite::OptionalExtension as _;
use standreg_core::{change::ChangeRecord, stand::Stand, store::StandStore};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Result,
  encode::{RecordRow, StandRow, encode_uuid},
  schema::SCHEMA,
};

const STAND_COLUMNS: &str = "stand_id, name, phone, city, district, neighborhood, street, address,
   lat, lng, capacity, plates, decision_reference, decision_date, decision_summary,
   status, office_type, responsibility, notes, created_at, updated_at";

const RECORD_COLUMNS: &str = "change_id, stand_id, seq, recorded_at, field, old_value, new_value,
   actor, origin, decision_reference, decision_date";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A stand registry backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of change records stored for `id`.
  pub async fn record_count(&self, id: Uuid) -> Result<usize> {
    let id_str = encode_uuid(id);
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM change_records WHERE stand_id = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(usize::try_from(count).unwrap_or_default())
  }
}

/// Attach decoded records to their stands, preserving `seq` order.
fn assemble(stands: Vec<StandRow>, records: Vec<RecordRow>) -> Result<Vec<Stand>> {
  let mut histories: HashMap<String, Vec<ChangeRecord>> = HashMap::new();
  for row in records {
    let stand_id = row.stand_id.clone();
    histories.entry(stand_id).or_default().push(row.into_record()?);
  }
  stands
    .into_iter()
    .map(|row| {
      let history = histories.remove(&row.stand_id).unwrap_or_default();
      row.into_stand(history)
    })
    .collect()
}

// ─── StandStore impl ─────────────────────────────────────────────────────────

impl StandStore for SqliteStore {
  type Error = crate::Error;

  async fn load_all(&self) -> Result<Vec<Stand>> {
    let (stands, records): (Vec<StandRow>, Vec<RecordRow>) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {STAND_COLUMNS} FROM stands"))?;
        let stands = stmt
          .query_map([], StandRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM change_records ORDER BY stand_id, seq, rowid"
        ))?;
        let records = stmt
          .query_map([], RecordRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((stands, records))
      })
      .await?;

    debug!(stands = stands.len(), records = records.len(), "loaded all stands");
    assemble(stands, records)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Stand>> {
    let id_str = encode_uuid(id);

    let raw: Option<(StandRow, Vec<RecordRow>)> = self
      .conn
      .call(move |conn| {
        let stand = conn
          .query_row(
            &format!("SELECT {STAND_COLUMNS} FROM stands WHERE stand_id = ?1"),
            rusqlite::params![id_str],
            StandRow::from_row,
          )
          .optional()?;
        let Some(stand) = stand else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM change_records WHERE stand_id = ?1 ORDER BY seq, rowid"
        ))?;
        let records = stmt
          .query_map(rusqlite::params![id_str], RecordRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some((stand, records)))
      })
      .await?;

    raw
      .map(|(stand, records)| {
        let history = records
          .into_iter()
          .map(RecordRow::into_record)
          .collect::<Result<Vec<_>>>()?;
        stand.into_stand(history)
      })
      .transpose()
  }

  async fn upsert(&self, stand: Stand) -> Result<()> {
    let row = StandRow::encode(&stand)?;
    let records = stand
      .history
      .iter()
      .enumerate()
      .map(|(seq, record)| RecordRow::encode(stand.stand_id, seq, record))
      .collect::<Result<Vec<_>>>()?;

    let inserted: usize = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          &format!(
            "INSERT INTO stands ({STAND_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                     ?15, ?16, ?17, ?18, ?19, ?20, ?21)
             ON CONFLICT(stand_id) DO UPDATE SET
               name = excluded.name,
               phone = excluded.phone,
               city = excluded.city,
               district = excluded.district,
               neighborhood = excluded.neighborhood,
               street = excluded.street,
               address = excluded.address,
               lat = excluded.lat,
               lng = excluded.lng,
               capacity = excluded.capacity,
               plates = excluded.plates,
               decision_reference = excluded.decision_reference,
               decision_date = excluded.decision_date,
               decision_summary = excluded.decision_summary,
               status = excluded.status,
               office_type = excluded.office_type,
               responsibility = excluded.responsibility,
               notes = excluded.notes,
               updated_at = excluded.updated_at"
          ),
          rusqlite::params![
            row.stand_id,
            row.name,
            row.phone,
            row.city,
            row.district,
            row.neighborhood,
            row.street,
            row.address,
            row.lat,
            row.lng,
            row.capacity,
            row.plates,
            row.decision_reference,
            row.decision_date,
            row.decision_summary,
            row.status,
            row.office_type,
            row.responsibility,
            row.notes,
            row.created_at,
            row.updated_at,
          ],
        )?;

        // Existing records keep their row; only new change ids land.
        let mut inserted = 0;
        {
          let mut stmt = tx.prepare(&format!(
            "INSERT OR IGNORE INTO change_records ({RECORD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
          ))?;
          for r in &records {
            inserted += stmt.execute(rusqlite::params![
              r.change_id,
              r.stand_id,
              r.seq,
              r.recorded_at,
              r.field,
              r.old_value,
              r.new_value,
              r.actor,
              r.origin,
              r.decision_reference,
              r.decision_date,
            ])?;
          }
        }
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    debug!(stand_id = %stand.stand_id, appended = inserted, "stand upserted");
    Ok(())
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let removed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM stands WHERE stand_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }
}
