//! SQL schema for the stand registry SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Current snapshot of every stand. Rewritten in place on each save.
CREATE TABLE IF NOT EXISTS stands (
    stand_id           TEXT PRIMARY KEY,
    name               TEXT NOT NULL,
    phone              TEXT NOT NULL,
    city               TEXT NOT NULL,
    district           TEXT NOT NULL,
    neighborhood       TEXT NOT NULL,
    street             TEXT NOT NULL,
    address            TEXT NOT NULL,
    lat                REAL,
    lng                REAL,
    capacity           INTEGER NOT NULL,
    plates             TEXT NOT NULL DEFAULT '[]',   -- JSON array, sorted
    decision_reference TEXT NOT NULL,
    decision_date      TEXT,                         -- YYYY-MM-DD or NULL
    decision_summary   TEXT NOT NULL,
    status             TEXT NOT NULL,                -- 'active' | 'passive' | 'pending_approval'
    office_type        TEXT NOT NULL,
    responsibility     TEXT NOT NULL,
    notes              TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    CHECK ((lat IS NULL) = (lng IS NULL))
);

-- Change records are strictly append-only.
-- No UPDATE is ever issued against this table; rows go away only with
-- their stand.
CREATE TABLE IF NOT EXISTS change_records (
    change_id          TEXT PRIMARY KEY,
    stand_id           TEXT NOT NULL REFERENCES stands(stand_id) ON DELETE CASCADE,
    seq                INTEGER NOT NULL,   -- position in the stand's history
    recorded_at        TEXT NOT NULL,      -- RFC 3339 UTC
    field              TEXT NOT NULL,
    old_value          TEXT NOT NULL,      -- JSON-encoded FieldValue
    new_value          TEXT NOT NULL,      -- JSON-encoded FieldValue
    actor              TEXT NOT NULL,
    origin             TEXT NOT NULL DEFAULT 'revision',
    decision_reference TEXT,
    decision_date      TEXT
);

CREATE INDEX IF NOT EXISTS change_records_stand_idx    ON change_records(stand_id, seq);
CREATE INDEX IF NOT EXISTS change_records_recorded_idx ON change_records(recorded_at);

PRAGMA user_version = 1;
";
