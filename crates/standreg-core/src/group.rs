//! Transaction grouper: a flat history folded into logical transactions.
//!
//! Records filed under a decision reference share that reference as their
//! key. Records without one are manual edits; each manual save becomes its own
//! transaction, keyed by the records' shared creation timestamp.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error,
  change::{Actor, ChangeOrigin, ChangeRecord},
};

// ─── GroupKey ────────────────────────────────────────────────────────────────

const MANUAL_PREFIX: &str = "manual@";
const DECISION_PREFIX: &str = "decision@";

/// Identity of a [`Transaction`].
///
/// The text form is the decision reference itself, or
/// `manual@<RFC 3339 timestamp>` for a manual edit. A reference that itself
/// starts with `manual@` or `decision@` is written as `decision@<reference>`
/// so it never reads back as a different key.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub enum GroupKey {
  Decision(String),
  Manual(DateTime<Utc>),
}

impl GroupKey {
  /// The key `record` is grouped under.
  pub fn of(record: &ChangeRecord) -> Self {
    match record.decision_reference() {
      Some(reference) if !reference.trim().is_empty() => {
        Self::Decision(reference.to_owned())
      }
      _ => Self::Manual(record.recorded_at),
    }
  }
}

impl fmt::Display for GroupKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Decision(reference)
        if reference.starts_with(MANUAL_PREFIX)
          || reference.starts_with(DECISION_PREFIX) =>
      {
        write!(f, "{DECISION_PREFIX}{reference}")
      }
      Self::Decision(reference) => f.write_str(reference),
      Self::Manual(at) => write!(
        f,
        "{MANUAL_PREFIX}{}",
        at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
      ),
    }
  }
}

impl FromStr for GroupKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.is_empty() {
      return Err(Error::InvalidGroupKey(s.to_owned()));
    }
    if let Some(reference) = s.strip_prefix(DECISION_PREFIX) {
      return match reference.trim() {
        "" => Err(Error::InvalidGroupKey(s.to_owned())),
        _ => Ok(Self::Decision(reference.to_owned())),
      };
    }
    match s.strip_prefix(MANUAL_PREFIX) {
      Some(ts) => DateTime::parse_from_rfc3339(ts)
        .map(|dt| Self::Manual(dt.with_timezone(&Utc)))
        .map_err(|_| Error::InvalidGroupKey(s.to_owned())),
      None => Ok(Self::Decision(s.to_owned())),
    }
  }
}

impl From<GroupKey> for String {
  fn from(key: GroupKey) -> Self { key.to_string() }
}

impl TryFrom<String> for GroupKey {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

// ─── Transaction ─────────────────────────────────────────────────────────────

/// Change records that share a cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
  pub key:                GroupKey,
  pub decision_reference: Option<String>,
  pub decision_date:      Option<NaiveDate>,
  /// The newest member timestamp; orders transactions.
  pub recorded_at:        DateTime<Utc>,
  /// Actor of the newest member.
  pub actor:              Actor,
  pub origin:             ChangeOrigin,
  /// Members in their original history order.
  pub records:            Vec<ChangeRecord>,
}

/// Partition `history` into transactions, newest first.
///
/// Every record lands in exactly one transaction. Ties on timestamp fall back
/// to ascending key order, so the output does not depend on input order.
pub fn group_history(history: &[ChangeRecord]) -> Vec<Transaction> {
  let mut buckets: BTreeMap<GroupKey, Vec<ChangeRecord>> = BTreeMap::new();
  for record in history {
    buckets
      .entry(GroupKey::of(record))
      .or_default()
      .push(record.clone());
  }

  let mut transactions: Vec<Transaction> = buckets
    .into_iter()
    .filter_map(|(key, records)| {
      // Newest record; ties go to the alphabetically first actor.
      let latest = records.iter().max_by(|a, b| {
        a.recorded_at
          .cmp(&b.recorded_at)
          .then_with(|| b.actor.cmp(&a.actor))
      })?;
      let recorded_at = latest.recorded_at;
      let actor = latest.actor.clone();
      let origin = latest.origin;
      let decision_date = latest.decision.as_ref().and_then(|d| d.date);
      let decision_reference = match &key {
        GroupKey::Decision(reference) => Some(reference.clone()),
        GroupKey::Manual(_) => None,
      };
      Some(Transaction {
        key,
        decision_reference,
        decision_date,
        recorded_at,
        actor,
        origin,
        records,
      })
    })
    .collect();

  transactions.sort_by(|a, b| {
    b.recorded_at
      .cmp(&a.recorded_at)
      .then_with(|| a.key.cmp(&b.key))
  });
  transactions
}

/// The transaction keyed `key`, if any.
pub fn find_transaction(
  history: &[ChangeRecord],
  key: &GroupKey,
) -> Option<Transaction> {
  group_history(history).into_iter().find(|t| &t.key == key)
}
