//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, birth dates as ISO
//! `YYYY-MM-DD` (so `strftime` can take them apart) and genders as their
//! lowercase names.

use chrono::{DateTime, NaiveDate, Utc};
use census_core::citizen::{Citizen, CitizenId, CitizenPatch, Gender};
use rusqlite::types::Value as SqlValue;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Gender ──────────────────────────────────────────────────────────────────

pub fn encode_gender(g: Gender) -> &'static str { g.as_str() }

pub fn decode_gender(s: &str) -> Result<Gender> { Ok(s.parse()?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `citizens` row.
pub struct RawCitizen {
  pub citizen_id: CitizenId,
  pub town:       String,
  pub street:     String,
  pub building:   String,
  pub apartment:  u64,
  pub name:       String,
  pub birth_date: String,
  pub gender:     String,
}

/// Column list matching [`RawCitizen::from_row`].
pub const CITIZEN_COLUMNS: &str =
  "citizen_id, town, street, building, apartment, name, birth_date, gender";

impl RawCitizen {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      citizen_id: row.get(0)?,
      town:       row.get(1)?,
      street:     row.get(2)?,
      building:   row.get(3)?,
      apartment:  row.get(4)?,
      name:       row.get(5)?,
      birth_date: row.get(6)?,
      gender:     row.get(7)?,
    })
  }

  pub fn into_citizen(self, relatives: Vec<CitizenId>) -> Result<Citizen> {
    Ok(Citizen {
      citizen_id: self.citizen_id,
      town:       self.town,
      street:     self.street,
      building:   self.building,
      apartment:  self.apartment,
      name:       self.name,
      birth_date: decode_date(&self.birth_date)?,
      gender:     decode_gender(&self.gender)?,
      relatives,
    })
  }
}

/// The scalar columns a patch sets, in a fixed order. `relatives` is handled
/// separately since it lives in its own table.
pub fn patch_columns(
  patch: &CitizenPatch,
) -> Result<Vec<(&'static str, SqlValue)>> {
  let mut cols = Vec::new();
  if let Some(v) = &patch.town {
    cols.push(("town", SqlValue::Text(v.clone())));
  }
  if let Some(v) = &patch.street {
    cols.push(("street", SqlValue::Text(v.clone())));
  }
  if let Some(v) = &patch.building {
    cols.push(("building", SqlValue::Text(v.clone())));
  }
  if let Some(v) = patch.apartment {
    let v = i64::try_from(v).map_err(|_| Error::OutOfRange(v))?;
    cols.push(("apartment", SqlValue::Integer(v)));
  }
  if let Some(v) = &patch.name {
    cols.push(("name", SqlValue::Text(v.clone())));
  }
  if let Some(v) = patch.birth_date {
    cols.push(("birth_date", SqlValue::Text(encode_date(v))));
  }
  if let Some(v) = patch.gender {
    cols.push(("gender", SqlValue::Text(encode_gender(v).to_owned())));
  }
  Ok(cols)
}
