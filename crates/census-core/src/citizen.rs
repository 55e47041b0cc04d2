//! Citizen, one person inside one import.
//!
//! [`Citizen`] is the fully-validated record as it is persisted and served.
//! [`CitizenPatch`] is the partial form accepted by updates; every field is
//! optional and `citizen_id` is absent by construction.

use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{Datelike as _, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifier of a citizen, unique within its import.
pub type CitizenId = u64;

/// Identifier of an import, assigned by the store when a batch is accepted.
pub type ImportId = u64;

// ─── Gender ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  Male,
  Female,
}

impl Gender {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Male => "male",
      Self::Female => "female",
    }
  }
}

impl FromStr for Gender {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "male" => Ok(Self::Male),
      "female" => Ok(Self::Female),
      other => Err(Error::UnknownGender(other.to_owned())),
    }
  }
}

impl fmt::Display for Gender {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Birth date text format ──────────────────────────────────────────────────

/// The wire format of `birth_date`.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

// Day and month may drop their leading zero; the year is always four digits.
static DATE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[0-9]{1,2}\.[0-9]{1,2}\.[0-9]{4}$").expect("static regex")
});

/// Parse a `DD.MM.YYYY` date. Rejects wrong separators, wrong component
/// order and dates that do not exist in the calendar.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
  if !DATE_SHAPE.is_match(s) {
    return Err(Error::InvalidDate(s.to_owned()));
  }
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .ok()
    .filter(|date| date.year() >= 1)
    .ok_or_else(|| Error::InvalidDate(s.to_owned()))
}

/// Render a date as zero-padded `DD.MM.YYYY`.
pub fn format_date(date: NaiveDate) -> String {
  date.format(DATE_FORMAT).to_string()
}

/// Serde adapter for `birth_date` fields.
pub mod date_format {
  use chrono::NaiveDate;
  use serde::{Deserialize, Deserializer, Serializer, de};

  pub fn serialize<S: Serializer>(
    date: &NaiveDate,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&super::format_date(*date))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<NaiveDate, D::Error> {
    let s = String::deserialize(deserializer)?;
    super::parse_date(&s).map_err(de::Error::custom)
  }

  /// The same adapter for `Option<NaiveDate>`.
  pub mod option {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
      date: &Option<NaiveDate>,
      serializer: S,
    ) -> Result<S::Ok, S::Error> {
      match date {
        Some(d) => serializer.serialize_some(&super::super::format_date(*d)),
        None => serializer.serialize_none(),
      }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
      deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
      Option::<String>::deserialize(deserializer)?
        .map(|s| super::super::parse_date(&s).map_err(de::Error::custom))
        .transpose()
    }
  }
}

// ─── Citizen ─────────────────────────────────────────────────────────────────

/// A fully-specified citizen record.
///
/// `relatives` is semantically a set; stores return it in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
  pub citizen_id: CitizenId,
  pub town:       String,
  pub street:     String,
  pub building:   String,
  pub apartment:  u64,
  pub name:       String,
  #[serde(with = "date_format")]
  pub birth_date: NaiveDate,
  pub gender:     Gender,
  pub relatives:  Vec<CitizenId>,
}

impl Citizen {
  /// Overwrite every field present in `patch`.
  pub fn apply(&mut self, patch: CitizenPatch) {
    let CitizenPatch {
      town,
      street,
      building,
      apartment,
      name,
      birth_date,
      gender,
      relatives,
    } = patch;

    if let Some(v) = town {
      self.town = v;
    }
    if let Some(v) = street {
      self.street = v;
    }
    if let Some(v) = building {
      self.building = v;
    }
    if let Some(v) = apartment {
      self.apartment = v;
    }
    if let Some(v) = name {
      self.name = v;
    }
    if let Some(v) = birth_date {
      self.birth_date = v;
    }
    if let Some(v) = gender {
      self.gender = v;
    }
    if let Some(v) = relatives {
      self.relatives = v;
    }
  }
}

// ─── CitizenPatch ────────────────────────────────────────────────────────────

/// A partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub town:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub street:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub building:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub apartment:  Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:       Option<String>,
  #[serde(
    default,
    with = "date_format::option",
    skip_serializing_if = "Option::is_none"
  )]
  pub birth_date: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gender:     Option<Gender>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub relatives:  Option<Vec<CitizenId>>,
}

impl CitizenPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }
}
