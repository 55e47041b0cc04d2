//! Error types for `census-core`.
//!
//! [`ValidationError`] is what the validators return; [`Error`] covers the
//! text decoding helpers shared with storage backends.

use thiserror::Error;

use crate::{
  citizen::CitizenId,
  schema::{Field, FieldKind},
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown gender: {0:?}")]
  UnknownGender(String),

  #[error("invalid date: {0:?}")]
  InvalidDate(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Validation ──────────────────────────────────────────────────────────────

/// Record-level structural problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
  #[error("citizen record must be a JSON object")]
  NotAnObject,

  #[error("citizens must be a JSON array")]
  NotAnArray,

  /// Missing and unexpected names are reported together.
  #[error("{}", field_set_message(.missing, .unexpected))]
  FieldSet {
    missing:    Vec<String>,
    unexpected: Vec<String>,
  },
}

fn field_set_message(missing: &[String], unexpected: &[String]) -> String {
  let mut parts = Vec::new();
  if !missing.is_empty() {
    parts.push(format!("missing fields: {}", missing.join(", ")));
  }
  if !unexpected.is_empty() {
    parts.push(format!("unexpected fields: {}", unexpected.join(", ")));
  }
  parts.join("; ")
}

/// Why a single field's value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldViolation {
  #[error("expected {0}")]
  WrongType(FieldKind),

  #[error("must not be negative")]
  Negative,

  #[error("must not exceed {}", i64::MAX)]
  OutOfRange,

  #[error("longer than {0} characters")]
  TooLong(usize),

  #[error("does not match {0}")]
  Pattern(&'static str),

  #[error("{0:?} is not a DD.MM.YYYY date")]
  InvalidDate(String),

  #[error("{0} is not in the past")]
  NotInPast(String),

  #[error("{0:?} is not one of male, female")]
  UnknownGender(String),

  #[error("{0} is not a citizen id")]
  InvalidRelative(String),
}

/// A rejected record, patch or batch. The first violation found wins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error(transparent)]
  Schema(#[from] SchemaError),

  #[error("invalid {field}: {violation}")]
  Field {
    field:     Field,
    violation: FieldViolation,
  },

  #[error("{0} cannot be updated")]
  ImmutableField(Field),

  #[error("citizen_id {0} appears more than once")]
  DuplicateId(CitizenId),

  #[error("citizen {citizen_id} lists relative {relative_id} more than once")]
  DuplicateRelative {
    citizen_id:  CitizenId,
    relative_id: CitizenId,
  },

  #[error(
    "relatives of citizen {citizen_id} are not mutual: {relative_id} does not match"
  )]
  AsymmetricRelation {
    citizen_id:  CitizenId,
    relative_id: CitizenId,
  },
}

impl ValidationError {
  pub(crate) fn field(field: Field, violation: FieldViolation) -> Self {
    Self::Field { field, violation }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_set_message_lists_both_sides() {
    let err = SchemaError::FieldSet {
      missing:    vec!["gender".into()],
      unexpected: vec!["test_field".into()],
    };
    assert_eq!(
      err.to_string(),
      "missing fields: gender; unexpected fields: test_field"
    );
  }
}
