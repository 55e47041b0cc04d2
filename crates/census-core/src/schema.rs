//! The citizen field schema.
//!
//! A fixed table of [`FieldSpec`] descriptors, one per field, walked by both
//! the new-record and the update validators.

use std::{fmt, sync::LazyLock};

use regex::Regex;

/// Every field a citizen record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
  CitizenId,
  Town,
  Street,
  Building,
  Apartment,
  Name,
  BirthDate,
  Gender,
  Relatives,
}

impl Field {
  pub fn name(self) -> &'static str { self.spec().name }

  pub fn from_name(name: &str) -> Option<Self> {
    FIELDS.iter().find(|s| s.name == name).map(|s| s.field)
  }

  pub fn spec(self) -> &'static FieldSpec {
    // FIELDS is declared in variant order.
    &FIELDS[self as usize]
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// The JSON shape a field's value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Integer,
  Text,
  Sequence,
}

impl fmt::Display for FieldKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Integer => "integer",
      Self::Text => "string",
      Self::Sequence => "array",
    })
  }
}

static WORD: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\w+").expect("static regex"));
static ANY: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r".+").expect("static regex"));

/// A content predicate a text field must satisfy somewhere in its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentPattern {
  /// At least one letter, digit or underscore.
  Word,
  /// At least one character other than a line break.
  NonEmpty,
}

impl ContentPattern {
  pub fn is_match(self, value: &str) -> bool {
    match self {
      Self::Word => WORD.is_match(value),
      Self::NonEmpty => ANY.is_match(value),
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Word => r"\w+",
      Self::NonEmpty => ".+",
    }
  }
}

/// Static description of one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
  pub field:   Field,
  pub name:    &'static str,
  pub kind:    FieldKind,
  /// Upper bound on the number of characters of a text value.
  pub max_len: Option<usize>,
  pub pattern: Option<ContentPattern>,
}

const fn spec(
  field: Field,
  name: &'static str,
  kind: FieldKind,
  max_len: Option<usize>,
  pattern: Option<ContentPattern>,
) -> FieldSpec {
  FieldSpec { field, name, kind, max_len, pattern }
}

/// Maximum length of the free-text fields.
pub const MAX_TEXT_LEN: usize = 256;

const ADDRESS: Option<ContentPattern> = Some(ContentPattern::Word);

/// The full schema, in [`Field`] declaration order.
pub static FIELDS: [FieldSpec; 9] = [
  spec(Field::CitizenId, "citizen_id", FieldKind::Integer, None, None),
  spec(Field::Town, "town", FieldKind::Text, Some(MAX_TEXT_LEN), ADDRESS),
  spec(Field::Street, "street", FieldKind::Text, Some(MAX_TEXT_LEN), ADDRESS),
  spec(Field::Building, "building", FieldKind::Text, Some(MAX_TEXT_LEN), ADDRESS),
  spec(Field::Apartment, "apartment", FieldKind::Integer, None, None),
  spec(
    Field::Name,
    "name",
    FieldKind::Text,
    Some(MAX_TEXT_LEN),
    Some(ContentPattern::NonEmpty),
  ),
  spec(Field::BirthDate, "birth_date", FieldKind::Text, None, None),
  spec(Field::Gender, "gender", FieldKind::Text, None, None),
  spec(Field::Relatives, "relatives", FieldKind::Sequence, None, None),
];
