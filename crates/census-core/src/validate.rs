//! Record validation: shape and domain rules for a single citizen.
//!
//! Two modes share one per-field pass:
//!
//! - **new**: every schema field must be present, nothing else;
//! - **update**: any subset of fields except `citizen_id`.
//!
//! Generic checks (type, sign, length, content pattern) run over all present
//! fields first; `birth_date`, `gender` and `relatives` get their value-level
//! checks afterwards.

use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::{
  citizen::{Citizen, CitizenId, CitizenPatch, Gender, parse_date},
  error::{FieldViolation, SchemaError, ValidationError},
  schema::{FIELDS, Field, FieldKind, FieldSpec},
};

type Object = Map<String, Value>;

// ─── Validator ───────────────────────────────────────────────────────────────

/// Validates citizen records against the schema as of a given UTC date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordValidator {
  today: NaiveDate,
}

impl Default for RecordValidator {
  fn default() -> Self { Self::new() }
}

impl RecordValidator {
  /// A validator for the current UTC date.
  pub fn new() -> Self { Self::as_of(Utc::now().date_naive()) }

  /// A validator that treats `today` as the current date; birth dates must
  /// fall strictly before it.
  pub fn as_of(today: NaiveDate) -> Self { Self { today } }

  pub fn today(&self) -> NaiveDate { self.today }

  /// Check a full record submitted as part of an import.
  pub fn validate_new(&self, record: &Value) -> Result<(), ValidationError> {
    self.parse_new(record).map(drop)
  }

  /// Check a partial record submitted as an update.
  pub fn validate_update(&self, record: &Value) -> Result<(), ValidationError> {
    self.parse_update(record).map(drop)
  }

  /// [`validate_new`](Self::validate_new), returning the typed record.
  pub fn parse_new(&self, record: &Value) -> Result<Citizen, ValidationError> {
    let object = record.as_object().ok_or(SchemaError::NotAnObject)?;

    let missing: Vec<String> = FIELDS
      .iter()
      .filter(|s| !object.contains_key(s.name))
      .map(|s| s.name.to_owned())
      .collect();
    let unexpected = unknown_fields(object);
    if !missing.is_empty() || !unexpected.is_empty() {
      return Err(SchemaError::FieldSet { missing, unexpected }.into());
    }

    self.parse_fields(object)?.into_citizen()
  }

  /// [`validate_update`](Self::validate_update), returning the typed patch.
  pub fn parse_update(
    &self,
    record: &Value,
  ) -> Result<CitizenPatch, ValidationError> {
    let object = record.as_object().ok_or(SchemaError::NotAnObject)?;

    let unexpected = unknown_fields(object);
    if !unexpected.is_empty() {
      return Err(
        SchemaError::FieldSet { missing: Vec::new(), unexpected }.into(),
      );
    }
    if object.contains_key(Field::CitizenId.name()) {
      return Err(ValidationError::ImmutableField(Field::CitizenId));
    }

    Ok(self.parse_fields(object)?.patch)
  }

  fn parse_fields(&self, object: &Object) -> Result<ParsedFields, ValidationError> {
    let present = move || {
      FIELDS
        .iter()
        .filter_map(move |spec| object.get(spec.name).map(|value| (spec, value)))
    };

    for (spec, value) in present() {
      check_generic(spec, value)
        .map_err(|v| ValidationError::field(spec.field, v))?;
    }

    let mut parsed = ParsedFields::default();
    for (spec, value) in present() {
      self
        .parse_value(spec.field, value, &mut parsed)
        .map_err(|v| ValidationError::field(spec.field, v))?;
    }
    Ok(parsed)
  }

  fn parse_value(
    &self,
    field: Field,
    value: &Value,
    out: &mut ParsedFields,
  ) -> Result<(), FieldViolation> {
    let patch = &mut out.patch;
    match field {
      Field::CitizenId => out.citizen_id = Some(non_negative(value)?),
      Field::Apartment => patch.apartment = Some(non_negative(value)?),
      Field::Town => patch.town = Some(text(value)?),
      Field::Street => patch.street = Some(text(value)?),
      Field::Building => patch.building = Some(text(value)?),
      Field::Name => patch.name = Some(text(value)?),
      Field::BirthDate => patch.birth_date = Some(self.birth_date(value)?),
      Field::Gender => patch.gender = Some(gender(value)?),
      Field::Relatives => patch.relatives = Some(relatives(value)?),
    }
    Ok(())
  }

  fn birth_date(&self, value: &Value) -> Result<NaiveDate, FieldViolation> {
    let s = value
      .as_str()
      .ok_or(FieldViolation::WrongType(FieldKind::Text))?;
    let date =
      parse_date(s).map_err(|_| FieldViolation::InvalidDate(s.to_owned()))?;
    if date >= self.today {
      return Err(FieldViolation::NotInPast(s.to_owned()));
    }
    Ok(date)
  }
}

/// Check a partial record against the current UTC date.
pub fn validate_update(record: &Value) -> Result<(), ValidationError> {
  RecordValidator::new().validate_update(record)
}

// ─── Parsed fields ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ParsedFields {
  citizen_id: Option<CitizenId>,
  patch:      CitizenPatch,
}

impl ParsedFields {
  fn into_citizen(self) -> Result<Citizen, ValidationError> {
    let CitizenPatch {
      town,
      street,
      building,
      apartment,
      name,
      birth_date,
      gender,
      relatives,
    } = self.patch;

    match (
      self.citizen_id,
      town,
      street,
      building,
      apartment,
      name,
      birth_date,
      gender,
      relatives,
    ) {
      (
        Some(citizen_id),
        Some(town),
        Some(street),
        Some(building),
        Some(apartment),
        Some(name),
        Some(birth_date),
        Some(gender),
        Some(relatives),
      ) => Ok(Citizen {
        citizen_id,
        town,
        street,
        building,
        apartment,
        name,
        birth_date,
        gender,
        relatives,
      }),
      // Unreachable after the field-set check in `parse_new`.
      _ => Err(
        SchemaError::FieldSet {
          missing:    FIELDS.iter().map(|s| s.name.to_owned()).collect(),
          unexpected: Vec::new(),
        }
        .into(),
      ),
    }
  }
}

// ─── Field checks ────────────────────────────────────────────────────────────

fn unknown_fields(object: &Object) -> Vec<String> {
  object
    .keys()
    .filter(|k| Field::from_name(k).is_none())
    .cloned()
    .collect()
}

fn check_generic(spec: &FieldSpec, value: &Value) -> Result<(), FieldViolation> {
  match spec.kind {
    FieldKind::Integer => non_negative(value).map(drop),
    FieldKind::Sequence if value.is_array() => Ok(()),
    FieldKind::Sequence => Err(FieldViolation::WrongType(FieldKind::Sequence)),
    FieldKind::Text => {
      let s = value
        .as_str()
        .ok_or(FieldViolation::WrongType(FieldKind::Text))?;
      if let Some(max) = spec.max_len
        && s.chars().count() > max
      {
        return Err(FieldViolation::TooLong(max));
      }
      if let Some(pattern) = spec.pattern
        && !pattern.is_match(s)
      {
        return Err(FieldViolation::Pattern(pattern.as_str()));
      }
      Ok(())
    }
  }
}

/// A JSON integer in `0..=i64::MAX`. Booleans and floats are not integers.
fn non_negative(value: &Value) -> Result<u64, FieldViolation> {
  let Value::Number(n) = value else {
    return Err(FieldViolation::WrongType(FieldKind::Integer));
  };
  match (n.as_u64(), n.as_i64()) {
    (Some(u), _) if i64::try_from(u).is_ok() => Ok(u),
    (Some(_), _) => Err(FieldViolation::OutOfRange),
    (None, Some(_)) => Err(FieldViolation::Negative),
    (None, None) => Err(FieldViolation::WrongType(FieldKind::Integer)),
  }
}

fn text(value: &Value) -> Result<String, FieldViolation> {
  value
    .as_str()
    .map(str::to_owned)
    .ok_or(FieldViolation::WrongType(FieldKind::Text))
}

fn gender(value: &Value) -> Result<Gender, FieldViolation> {
  let s = value
    .as_str()
    .ok_or(FieldViolation::WrongType(FieldKind::Text))?;
  s.parse()
    .map_err(|_| FieldViolation::UnknownGender(s.to_owned()))
}

fn relatives(value: &Value) -> Result<Vec<CitizenId>, FieldViolation> {
  let items = value
    .as_array()
    .ok_or(FieldViolation::WrongType(FieldKind::Sequence))?;
  items
    .iter()
    .map(|item| {
      non_negative(item)
        .map_err(|_| FieldViolation::InvalidRelative(item.to_string()))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn validator() -> RecordValidator {
    RecordValidator::as_of(NaiveDate::from_ymd_opt(2019, 8, 20).unwrap())
  }

  fn record() -> Value {
    json!({
      "citizen_id": 1,
      "town": "Москва",
      "street": "Льва Толстого",
      "building": "16к7стр5",
      "apartment": 7,
      "name": "Иванов Иван Иванович",
      "birth_date": "26.12.1986",
      "gender": "male",
      "relatives": [2]
    })
  }

  fn with(field: &str, value: Value) -> Value {
    let mut r = record();
    r[field] = value;
    r
  }

  fn without(field: &str) -> Value {
    let mut r = record();
    r.as_object_mut().unwrap().remove(field);
    r
  }

  fn violation(err: ValidationError) -> (Field, FieldViolation) {
    match err {
      ValidationError::Field { field, violation } => (field, violation),
      other => panic!("expected a field error, got {other:?}"),
    }
  }

  // ── New records ─────────────────────────────────────────────────────────

  #[test]
  fn accepts_a_complete_record() {
    let citizen = validator().parse_new(&record()).unwrap();
    assert_eq!(citizen.citizen_id, 1);
    assert_eq!(citizen.gender, Gender::Male);
    assert_eq!(citizen.relatives, vec![2]);
  }

  #[test]
  fn rejects_non_objects() {
    let err = validator().validate_new(&json!([1])).unwrap_err();
    assert_eq!(err, ValidationError::Schema(SchemaError::NotAnObject));
  }

  #[test]
  fn every_missing_field_is_reported() {
    for spec in &FIELDS {
      let err = validator().validate_new(&without(spec.name)).unwrap_err();
      assert_eq!(
        err,
        ValidationError::Schema(SchemaError::FieldSet {
          missing:    vec![spec.name.to_owned()],
          unexpected: vec![],
        })
      );
    }
  }

  #[test]
  fn missing_and_unexpected_fields_are_reported_together() {
    let mut r = without("gender");
    r["test_field"] = json!("test");
    let err = validator().validate_new(&r).unwrap_err();
    assert_eq!(
      err,
      ValidationError::Schema(SchemaError::FieldSet {
        missing:    vec!["gender".into()],
        unexpected: vec!["test_field".into()],
      })
    );
  }

  #[test]
  fn integers_must_be_non_negative_integers() {
    for field in ["citizen_id", "apartment"] {
      let v = validator();
      let (_, e) = violation(v.validate_new(&with(field, json!("1"))).unwrap_err());
      assert_eq!(e, FieldViolation::WrongType(FieldKind::Integer));
      let (_, e) = violation(v.validate_new(&with(field, json!(-1))).unwrap_err());
      assert_eq!(e, FieldViolation::Negative);
      let (_, e) = violation(v.validate_new(&with(field, json!(1.5))).unwrap_err());
      assert_eq!(e, FieldViolation::WrongType(FieldKind::Integer));
      let (_, e) = violation(v.validate_new(&with(field, json!(true))).unwrap_err());
      assert_eq!(e, FieldViolation::WrongType(FieldKind::Integer));
      let (_, e) =
        violation(v.validate_new(&with(field, json!(u64::MAX))).unwrap_err());
      assert_eq!(e, FieldViolation::OutOfRange);
      assert!(v.validate_new(&with(field, json!(0))).is_ok());
    }
  }

  #[test]
  fn address_fields_are_bounded_and_need_a_word_character() {
    for field in ["town", "street", "building"] {
      let v = validator();
      assert!(v.validate_new(&with(field, json!("a".repeat(256)))).is_ok());
      let (f, e) =
        violation(v.validate_new(&with(field, json!("a".repeat(257)))).unwrap_err());
      assert_eq!(f.name(), field);
      assert_eq!(e, FieldViolation::TooLong(256));
      let (_, e) = violation(v.validate_new(&with(field, json!("~"))).unwrap_err());
      assert_eq!(e, FieldViolation::Pattern(r"\w+"));
      let (_, e) = violation(v.validate_new(&with(field, json!(""))).unwrap_err());
      assert_eq!(e, FieldViolation::Pattern(r"\w+"));
      let (_, e) = violation(v.validate_new(&with(field, json!(1))).unwrap_err());
      assert_eq!(e, FieldViolation::WrongType(FieldKind::Text));
    }
  }

  #[test]
  fn length_counts_characters_not_bytes() {
    let town = "ж".repeat(256);
    assert!(validator().validate_new(&with("town", json!(town))).is_ok());
  }

  #[test]
  fn name_must_not_be_empty() {
    let v = validator();
    let (_, e) = violation(v.validate_new(&with("name", json!(""))).unwrap_err());
    assert_eq!(e, FieldViolation::Pattern(".+"));
    assert!(v.validate_new(&with("name", json!("~"))).is_ok());
  }

  #[test]
  fn birth_dates() {
    let v = validator();
    for (date, ok) in [
      ("31.02.2019", false),
      ("01.02.3019", false),
      ("01.02.2019", true),
      ("1.2.2019", true),
      ("don't remember", false),
      ("2019.01.02", false),
      ("01/02/2019", false),
      ("12.31.2010", false),
      ("01.01.1900", true),
      ("29.02.2019", false),
      ("29.02.2016", true),
      ("01.01.0000", false),
      ("01.01.0001", true),
      ("", false),
    ] {
      let result = v.validate_new(&with("birth_date", json!(date)));
      assert_eq!(result.is_ok(), ok, "{date:?}: {result:?}");
    }
  }

  #[test]
  fn birth_date_must_be_strictly_before_today() {
    let v = validator();
    let (_, e) =
      violation(v.validate_new(&with("birth_date", json!("20.08.2019"))).unwrap_err());
    assert_eq!(e, FieldViolation::NotInPast("20.08.2019".into()));
    assert!(v.validate_new(&with("birth_date", json!("19.08.2019"))).is_ok());
  }

  #[test]
  fn leap_day_depends_on_the_year() {
    let v = RecordValidator::as_of(NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
    assert!(v.validate_new(&with("birth_date", json!("29.02.2020"))).is_ok());
    assert!(v.validate_new(&with("birth_date", json!("29.02.2019"))).is_err());
  }

  #[test]
  fn gender_is_male_or_female() {
    let v = validator();
    assert!(v.validate_new(&with("gender", json!("female"))).is_ok());
    let (_, e) =
      violation(v.validate_new(&with("gender", json!("smth_else"))).unwrap_err());
    assert_eq!(e, FieldViolation::UnknownGender("smth_else".into()));
  }

  #[test]
  fn relatives_are_lists_of_citizen_ids() {
    let v = validator();
    for (relatives, ok) in [
      (json!([1, 2, 3]), true),
      (json!([1]), true),
      (json!([]), true),
      (json!([1, 1]), true),
      (json!([1, "4"]), false),
      (json!(["1"]), false),
      (json!([[]]), false),
      (json!([-1]), false),
      (json!(1), false),
    ] {
      let result = v.validate_new(&with("relatives", relatives.clone()));
      assert_eq!(result.is_ok(), ok, "{relatives}: {result:?}");
    }
  }

  #[test]
  fn generic_checks_run_before_value_checks() {
    // gender precedes relatives in the schema, but a wrongly typed
    // relatives list is caught by the first pass.
    let mut r = with("gender", json!("unknown"));
    r["relatives"] = json!("1, 2");
    let (field, _) = violation(validator().validate_new(&r).unwrap_err());
    assert_eq!(field, Field::Relatives);
  }

  // ── Updates ─────────────────────────────────────────────────────────────

  #[test]
  fn update_accepts_any_subset() {
    let v = validator();
    let full = without("citizen_id");
    assert!(v.validate_update(&full).is_ok());
    for key in full.as_object().unwrap().keys() {
      let mut partial = full.clone();
      partial.as_object_mut().unwrap().remove(key);
      assert!(v.validate_update(&partial).is_ok(), "without {key}");
    }
    assert!(v.validate_update(&json!({})).is_ok());
  }

  #[test]
  fn update_returns_only_present_fields() {
    let patch = validator()
      .parse_update(&json!({"name": "X", "relatives": [4, 5]}))
      .unwrap();
    assert_eq!(patch.name.as_deref(), Some("X"));
    assert_eq!(patch.relatives, Some(vec![4, 5]));
    assert_eq!(patch.town, None);
  }

  #[test]
  fn update_cannot_change_citizen_id() {
    let err = validator().validate_update(&json!({"citizen_id": 5})).unwrap_err();
    assert_eq!(err, ValidationError::ImmutableField(Field::CitizenId));
    let err = validator().validate_update(&record()).unwrap_err();
    assert_eq!(err, ValidationError::ImmutableField(Field::CitizenId));
  }

  #[test]
  fn update_rejects_unknown_fields_and_non_objects() {
    let err = validator()
      .validate_update(&json!({"name": "X", "test_field": "test"}))
      .unwrap_err();
    assert_eq!(
      err,
      ValidationError::Schema(SchemaError::FieldSet {
        missing:    vec![],
        unexpected: vec!["test_field".into()],
      })
    );
    let err = validator().validate_update(&json!([1])).unwrap_err();
    assert_eq!(err, ValidationError::Schema(SchemaError::NotAnObject));
  }

  #[test]
  fn update_runs_the_same_field_checks() {
    let v = validator();
    assert!(v.validate_update(&json!({"town": "~"})).is_err());
    assert!(v.validate_update(&json!({"apartment": -3})).is_err());
    assert!(v.validate_update(&json!({"birth_date": "31.12.2999"})).is_err());
    assert!(v.validate_update(&json!({"gender": "other"})).is_err());
  }

  #[test]
  fn current_date_entry_point_checks_updates() {
    validate_update(&json!({"birth_date": "26.12.1986", "relatives": []})).unwrap();
    let err = validate_update(&json!({"citizen_id": 1})).unwrap_err();
    assert_eq!(err, ValidationError::ImmutableField(Field::CitizenId));
    assert!(validate_update(&json!({"birth_date": "01.01.0000"})).is_err());
  }

  #[test]
  fn valid_new_record_minus_id_is_a_valid_update() {
    let v = validator();
    let r = record();
    v.validate_new(&r).unwrap();
    let mut update = r.clone();
    update.as_object_mut().unwrap().remove("citizen_id");
    v.validate_update(&update).unwrap();
  }
}
