//! [`ImportBatch`]: a set of citizens accepted for persistence.

use serde_json::Value;

use crate::{
  citizen::Citizen,
  error::{SchemaError, ValidationError},
  graph,
  validate::RecordValidator,
};

/// A batch that passed record validation for every entry and the
/// batch-wide graph checks. Only constructible through [`ImportBatch::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBatch {
  citizens: Vec<Citizen>,
}

impl ImportBatch {
  /// Validate every record of `records` (a JSON array), then the batch as a
  /// whole. All-or-nothing: the first violation rejects the batch.
  pub fn parse(
    records: &Value,
    validator: &RecordValidator,
  ) -> Result<Self, ValidationError> {
    let items = records.as_array().ok_or(SchemaError::NotAnArray)?;
    let citizens = items
      .iter()
      .map(|record| validator.parse_new(record))
      .collect::<Result<Vec<_>, _>>()?;
    graph::validate_batch(&citizens)?;
    Ok(Self { citizens })
  }

  pub fn citizens(&self) -> &[Citizen] { &self.citizens }

  pub fn into_citizens(self) -> Vec<Citizen> { self.citizens }

  pub fn len(&self) -> usize { self.citizens.len() }

  pub fn is_empty(&self) -> bool { self.citizens.is_empty() }
}

/// Validate a new import against the current UTC date.
pub fn validate_new_batch(records: &Value) -> Result<(), ValidationError> {
  ImportBatch::parse(records, &RecordValidator::new()).map(drop)
}
