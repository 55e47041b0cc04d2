//! Error type for `census-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] census_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An integer that does not fit SQLite's signed 64-bit column.
  #[error("{0} is out of range for an INTEGER column")]
  OutOfRange(u64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
