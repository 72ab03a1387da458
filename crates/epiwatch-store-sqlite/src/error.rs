//! Error type for `epiwatch-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] epiwatch_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  /// A stored value that does not decode into its domain type.
  #[error("invalid stored value: {0}")]
  Decode(String),

  /// The generic query capability only runs statements that cannot write.
  #[error("statement is not read-only: {0}")]
  NotReadOnly(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
