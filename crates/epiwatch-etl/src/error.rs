//! Error types for the epiwatch-etl transformers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Source(#[from] epiwatch_core::Error),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("{file} is missing required columns: {}", columns.join(", "))]
  MissingColumns { file: String, columns: Vec<String> },

  #[error("unknown source {name:?} (available: {})", available.join(", "))]
  UnknownSource {
    name:      String,
    available: Vec<&'static str>,
  },

  #[error("transformer task failed: {0}")]
  Join(String),
}

impl Error {
  /// Whether this error means a required input was absent.
  pub fn is_missing_source(&self) -> bool {
    matches!(self, Self::Source(epiwatch_core::Error::SourceFileMissing(_)))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
