//! Error types for `epiwatch-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required input file or directory does not exist. Fatal at startup.
  #[error("source file missing: {0}")]
  SourceFileMissing(String),

  #[error("i/o error on {path}: {source}")]
  Io {
    path:   String,
    #[source]
    source: std::io::Error,
  },

  #[error("unknown data source: {0:?}")]
  UnknownDataSource(String),

  #[error("unknown geo unit: {0:?}")]
  UnknownGeoUnit(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
