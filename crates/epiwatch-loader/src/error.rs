//! Error type for the startup load.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Etl(#[from] epiwatch_etl::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error from any [`epiwatch_core::store::ObservationStore`].
  pub fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn is_missing_source(&self) -> bool {
    matches!(self, Self::Etl(e) if e.is_missing_source())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
