//! CSV transformers for the epiwatch pipeline.
//!
//! Turns the state tracker files and the national NNDSS file into
//! [`CanonicalObservation`] rows. Pure synchronous; sources are read through
//! the [`SourceStore`] trait so callers decide where the files live.
//!
//! # Quick start
//!
//! ```no_run
//! use epiwatch_core::normalize::Normalizer;
//! use epiwatch_etl::{LocalSource, NndssOptions, run_all};
//!
//! let normalizer = Normalizer::default();
//! let tracker = LocalSource::new("data/states");
//! let nndss = LocalSource::new("data/nndss");
//! let load = run_all(&normalizer, &tracker, &nndss, NndssOptions::default()).unwrap();
//! println!("{} rows", load.observations.len());
//! ```

pub mod error;
mod fs;
pub mod nndss;
mod staged;
pub mod tracker;

use epiwatch_core::{
  diagnostics::LoadDiagnostics,
  normalize::Normalizer,
  observation::{CanonicalObservation, DataSource},
  source::SourceStore,
};
pub use error::{Error, Result};
pub use fs::{LocalSource, MemorySource};
pub use nndss::{NndssOptions, NndssTransformer};
pub use tracker::TrackerTransformer;

// ─── Public types ────────────────────────────────────────────────────────────

/// Everything one transformer produced.
#[derive(Debug, Clone)]
pub struct SourceOutput {
  pub observations: Vec<CanonicalObservation>,
  pub diagnostics:  LoadDiagnostics,
}

impl SourceOutput {
  pub fn new(data_source: DataSource) -> Self {
    Self { observations: Vec::new(), diagnostics: LoadDiagnostics::new(data_source) }
  }
}

/// The concatenated output of every source, ready for the store.
#[derive(Debug, Clone, Default)]
pub struct UnifiedLoad {
  pub observations: Vec<CanonicalObservation>,
  /// One entry per source, in load order.
  pub diagnostics:  Vec<LoadDiagnostics>,
}

impl UnifiedLoad {
  pub fn push(&mut self, output: SourceOutput) {
    self.observations.extend(output.observations);
    self.diagnostics.push(output.diagnostics);
  }
}

impl FromIterator<SourceOutput> for UnifiedLoad {
  fn from_iter<I: IntoIterator<Item = SourceOutput>>(iter: I) -> Self {
    let mut load = UnifiedLoad::default();
    for output in iter {
      load.push(output);
    }
    load
  }
}

// ─── Source registry ─────────────────────────────────────────────────────────

/// Names of the registered sources.
pub fn source_names() -> Vec<&'static str> {
  DataSource::ALL.iter().map(|s| s.as_str()).collect()
}

/// Look a source up by name.
pub fn source_by_name(name: &str) -> Result<DataSource> {
  DataSource::parse(name.trim()).map_err(|_| Error::UnknownSource {
    name:      name.to_owned(),
    available: source_names(),
  })
}

/// Run the transformer registered for `kind`.
pub fn transform_source(
  kind: DataSource,
  normalizer: &Normalizer,
  source: &dyn SourceStore,
  options: NndssOptions,
) -> Result<SourceOutput> {
  match kind {
    DataSource::Tracker => TrackerTransformer::new(normalizer).transform(source),
    DataSource::Nndss => NndssTransformer::new(normalizer, options).transform(source),
  }
}

/// Run both transformers in turn and concatenate their output.
///
/// The first fatal error aborts the whole load.
pub fn run_all(
  normalizer: &Normalizer,
  tracker: &dyn SourceStore,
  nndss: &dyn SourceStore,
  options: NndssOptions,
) -> Result<UnifiedLoad> {
  let tracker = transform_source(DataSource::Tracker, normalizer, tracker, options)?;
  let nndss = transform_source(DataSource::Nndss, normalizer, nndss, options)?;
  Ok([tracker, nndss].into_iter().collect())
}
