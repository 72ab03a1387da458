//! Startup orchestration for epiwatch.
//!
//! Runs the tracker and NNDSS transformers concurrently, then hands the
//! concatenated relation to an [`ObservationStore`], which swaps it in and
//! rebuilds the reconciliation view. A missing required input fails the whole
//! load; nothing partial is ever stored.

pub mod error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use epiwatch_core::{
  diagnostics::LoadDiagnostics,
  normalize::Normalizer,
  observation::DataSource,
  source::SourceStore,
  store::ObservationStore,
};
use epiwatch_etl::{LocalSource, NndssOptions, SourceOutput, UnifiedLoad, transform_source};
pub use error::{Error, Result};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Loader configuration, deserialised from `epiwatch.toml` and `EPIWATCH_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct LoaderConfig {
  /// Root of the `<STATE>/<file>.csv` tracker tree.
  pub tracker_dir:            PathBuf,
  /// Directory holding `NNDSS_Weekly_Data_<YYYYMMDD>.csv`.
  pub nndss_dir:              PathBuf,
  /// SQLite file; `:memory:` keeps the store in process.
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  #[serde(default = "default_state_level_only")]
  pub nndss_state_level_only: bool,
}

fn default_store_path() -> PathBuf { PathBuf::from("epiwatch.db") }

fn default_state_level_only() -> bool { true }

pub const IN_MEMORY: &str = ":memory:";

impl LoaderConfig {
  pub fn nndss_options(&self) -> NndssOptions {
    NndssOptions { state_level_only: self.nndss_state_level_only }
  }

  pub fn is_in_memory(&self) -> bool { self.store_path.as_os_str() == IN_MEMORY }

  /// The configuration with `~` expanded in every path.
  pub fn expanded(mut self) -> Self {
    self.tracker_dir = expand_tilde(&self.tracker_dir);
    self.nndss_dir = expand_tilde(&self.nndss_dir);
    self.store_path = expand_tilde(&self.store_path);
    self
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Load ────────────────────────────────────────────────────────────────────

/// What a successful load stored.
#[derive(Debug, Clone)]
pub struct LoadReport {
  pub rows:        u64,
  pub diagnostics: Vec<LoadDiagnostics>,
}

async fn join(handle: JoinHandle<epiwatch_etl::Result<SourceOutput>>) -> Result<SourceOutput> {
  let output = handle
    .await
    .map_err(|e| epiwatch_etl::Error::Join(e.to_string()))??;
  Ok(output)
}

/// Run both transformers on blocking worker threads and wait for both.
pub async fn run_transformers(
  normalizer: Arc<Normalizer>,
  tracker: Arc<dyn SourceStore>,
  nndss: Arc<dyn SourceStore>,
  options: NndssOptions,
) -> Result<UnifiedLoad> {
  let spawn = |kind: DataSource, source: Arc<dyn SourceStore>| {
    let normalizer = Arc::clone(&normalizer);
    tokio::task::spawn_blocking(move || {
      transform_source(kind, &normalizer, source.as_ref(), options)
    })
  };

  let tracker = spawn(DataSource::Tracker, tracker);
  let nndss = spawn(DataSource::Nndss, nndss);
  let (tracker, nndss) = tokio::try_join!(join(tracker), join(nndss))?;

  Ok([tracker, nndss].into_iter().collect())
}

/// Log one source's counters.
pub fn log_diagnostics(d: &LoadDiagnostics) {
  let source = d.data_source.map_or("unknown", DataSource::as_str);
  info!(
    source,
    files_read = d.files_read,
    files_failed = d.files_failed,
    raw = d.raw_rows,
    transformed = d.transformed_rows,
    filtered = d.filtered_rows,
    loaded = d.loaded_rows,
    malformed = d.malformed_rows,
    unresolved_period = d.unresolved_period,
    invalid_counts = d.invalid_counts,
    non_state = d.non_state_rows,
    "load diagnostics"
  );
  if d.loaded_rows == 0 {
    warn!(source, "source contributed no rows");
  }
}

/// Store a transformed relation and report what was loaded.
pub async fn store_load<S: ObservationStore>(store: &S, load: UnifiedLoad) -> Result<LoadReport> {
  for d in &load.diagnostics {
    log_diagnostics(d);
  }
  let diagnostics = load.diagnostics.clone();
  let rows = store
    .replace_all(load.observations, load.diagnostics)
    .await
    .map_err(Error::store)?;
  Ok(LoadReport { rows, diagnostics })
}

/// Run the full startup load described by `config` into `store`.
pub async fn run_load<S: ObservationStore>(
  config: &LoaderConfig,
  store: &S,
  normalizer: Arc<Normalizer>,
) -> Result<LoadReport> {
  info!(
    tracker = %config.tracker_dir.display(),
    nndss = %config.nndss_dir.display(),
    "starting load"
  );
  let tracker: Arc<dyn SourceStore> = Arc::new(LocalSource::new(&config.tracker_dir));
  let nndss: Arc<dyn SourceStore> = Arc::new(LocalSource::new(&config.nndss_dir));

  let load = run_transformers(normalizer, tracker, nndss, config.nndss_options()).await?;
  let report = store_load(store, load).await?;
  info!(rows = report.rows, "load complete");
  Ok(report)
}
