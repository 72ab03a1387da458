//! Load diagnostics: the counters a load reports per source.
//!
//! Row-level failures never surface individually; they are only visible here
//! and in the log.

use serde::{Deserialize, Serialize};

use crate::observation::DataSource;

/// Why a staged row did not make it into the unified relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
  /// Structurally broken record: bad CSV line, missing disease or state,
  /// unknown geo unit.
  Malformed,
  /// Dates unparsable, inverted, or (NNDSS) MMWR week unresolved.
  UnresolvedPeriod,
  /// Count missing, non-numeric or negative.
  InvalidCount,
}

/// Counters for one source in one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadDiagnostics {
  pub data_source:       Option<DataSource>,
  /// Input files actually read (after latest-file selection).
  pub files_read:        u64,
  /// Input files selected but skipped because they could not be read.
  pub files_failed:      u64,
  /// Records read from the CSV files.
  pub raw_rows:          u64,
  /// Records that made it into the unified schema (null dates/counts still
  /// allowed at this stage).
  pub transformed_rows:  u64,
  /// Rows left after dropping null-dated and null-counted rows.
  pub filtered_rows:     u64,
  /// Rows handed to the store.
  pub loaded_rows:       u64,
  pub malformed_rows:    u64,
  pub unresolved_period: u64,
  pub invalid_counts:    u64,
  /// NNDSS regional and national rows excluded from the relation.
  pub non_state_rows:    u64,
}

impl LoadDiagnostics {
  pub fn new(data_source: DataSource) -> Self {
    Self { data_source: Some(data_source), ..Self::default() }
  }

  pub fn record_drop(&mut self, reason: DropReason) {
    match reason {
      DropReason::Malformed => self.malformed_rows += 1,
      DropReason::UnresolvedPeriod => self.unresolved_period += 1,
      DropReason::InvalidCount => self.invalid_counts += 1,
    }
  }

  /// Add another set of counters for the same source into this one.
  pub fn absorb(&mut self, other: &LoadDiagnostics) {
    self.files_read += other.files_read;
    self.files_failed += other.files_failed;
    self.raw_rows += other.raw_rows;
    self.transformed_rows += other.transformed_rows;
    self.filtered_rows += other.filtered_rows;
    self.loaded_rows += other.loaded_rows;
    self.malformed_rows += other.malformed_rows;
    self.unresolved_period += other.unresolved_period;
    self.invalid_counts += other.invalid_counts;
    self.non_state_rows += other.non_state_rows;
  }

  /// Total rows read but not loaded, for any reason.
  pub fn dropped_rows(&self) -> u64 { self.raw_rows.saturating_sub(self.loaded_rows) }
}
