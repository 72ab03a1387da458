//! The `ObservationStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `epiwatch-store-sqlite`). The loader and any web layer depend on this
//! abstraction, not on a concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  diagnostics::LoadDiagnostics,
  observation::{CanonicalObservation, DataSource},
  reconcile::MonthlyAggregate,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Filters for [`ObservationStore::observations`]. Unset fields do not
/// filter.
#[derive(Debug, Clone, Default)]
pub struct ObservationQuery {
  pub disease_name: Option<String>,
  pub disease_slug: Option<String>,
  pub state:        Option<String>,
  pub data_source:  Option<DataSource>,
  /// Inclusive lower bound on `period_start`.
  pub from:         Option<NaiveDate>,
  /// Inclusive upper bound on `period_end`.
  pub until:        Option<NaiveDate>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

/// Filters for [`ObservationStore::merged`].
#[derive(Debug, Clone, Default)]
pub struct MergedQuery {
  pub disease_name: Option<String>,
  pub state:        Option<String>,
  /// Inclusive month bounds; any day within the month works.
  pub from:         Option<NaiveDate>,
  pub until:        Option<NaiveDate>,
}

/// A disease name together with its URL slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseRef {
  pub name: String,
  pub slug: String,
}

/// Records and cases contributed by one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBreakdown {
  pub data_source: DataSource,
  pub records:     u64,
  pub cases:       u64,
}

/// Whole-relation summary statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
  pub total_records:  u64,
  pub total_diseases: u64,
  pub total_states:   u64,
  pub total_cases:    u64,
  pub earliest_date:  Option<NaiveDate>,
  pub latest_date:    Option<NaiveDate>,
  pub by_source:      Vec<SourceBreakdown>,
}

/// One row of a generic query, column name → JSON value.
pub type QueryRow = serde_json::Map<String, serde_json::Value>;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the analytical store that holds the unified relation.
///
/// The relation is write-once per load: [`ObservationStore::replace_all`]
/// swaps in a complete new relation (and rebuilds the reconciliation view)
/// atomically; nothing ever updates rows in place.
pub trait ObservationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Load ──────────────────────────────────────────────────────────────

  /// Replace the unified relation with `observations`, rebuild indices and
  /// the reconciliation view, and persist `diagnostics`. Returns the row
  /// count of the new relation.
  fn replace_all(
    &self,
    observations: Vec<CanonicalObservation>,
    diagnostics: Vec<LoadDiagnostics>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn observations<'a>(
    &'a self,
    query: &'a ObservationQuery,
  ) -> impl Future<Output = Result<Vec<CanonicalObservation>, Self::Error>> + Send + 'a;

  /// Read the reconciliation view.
  fn merged<'a>(
    &'a self,
    query: &'a MergedQuery,
  ) -> impl Future<Output = Result<Vec<MonthlyAggregate>, Self::Error>> + Send + 'a;

  /// Distinct canonical disease names, optionally restricted to one source.
  fn diseases(
    &self,
    source: Option<DataSource>,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  fn diseases_with_slugs(
    &self,
  ) -> impl Future<Output = Result<Vec<DiseaseRef>, Self::Error>> + Send + '_;

  fn disease_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn states(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  fn summary(&self) -> impl Future<Output = Result<SummaryStats, Self::Error>> + Send + '_;

  /// Diagnostics persisted by the latest load.
  fn diagnostics(
    &self,
  ) -> impl Future<Output = Result<Vec<LoadDiagnostics>, Self::Error>> + Send + '_;

  /// Run a read-only SQL-like query against the relation and the
  /// reconciliation view. Statements that would write are rejected.
  fn query(
    &self,
    sql: String,
    params: Vec<serde_json::Value>,
  ) -> impl Future<Output = Result<Vec<QueryRow>, Self::Error>> + Send + '_;
}
