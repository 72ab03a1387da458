//! State tracker feed: `<root>/<STATE>/<YYYYMMDD-HHMMSS>_<STATE>_<uploader>.csv`.
//!
//! Only the lexicographically latest file per state directory is read. States
//! are processed independently; a file that cannot be opened or lacks the
//! required columns is logged and skipped without affecting other states.

use std::collections::BTreeMap;

use epiwatch_core::{
  diagnostics::{DropReason, LoadDiagnostics},
  normalize::{Normalizer, slugify},
  observation::{
    CanonicalObservation, DATE_TYPE_CCCD, DataSource, GeoUnit, OUTCOME_CASES, TIME_UNIT_MONTH,
  },
  source::{SourceStore, file_name},
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::{
  Error, Result, SourceOutput,
  staged::{StagedObservation, non_blank, parse_count, parse_date, stratum},
};

/// Columns every tracker file must carry. Everything else has a default.
pub const REQUIRED_COLUMNS: &[&str] =
  &["disease_name", "count", "report_period_start", "report_period_end"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackerRow {
  report_period_start:    Option<String>,
  report_period_end:      Option<String>,
  date_type:              Option<String>,
  time_unit:              Option<String>,
  disease_name:           Option<String>,
  disease_subtype:        Option<String>,
  state:                  Option<String>,
  reporting_jurisdiction: Option<String>,
  geo_name:               Option<String>,
  geo_unit:               Option<String>,
  age_group:              Option<String>,
  confirmation_status:    Option<String>,
  outcome:                Option<String>,
  count:                  Option<String>,
}

/// Pick the latest file per state directory.
///
/// Only `.csv` files exactly one level below the root count; the parent
/// directory names the state. Returns state → path.
pub fn select_latest_per_state<I>(paths: I) -> BTreeMap<String, String>
where
  I: IntoIterator<Item = String>,
{
  let mut latest: BTreeMap<String, String> = BTreeMap::new();

  for path in paths {
    let Some((state, name)) = path
      .split_once('/')
      .filter(|(state, name)| !state.is_empty() && !name.contains('/'))
      .map(|(state, name)| (state.to_owned(), name.to_owned()))
    else {
      debug!(path = %path, "ignoring tracker file outside a state directory");
      continue;
    };
    if !name.to_ascii_lowercase().ends_with(".csv") {
      continue;
    }

    match latest.get(&state) {
      Some(current) if file_name(current) >= name.as_str() => {}
      _ => {
        latest.insert(state, path);
      }
    }
  }

  latest
}

pub struct TrackerTransformer<'a> {
  normalizer: &'a Normalizer,
}

impl<'a> TrackerTransformer<'a> {
  pub fn new(normalizer: &'a Normalizer) -> Self { Self { normalizer } }

  /// Read the latest file of every state under the source root.
  ///
  /// Fails only if the root itself is missing.
  pub fn transform(&self, source: &dyn SourceStore) -> Result<SourceOutput> {
    let all = source.list("")?;
    info!(files = all.len(), root = %source.describe(), "found tracker files");

    let selected = select_latest_per_state(all);
    if selected.is_empty() {
      warn!(root = %source.describe(), "no tracker CSV files found");
    }

    let mut output = SourceOutput::new(DataSource::Tracker);

    for (state, path) in &selected {
      debug!(state = %state, file = file_name(path), "selected latest tracker file");
      match self.transform_file(source, state, path) {
        Ok((rows, diag)) => {
          info!(
            state = %state,
            file = file_name(path),
            raw = diag.raw_rows,
            loaded = diag.loaded_rows,
            "loaded tracker file"
          );
          output.diagnostics.absorb(&diag);
          output.observations.extend(rows);
        }
        Err(e) => {
          error!(state = %state, file = %path, error = %e, "skipping unreadable tracker file");
          output.diagnostics.files_failed += 1;
        }
      }
    }

    info!(
      states = selected.len(),
      rows = output.observations.len(),
      "transformed tracker records"
    );
    Ok(output)
  }

  /// Transform one state file. Row-level problems are counted; only errors
  /// that make the whole file unusable are returned.
  fn transform_file(
    &self,
    source: &dyn SourceStore,
    state_dir: &str,
    path: &str,
  ) -> Result<(Vec<CanonicalObservation>, LoadDiagnostics)> {
    let reader = source.open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
      .trim(csv::Trim::All)
      .from_reader(reader);

    let headers = rdr.headers()?;
    let missing: Vec<String> = REQUIRED_COLUMNS
      .iter()
      .filter(|col| !headers.iter().any(|h| h == **col))
      .map(|col| (*col).to_owned())
      .collect();
    if !missing.is_empty() {
      return Err(Error::MissingColumns { file: path.to_owned(), columns: missing });
    }

    let mut diag = LoadDiagnostics::new(DataSource::Tracker);
    diag.files_read = 1;
    let mut rows = Vec::new();

    for record in rdr.deserialize::<TrackerRow>() {
      diag.raw_rows += 1;
      let row = match record {
        Ok(row) => row,
        Err(e) if e.is_io_error() => return Err(e.into()),
        Err(e) => {
          debug!(file = path, error = %e, "malformed tracker row");
          diag.record_drop(DropReason::Malformed);
          continue;
        }
      };

      let staged = match self.stage(row, state_dir) {
        Ok(staged) => staged,
        Err(reason) => {
          diag.record_drop(reason);
          continue;
        }
      };
      diag.transformed_rows += 1;

      match staged.finish() {
        Ok(obs) => {
          diag.filtered_rows += 1;
          diag.loaded_rows += 1;
          rows.push(obs);
        }
        Err(reason) => diag.record_drop(reason),
      }
    }

    Ok((rows, diag))
  }

  /// Map one CSV row onto the canonical schema, applying column fallbacks.
  fn stage(&self, row: TrackerRow, state_dir: &str) -> Result<StagedObservation, DropReason> {
    let raw_name = non_blank(row.disease_name.as_deref()).ok_or(DropReason::Malformed)?;
    let disease_name = self.normalizer.normalize_tracker_name(raw_name);
    let disease_slug = slugify(&disease_name).ok_or(DropReason::Malformed)?;

    let state_cell = non_blank(row.state.as_deref());
    let jurisdiction_cell = non_blank(row.reporting_jurisdiction.as_deref());
    let state = state_cell.or(jurisdiction_cell).unwrap_or(state_dir).to_owned();
    let reporting_jurisdiction = jurisdiction_cell.or(state_cell).unwrap_or(state_dir).to_owned();
    let geo_name = non_blank(row.geo_name.as_deref()).unwrap_or(state.as_str()).to_owned();

    let geo_unit = match non_blank(row.geo_unit.as_deref()) {
      Some(unit) => GeoUnit::parse(unit).map_err(|_| DropReason::Malformed)?,
      None => GeoUnit::State,
    };

    let start = row.report_period_start.as_deref().and_then(parse_date);
    let end = row.report_period_end.as_deref().and_then(parse_date);

    Ok(StagedObservation {
      period: start.zip(end),
      count: row.count.as_deref().and_then(parse_count),
      date_type: non_blank(row.date_type.as_deref()).unwrap_or(DATE_TYPE_CCCD).to_owned(),
      time_unit: non_blank(row.time_unit.as_deref()).unwrap_or(TIME_UNIT_MONTH).to_owned(),
      disease_name,
      disease_slug,
      disease_subtype: row
        .disease_subtype
        .as_deref()
        .and_then(|s| self.normalizer.normalize_tracker_subtype(s)),
      reporting_jurisdiction,
      state,
      geo_name,
      geo_unit,
      age_group: stratum(row.age_group.as_deref()),
      confirmation_status: stratum(row.confirmation_status.as_deref()),
      outcome: non_blank(row.outcome.as_deref()).unwrap_or(OUTCOME_CASES).to_owned(),
      data_source: DataSource::Tracker,
      original_disease_name: raw_name.to_owned(),
    })
  }
}
