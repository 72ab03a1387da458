//! National weekly feed: a single `NNDSS_Weekly_Data_<YYYYMMDD>.csv`.
//!
//! One streaming pass classifies geography, resolves MMWR weeks, parses the
//! disease label and cleans the count. The stage counters (raw, transformed,
//! filtered, loaded) are kept separately so each can be reported.

use std::collections::HashMap;

use epiwatch_core::{
  Error as CoreError,
  diagnostics::DropReason,
  geo::{classify_geo_unit, state_label},
  mmwr::{WeekRange, resolve_week},
  normalize::{Normalizer, slugify},
  observation::{DATE_TYPE_MMWR, DataSource, GeoUnit, OUTCOME_CASES, TIME_UNIT_WEEK},
  source::{SourceStore, file_name},
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
  Error, Result, SourceOutput,
  staged::{StagedObservation, extract_digits, non_blank, parse_whole_number},
};

pub const FILE_PREFIX: &str = "NNDSS_Weekly_Data_";
pub const FILE_SUFFIX: &str = ".csv";

const COL_AREA: &str = "Reporting Area";
const COL_YEAR: &str = "Current MMWR Year";
const COL_WEEK: &str = "MMWR WEEK";
const COL_LABEL: &str = "Label";
const COL_COUNT: &str = "Current week";

pub const REQUIRED_COLUMNS: &[&str] = &[COL_AREA, COL_YEAR, COL_WEEK, COL_LABEL, COL_COUNT];

#[derive(Debug, Deserialize)]
struct NndssRow {
  #[serde(rename = "Reporting Area")]
  reporting_area: Option<String>,
  #[serde(rename = "Current MMWR Year")]
  year:           Option<String>,
  #[serde(rename = "MMWR WEEK")]
  week:           Option<String>,
  #[serde(rename = "Label")]
  label:          Option<String>,
  #[serde(rename = "Current week")]
  current_week:   Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct NndssOptions {
  /// Exclude regional and national aggregate rows so that summing states
  /// never double counts.
  pub state_level_only: bool,
}

impl Default for NndssOptions {
  fn default() -> Self { Self { state_level_only: true } }
}

/// The lexicographically greatest `NNDSS_Weekly_Data_*.csv` directly under
/// the source root.
pub fn find_latest_file(source: &dyn SourceStore) -> Result<String> {
  source
    .list("")?
    .into_iter()
    .filter(|path| !path.contains('/'))
    .filter(|path| path.starts_with(FILE_PREFIX) && path.ends_with(FILE_SUFFIX))
    .max()
    .ok_or_else(|| {
      CoreError::SourceFileMissing(format!(
        "{}/{FILE_PREFIX}*{FILE_SUFFIX}",
        source.describe()
      ))
      .into()
    })
}

/// Resolves each distinct (year, week) pair once.
#[derive(Default)]
struct WeekCache {
  resolved: HashMap<(i32, u32), Option<WeekRange>>,
}

impl WeekCache {
  fn resolve(&mut self, year: Option<&str>, week: Option<&str>) -> Option<WeekRange> {
    let year = i32::try_from(parse_whole_number(year?)?).ok()?;
    let week = u32::try_from(parse_whole_number(week?)?).ok()?;
    *self
      .resolved
      .entry((year, week))
      .or_insert_with(|| resolve_week(year, week))
  }
}

pub struct NndssTransformer<'a> {
  normalizer: &'a Normalizer,
  options:    NndssOptions,
}

impl<'a> NndssTransformer<'a> {
  pub fn new(normalizer: &'a Normalizer, options: NndssOptions) -> Self {
    Self { normalizer, options }
  }

  /// Transform the latest national file under the source root.
  ///
  /// A missing file or a file without the required columns is fatal: the
  /// national feed is a required input.
  pub fn transform(&self, source: &dyn SourceStore) -> Result<SourceOutput> {
    let path = find_latest_file(source)?;
    info!(file = file_name(&path), "reading NNDSS file");

    let reader = source.open(&path)?;
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
      return Err(Error::MissingColumns { file: path, columns: missing });
    }

    let mut output = SourceOutput::new(DataSource::Nndss);
    output.diagnostics.files_read = 1;
    let mut weeks = WeekCache::default();

    for record in rdr.deserialize::<NndssRow>() {
      let diag = &mut output.diagnostics;
      diag.raw_rows += 1;

      let row = match record {
        Ok(row) => row,
        Err(e) if e.is_io_error() => return Err(e.into()),
        Err(e) => {
          debug!(error = %e, "malformed NNDSS row");
          diag.record_drop(DropReason::Malformed);
          continue;
        }
      };

      let staged = match self.stage(row, &mut weeks) {
        Ok(staged) => staged,
        Err(reason) => {
          diag.record_drop(reason);
          continue;
        }
      };
      diag.transformed_rows += 1;

      let obs = match staged.finish() {
        Ok(obs) => obs,
        Err(reason) => {
          diag.record_drop(reason);
          continue;
        }
      };
      diag.filtered_rows += 1;

      if self.options.state_level_only && obs.geo_unit != GeoUnit::State {
        diag.non_state_rows += 1;
        continue;
      }
      diag.loaded_rows += 1;
      output.observations.push(obs);
    }

    let d = &output.diagnostics;
    info!(
      raw = d.raw_rows,
      transformed = d.transformed_rows,
      filtered = d.filtered_rows,
      non_state = d.non_state_rows,
      loaded = d.loaded_rows,
      distinct_weeks = weeks.resolved.len(),
      "transformed NNDSS records"
    );
    if d.loaded_rows == 0 {
      warn!(file = %path, "NNDSS file produced no rows");
    }

    Ok(output)
  }

  fn stage(&self, row: NndssRow, weeks: &mut WeekCache) -> Result<StagedObservation, DropReason> {
    let raw_label = non_blank(row.label.as_deref()).ok_or(DropReason::Malformed)?;
    let area = non_blank(row.reporting_area.as_deref()).ok_or(DropReason::Malformed)?;

    let geo_unit = classify_geo_unit(area);
    let state = state_label(area, geo_unit);

    let (disease_name, disease_subtype) = self.normalizer.parse_nndss_label(raw_label);
    let disease_slug = slugify(&disease_name).ok_or(DropReason::Malformed)?;

    let period = weeks
      .resolve(row.year.as_deref(), row.week.as_deref())
      .map(|range| (range.start, range.end));

    Ok(StagedObservation {
      period,
      count: row.current_week.as_deref().and_then(extract_digits),
      date_type: DATE_TYPE_MMWR.to_owned(),
      time_unit: TIME_UNIT_WEEK.to_owned(),
      disease_name,
      disease_slug,
      disease_subtype,
      reporting_jurisdiction: state.clone(),
      state,
      geo_name: area.to_owned(),
      geo_unit,
      age_group: None,
      confirmation_status: None,
      outcome: OUTCOME_CASES.to_owned(),
      data_source: DataSource::Nndss,
      original_disease_name: raw_label.to_owned(),
    })
  }
}
