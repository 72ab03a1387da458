//! The intermediate row shape shared by both transformers, and the cell
//! parsers that feed it.
//!
//! A staged row already carries every derived field of the canonical schema,
//! but its period and count may still be unresolved. [`StagedObservation::finish`]
//! is the null-filter step: it either yields a [`CanonicalObservation`] or
//! the reason the row is dropped.

use chrono::NaiveDate;
use epiwatch_core::{
  diagnostics::DropReason,
  observation::{CanonicalObservation, DataSource, GeoUnit},
};

#[derive(Debug, Clone)]
pub(crate) struct StagedObservation {
  pub period:                 Option<(NaiveDate, NaiveDate)>,
  pub count:                  Option<u64>,
  pub date_type:              String,
  pub time_unit:              String,
  pub disease_name:           String,
  pub disease_slug:           String,
  pub disease_subtype:        Option<String>,
  pub reporting_jurisdiction: String,
  pub state:                  String,
  pub geo_name:               String,
  pub geo_unit:               GeoUnit,
  pub age_group:              Option<String>,
  pub confirmation_status:    Option<String>,
  pub outcome:                String,
  pub data_source:            DataSource,
  pub original_disease_name:  String,
}

impl StagedObservation {
  /// Drop rows whose period or count did not resolve.
  pub fn finish(self) -> Result<CanonicalObservation, DropReason> {
    let (period_start, period_end) = match self.period {
      Some((start, end)) if start <= end => (start, end),
      _ => return Err(DropReason::UnresolvedPeriod),
    };
    let count = self.count.ok_or(DropReason::InvalidCount)?;

    Ok(CanonicalObservation {
      period_start,
      period_end,
      date_type: self.date_type,
      time_unit: self.time_unit,
      disease_name: self.disease_name,
      disease_slug: self.disease_slug,
      disease_subtype: self.disease_subtype,
      reporting_jurisdiction: self.reporting_jurisdiction,
      state: self.state,
      geo_name: self.geo_name,
      geo_unit: self.geo_unit,
      age_group: self.age_group,
      confirmation_status: self.confirmation_status,
      outcome: self.outcome,
      count,
      data_source: self.data_source,
      original_disease_name: self.original_disease_name,
    })
  }
}

// ─── Cell parsers ────────────────────────────────────────────────────────────

/// `Some(trimmed)` for a cell with visible content.
pub(crate) fn non_blank(cell: Option<&str>) -> Option<&str> {
  cell.map(str::trim).filter(|s| !s.is_empty())
}

/// A whole number written as `"12"` or `"12.0"`. Fractions, blanks and text
/// are `None`.
pub(crate) fn parse_whole_number(cell: &str) -> Option<i64> {
  let cell = cell.trim();
  if let Ok(n) = cell.parse::<i64>() {
    return Some(n);
  }
  let f = cell.parse::<f64>().ok()?;
  (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// A strict non-negative count. Negative, fractional or non-numeric text is
/// `None`.
pub(crate) fn parse_count(cell: &str) -> Option<u64> {
  parse_whole_number(cell).and_then(|n| u64::try_from(n).ok())
}

/// Lenient count cleaning for the national feed: keep only the digits, so
/// `"1,234"` becomes 1234 and `"-"` or blank becomes `None`.
pub(crate) fn extract_digits(cell: &str) -> Option<u64> {
  let digits: String = cell.chars().filter(char::is_ascii_digit).collect();
  if digits.is_empty() {
    return None;
  }
  digits.parse().ok()
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// A calendar date, ignoring any time-of-day suffix.
pub(crate) fn parse_date(cell: &str) -> Option<NaiveDate> {
  let cell = cell.trim();
  let date_part = cell
    .split(|c: char| c == 'T' || c.is_whitespace())
    .next()
    .unwrap_or(cell);

  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Stratification cells that carry no information.
const PLACEHOLDERS: &[&str] = &["not specified", "unknown", "n/a", "na"];

/// `None` for blank and placeholder stratification values.
pub(crate) fn stratum(cell: Option<&str>) -> Option<String> {
  let cell = non_blank(cell)?;
  let lower = cell.to_lowercase();
  (!PLACEHOLDERS.contains(&lower.as_str())).then(|| cell.to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn staged() -> StagedObservation {
    StagedObservation {
      period:                 Some((
        NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
        NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
      )),
      count:                  Some(3),
      date_type:              "mmwr".into(),
      time_unit:              "week".into(),
      disease_name:           "Pertussis".into(),
      disease_slug:           "pertussis".into(),
      disease_subtype:        None,
      reporting_jurisdiction: "TX".into(),
      state:                  "TX".into(),
      geo_name:               "TEXAS".into(),
      geo_unit:               GeoUnit::State,
      age_group:              None,
      confirmation_status:    None,
      outcome:                "cases".into(),
      data_source:            DataSource::Nndss,
      original_disease_name:  "Pertussis".into(),
    }
  }

  #[test]
  fn finish_keeps_resolved_rows() {
    let obs = staged().finish().unwrap();
    assert_eq!(obs.count, 3);
    assert!(obs.period_start <= obs.period_end);
  }

  #[test]
  fn finish_drops_unresolved_rows() {
    let mut row = staged();
    row.period = None;
    assert_eq!(row.finish().unwrap_err(), DropReason::UnresolvedPeriod);

    let mut row = staged();
    row.period = row.period.map(|(s, e)| (e, s));
    assert_eq!(row.finish().unwrap_err(), DropReason::UnresolvedPeriod);

    let mut row = staged();
    row.count = None;
    assert_eq!(row.finish().unwrap_err(), DropReason::InvalidCount);
  }

  #[test]
  fn strict_counts() {
    assert_eq!(parse_count("142"), Some(142));
    assert_eq!(parse_count(" 7.0 "), Some(7));
    assert_eq!(parse_count("-3"), None);
    assert_eq!(parse_count("2.5"), None);
    assert_eq!(parse_count("-"), None);
    assert_eq!(parse_count(""), None);
  }

  #[test]
  fn lenient_counts() {
    assert_eq!(extract_digits("142"), Some(142));
    assert_eq!(extract_digits("1,234"), Some(1234));
    assert_eq!(extract_digits("-"), None);
    assert_eq!(extract_digits("N"), None);
    assert_eq!(extract_digits(""), None);
  }

  #[test]
  fn dates() {
    let d = NaiveDate::from_ymd_opt(2025, 8, 3).unwrap();
    assert_eq!(parse_date("2025-08-03"), Some(d));
    assert_eq!(parse_date("2025-08-03 00:00:00"), Some(d));
    assert_eq!(parse_date("2025-08-03T00:00:00Z"), Some(d));
    assert_eq!(parse_date("08/03/2025"), Some(d));
    assert_eq!(parse_date("2025-13-01"), None);
    assert_eq!(parse_date("soon"), None);
  }

  #[test]
  fn placeholder_strata_are_null() {
    assert_eq!(stratum(Some("Not Specified")), None);
    assert_eq!(stratum(Some(" NA ")), None);
    assert_eq!(stratum(Some("")), None);
    assert_eq!(stratum(None), None);
    assert_eq!(stratum(Some("0-4 years")).as_deref(), Some("0-4 years"));
  }
}
