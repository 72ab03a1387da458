//! The canonical observation, the unified record both sources are
//! normalized into before storage.
//!
//! Observations are created once per load and never updated. A fresh load
//! re-derives every row from the source files.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::{Error, Result};

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Which feed an observation came from.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DataSource {
  /// State-submitted granular data.
  Tracker,
  /// The CDC's national weekly aggregate feed.
  Nndss,
}

impl DataSource {
  pub const ALL: [DataSource; 2] = [DataSource::Tracker, DataSource::Nndss];

  /// Rank used by the reconciliation view; lower wins.
  pub fn priority(self) -> u8 {
    match self {
      Self::Tracker => 1,
      Self::Nndss => 2,
    }
  }

  /// The tag stored in the `data_source` column.
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownDataSource(s.to_owned()))
  }
}

// ─── Geography ───────────────────────────────────────────────────────────────

/// What the `state` / `geo_name` pair of an observation represents.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum GeoUnit {
  National,
  Region,
  #[default]
  State,
  County,
}

impl GeoUnit {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s.trim()).map_err(|_| Error::UnknownGeoUnit(s.to_owned()))
  }
}

// ─── Labels ──────────────────────────────────────────────────────────────────

/// `date_type` for periods derived from an MMWR year/week pair.
pub const DATE_TYPE_MMWR: &str = "mmwr";
/// `date_type` default for tracker rows that do not declare one.
pub const DATE_TYPE_CCCD: &str = "cccd";

pub const TIME_UNIT_WEEK: &str = "week";
pub const TIME_UNIT_MONTH: &str = "month";

/// `outcome` for case counts; the only outcome either feed reports today.
pub const OUTCOME_CASES: &str = "cases";

// ─── Observation ─────────────────────────────────────────────────────────────

/// One count of disease cases for a disease, place, period and
/// stratification.
///
/// Invariants upheld by the transformers: `period_start <= period_end`, and
/// `count` is a parsed non-negative integer (rows with unparsable counts are
/// dropped, never stored as null).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalObservation {
  pub period_start:           NaiveDate,
  pub period_end:             NaiveDate,
  /// How the period was derived, e.g. `"mmwr"` or `"cccd"`.
  pub date_type:              String,
  /// `"week"` or `"month"`.
  pub time_unit:              String,
  pub disease_name:           String,
  pub disease_slug:           String,
  /// `None` means either "no subtype applies" or "aggregate across
  /// subtypes"; the feeds do not distinguish the two.
  pub disease_subtype:        Option<String>,
  pub reporting_jurisdiction: String,
  /// Two-letter code for states; the original label for regions and
  /// national rows.
  pub state:                  String,
  pub geo_name:               String,
  pub geo_unit:               GeoUnit,
  pub age_group:              Option<String>,
  pub confirmation_status:    Option<String>,
  pub outcome:                String,
  pub count:                  u64,
  pub data_source:            DataSource,
  /// The label exactly as it appeared in the source file.
  pub original_disease_name:  String,
}
