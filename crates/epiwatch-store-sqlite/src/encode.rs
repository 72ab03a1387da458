//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as `YYYY-MM-DD` strings so that lexicographic order is
//! chronological order and SQLite's date functions apply directly. Enums are
//! stored as their lowercase tags.

use chrono::NaiveDate;
use epiwatch_core::{
  diagnostics::LoadDiagnostics,
  observation::{CanonicalObservation, DataSource, GeoUnit},
  reconcile::MonthlyAggregate,
  store::QueryRow,
};
use rusqlite::types::{Value, ValueRef};

use crate::{Error, Result};

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Counts ──────────────────────────────────────────────────────────────────

pub fn encode_count(n: u64) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

pub fn decode_count(n: i64) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::Decode(format!("negative count {n}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw column values of one `disease_data` row, in [`crate::schema::COLUMNS`]
/// order.
pub struct RawObservation {
  pub period_start:           String,
  pub period_end:             String,
  pub date_type:              String,
  pub time_unit:              String,
  pub disease_name:           String,
  pub disease_slug:           String,
  pub disease_subtype:        Option<String>,
  pub reporting_jurisdiction: String,
  pub state:                  String,
  pub geo_name:               String,
  pub geo_unit:               String,
  pub age_group:              Option<String>,
  pub confirmation_status:    Option<String>,
  pub outcome:                String,
  pub count:                  i64,
  pub data_source:            String,
  pub original_disease_name:  String,
}

impl RawObservation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      period_start:           row.get(0)?,
      period_end:             row.get(1)?,
      date_type:              row.get(2)?,
      time_unit:              row.get(3)?,
      disease_name:           row.get(4)?,
      disease_slug:           row.get(5)?,
      disease_subtype:        row.get(6)?,
      reporting_jurisdiction: row.get(7)?,
      state:                  row.get(8)?,
      geo_name:               row.get(9)?,
      geo_unit:               row.get(10)?,
      age_group:              row.get(11)?,
      confirmation_status:    row.get(12)?,
      outcome:                row.get(13)?,
      count:                  row.get(14)?,
      data_source:            row.get(15)?,
      original_disease_name:  row.get(16)?,
    })
  }

  pub fn into_observation(self) -> Result<CanonicalObservation> {
    Ok(CanonicalObservation {
      period_start:           decode_date(&self.period_start)?,
      period_end:             decode_date(&self.period_end)?,
      date_type:              self.date_type,
      time_unit:              self.time_unit,
      disease_name:           self.disease_name,
      disease_slug:           self.disease_slug,
      disease_subtype:        self.disease_subtype,
      reporting_jurisdiction: self.reporting_jurisdiction,
      state:                  self.state,
      geo_name:               self.geo_name,
      geo_unit:               GeoUnit::parse(&self.geo_unit)?,
      age_group:              self.age_group,
      confirmation_status:    self.confirmation_status,
      outcome:                self.outcome,
      count:                  decode_count(self.count)?,
      data_source:            DataSource::parse(&self.data_source)?,
      original_disease_name:  self.original_disease_name,
    })
  }
}

/// Bind an observation's columns in [`crate::schema::COLUMNS`] order.
pub fn observation_params(obs: &CanonicalObservation) -> [Value; 17] {
  let opt = |v: &Option<String>| v.clone().map_or(Value::Null, Value::Text);
  [
    Value::Text(encode_date(obs.period_start)),
    Value::Text(encode_date(obs.period_end)),
    Value::Text(obs.date_type.clone()),
    Value::Text(obs.time_unit.clone()),
    Value::Text(obs.disease_name.clone()),
    Value::Text(obs.disease_slug.clone()),
    opt(&obs.disease_subtype),
    Value::Text(obs.reporting_jurisdiction.clone()),
    Value::Text(obs.state.clone()),
    Value::Text(obs.geo_name.clone()),
    Value::Text(obs.geo_unit.as_str().to_owned()),
    opt(&obs.age_group),
    opt(&obs.confirmation_status),
    Value::Text(obs.outcome.clone()),
    Value::Integer(encode_count(obs.count)),
    Value::Text(obs.data_source.as_str().to_owned()),
    Value::Text(obs.original_disease_name.clone()),
  ]
}

/// One row of the reconciliation view.
pub struct RawAggregate {
  pub disease_name: String,
  pub state:        String,
  pub month:        String,
  pub data_source:  String,
  pub count:        i64,
}

impl RawAggregate {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      disease_name: row.get(0)?,
      state:        row.get(1)?,
      month:        row.get(2)?,
      data_source:  row.get(3)?,
      count:        row.get(4)?,
    })
  }

  pub fn into_aggregate(self) -> Result<MonthlyAggregate> {
    Ok(MonthlyAggregate {
      disease_name: self.disease_name,
      state:        self.state,
      month:        decode_date(&self.month)?,
      data_source:  DataSource::parse(&self.data_source)?,
      count:        decode_count(self.count)?,
    })
  }
}

/// One `load_diagnostics` row; counters are stored as signed integers.
pub struct RawDiagnostics {
  pub data_source: Option<String>,
  pub counters:    [i64; 10],
}

impl RawDiagnostics {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let mut counters = [0i64; 10];
    for (i, slot) in counters.iter_mut().enumerate() {
      *slot = row.get(i + 1)?;
    }
    Ok(Self { data_source: row.get(0)?, counters })
  }

  pub fn into_diagnostics(self) -> Result<LoadDiagnostics> {
    let c = self.counters.map(decode_count);
    let [files_read, files_failed, raw, transformed, filtered, loaded, malformed, unresolved, invalid, non_state] =
      c;
    Ok(LoadDiagnostics {
      data_source:       self.data_source.as_deref().map(DataSource::parse).transpose()?,
      files_read:        files_read?,
      files_failed:      files_failed?,
      raw_rows:          raw?,
      transformed_rows:  transformed?,
      filtered_rows:     filtered?,
      loaded_rows:       loaded?,
      malformed_rows:    malformed?,
      unresolved_period: unresolved?,
      invalid_counts:    invalid?,
      non_state_rows:    non_state?,
    })
  }
}

/// Counters in `load_diagnostics` column order.
pub fn diagnostics_params(position: usize, d: &LoadDiagnostics) -> [Value; 12] {
  let n = |v: u64| Value::Integer(encode_count(v));
  [
    Value::Integer(i64::try_from(position).unwrap_or(i64::MAX)),
    d.data_source.map_or(Value::Null, |s| Value::Text(s.as_str().to_owned())),
    n(d.files_read),
    n(d.files_failed),
    n(d.raw_rows),
    n(d.transformed_rows),
    n(d.filtered_rows),
    n(d.loaded_rows),
    n(d.malformed_rows),
    n(d.unresolved_period),
    n(d.invalid_counts),
    n(d.non_state_rows),
  ]
}

// ─── Generic query values ────────────────────────────────────────────────────

/// A JSON query parameter as an SQLite value. Arrays and objects bind as
/// their JSON text.
pub fn json_to_sql(v: serde_json::Value) -> Result<Value> {
  use serde_json::Value as J;
  Ok(match v {
    J::Null => Value::Null,
    J::Bool(b) => Value::Integer(i64::from(b)),
    J::Number(n) => match n.as_i64() {
      Some(i) => Value::Integer(i),
      None => Value::Real(n.as_f64().unwrap_or(f64::NAN)),
    },
    J::String(s) => Value::Text(s),
    other @ (J::Array(_) | J::Object(_)) => Value::Text(serde_json::to_string(&other)?),
  })
}

/// An SQLite cell as JSON. Blobs render as lowercase hex.
pub fn sql_to_json(v: ValueRef<'_>) -> serde_json::Value {
  use serde_json::Value as J;
  match v {
    ValueRef::Null => J::Null,
    ValueRef::Integer(i) => J::from(i),
    ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(J::Null, J::Number),
    ValueRef::Text(t) => J::String(String::from_utf8_lossy(t).into_owned()),
    ValueRef::Blob(b) => J::String(hex::encode(b)),
  }
}

/// Read every column of `row` into a [`QueryRow`].
pub fn query_row(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<QueryRow> {
  let mut out = QueryRow::new();
  for (i, name) in columns.iter().enumerate() {
    out.insert(name.clone(), sql_to_json(row.get_ref(i)?));
  }
  Ok(out)
}
