//! Source reconciliation ("filler pattern").
//!
//! Observations are summed per (disease, state, calendar month, source);
//! within each (disease, state, month) key the highest-priority source wins
//! outright. Tracker data therefore always beats NNDSS where both exist, and
//! NNDSS only fills keys the tracker never reported. Counts from different
//! sources are never blended.
//!
//! The SQLite store builds the same relation as a view; this module is the
//! in-memory definition of it.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::observation::{CanonicalObservation, DataSource};

/// The reconciliation grain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
  pub disease_name: String,
  pub state:        String,
  /// First day of the calendar month.
  pub month:        NaiveDate,
}

/// A per-source monthly sum, and the row type of the reconciled output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
  pub disease_name: String,
  pub state:        String,
  pub month:        NaiveDate,
  pub data_source:  DataSource,
  pub count:        u64,
}

impl MonthlyAggregate {
  pub fn key(&self) -> MonthKey {
    MonthKey {
      disease_name: self.disease_name.clone(),
      state:        self.state.clone(),
      month:        self.month,
    }
  }
}

/// The first day of the month containing `date`.
pub fn month_of(date: NaiveDate) -> NaiveDate {
  date.with_day(1).unwrap_or(date)
}

/// Rows of one source for one (disease, state, period).
///
/// A null-subtype row is that source's total for the period, published
/// alongside the per-subtype breakdown. When one exists only the totals
/// count; otherwise the subtypes are summed.
#[derive(Default)]
struct PeriodSum {
  has_total: bool,
  totals:    u64,
  subtypes:  u64,
}

impl PeriodSum {
  fn add(&mut self, obs: &CanonicalObservation) {
    if obs.disease_subtype.is_none() {
      self.has_total = true;
      self.totals = self.totals.saturating_add(obs.count);
    } else {
      self.subtypes = self.subtypes.saturating_add(obs.count);
    }
  }

  fn count(&self) -> u64 { if self.has_total { self.totals } else { self.subtypes } }
}

/// Sum observations per (disease, state, month-of-`period_start`, source).
///
/// Within each period a source's null-subtype rows replace its subtype rows,
/// so a total and its breakdown are never added together. Output is ordered
/// by key, then source priority.
pub fn aggregate_monthly<'a, I>(observations: I) -> Vec<MonthlyAggregate>
where
  I: IntoIterator<Item = &'a CanonicalObservation>,
{
  type PeriodKey = (String, String, NaiveDate, NaiveDate, u8);
  let mut periods: BTreeMap<PeriodKey, (DataSource, PeriodSum)> = BTreeMap::new();

  for obs in observations {
    let key = (
      obs.disease_name.clone(),
      obs.state.clone(),
      obs.period_start,
      obs.period_end,
      obs.data_source.priority(),
    );
    periods
      .entry(key)
      .or_insert_with(|| (obs.data_source, PeriodSum::default()))
      .1
      .add(obs);
  }

  let mut sums: BTreeMap<(MonthKey, u8), (DataSource, u64)> = BTreeMap::new();
  for ((disease_name, state, period_start, _, priority), (data_source, period)) in periods {
    let key = MonthKey { disease_name, state, month: month_of(period_start) };
    let entry = sums.entry((key, priority)).or_insert((data_source, 0));
    entry.1 = entry.1.saturating_add(period.count());
  }

  sums
    .into_iter()
    .map(|((key, _), (data_source, count))| MonthlyAggregate {
      disease_name: key.disease_name,
      state: key.state,
      month: key.month,
      data_source,
      count,
    })
    .collect()
}

/// Keep only the highest-priority aggregate per key.
pub fn reconcile<I>(aggregates: I) -> Vec<MonthlyAggregate>
where
  I: IntoIterator<Item = MonthlyAggregate>,
{
  let mut best: BTreeMap<MonthKey, MonthlyAggregate> = BTreeMap::new();

  for agg in aggregates {
    let key = agg.key();
    match best.get(&key) {
      Some(current) if current.data_source.priority() <= agg.data_source.priority() => {}
      _ => {
        best.insert(key, agg);
      }
    }
  }

  best.into_values().collect()
}

/// [`aggregate_monthly`] followed by [`reconcile`].
pub fn merge<'a, I>(observations: I) -> Vec<MonthlyAggregate>
where
  I: IntoIterator<Item = &'a CanonicalObservation>,
{
  reconcile(aggregate_monthly(observations))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::observation::GeoUnit;

  fn obs(
    source: DataSource,
    disease: &str,
    state: &str,
    start: (i32, u32, u32),
    count: u64,
  ) -> CanonicalObservation {
    let start = NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap();
    CanonicalObservation {
      period_start: start,
      period_end: start + chrono::Days::new(6),
      date_type: "mmwr".into(),
      time_unit: "week".into(),
      disease_name: disease.into(),
      disease_slug: disease.to_lowercase(),
      disease_subtype: None,
      reporting_jurisdiction: state.into(),
      state: state.into(),
      geo_name: state.into(),
      geo_unit: GeoUnit::State,
      age_group: None,
      confirmation_status: None,
      outcome: "cases".into(),
      count,
      data_source: source,
      original_disease_name: disease.into(),
    }
  }

  #[test]
  fn tracker_wins_where_both_sources_report() {
    let rows = vec![
      obs(DataSource::Tracker, "Pertussis", "TX", (2025, 3, 1), 5),
      obs(DataSource::Tracker, "Pertussis", "TX", (2025, 3, 20), 7),
      obs(DataSource::Nndss, "Pertussis", "TX", (2025, 3, 2), 25),
      obs(DataSource::Nndss, "Pertussis", "TX", (2025, 3, 9), 15),
    ];

    let merged = merge(&rows);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].data_source, DataSource::Tracker);
    assert_eq!(merged[0].count, 12);
  }

  #[test]
  fn nndss_fills_gaps() {
    let rows = vec![
      obs(DataSource::Tracker, "Pertussis", "TX", (2025, 3, 1), 12),
      obs(DataSource::Nndss, "Pertussis", "TX", (2025, 4, 6), 9),
      obs(DataSource::Nndss, "Pertussis", "OK", (2025, 3, 2), 4),
    ];

    let merged = merge(&rows);
    assert_eq!(merged.len(), 3);

    let april = merged
      .iter()
      .find(|m| m.state == "TX" && m.month == NaiveDate::from_ymd_opt(2025, 4, 1).unwrap())
      .unwrap();
    assert_eq!(april.data_source, DataSource::Nndss);
    assert_eq!(april.count, 9);
  }

  #[test]
  fn aggregation_keeps_sources_apart() {
    let rows = vec![
      obs(DataSource::Nndss, "Measles", "IL", (2025, 1, 5), 2),
      obs(DataSource::Tracker, "Measles", "IL", (2025, 1, 1), 3),
    ];

    let aggs = aggregate_monthly(&rows);
    assert_eq!(aggs.len(), 2);
    assert_eq!(aggs[0].data_source, DataSource::Tracker);
    assert_eq!(aggs[1].data_source, DataSource::Nndss);
  }

  #[test]
  fn week_spanning_months_counts_toward_its_start_month() {
    let rows = vec![obs(DataSource::Nndss, "Measles", "IL", (2025, 1, 26), 4)];
    let merged = merge(&rows);
    assert_eq!(merged[0].month, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
  }

  fn subtyped(mut o: CanonicalObservation, subtype: &str) -> CanonicalObservation {
    o.disease_subtype = Some(subtype.into());
    o
  }

  #[test]
  fn period_total_replaces_its_subtype_breakdown() {
    let rows = vec![
      obs(DataSource::Nndss, "Meningococcal disease", "TX", (2025, 3, 2), 10),
      subtyped(obs(DataSource::Nndss, "Meningococcal disease", "TX", (2025, 3, 2), 4), "Serogroup B"),
      subtyped(obs(DataSource::Nndss, "Meningococcal disease", "TX", (2025, 3, 2), 6), "Other serogroups"),
      // No total published for this week: the breakdown is summed.
      subtyped(obs(DataSource::Nndss, "Meningococcal disease", "TX", (2025, 3, 9), 1), "Serogroup B"),
      subtyped(obs(DataSource::Nndss, "Meningococcal disease", "TX", (2025, 3, 9), 2), "Other serogroups"),
    ];

    let merged = merge(&rows);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].count, 13);
  }

  #[test]
  fn null_subtype_rows_of_one_period_still_sum() {
    let rows = vec![
      obs(DataSource::Nndss, "Measles", "TX", (2025, 3, 2), 3),
      obs(DataSource::Nndss, "Measles", "TX", (2025, 3, 2), 5),
    ];
    assert_eq!(merge(&rows)[0].count, 8);
  }

  #[test]
  fn reconcile_is_order_independent() {
    let a = MonthlyAggregate {
      disease_name: "Pertussis".into(),
      state:        "TX".into(),
      month:        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
      data_source:  DataSource::Nndss,
      count:        40,
    };
    let b = MonthlyAggregate { data_source: DataSource::Tracker, count: 12, ..a.clone() };

    assert_eq!(reconcile(vec![a.clone(), b.clone()]), reconcile(vec![b, a]));
  }
}
