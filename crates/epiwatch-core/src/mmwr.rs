//! MMWR (epidemiological) week resolution.
//!
//! MMWR weeks start on Sunday. Week 1 of a year is the first Sunday-started
//! week that has at least four of its days in that year, so it may begin as
//! early as December 29 of the previous year or as late as January 4.
//!
//! Resolution is plain arithmetic on a fixed week-1 start. Week 53 is not
//! special-cased: in a 52-week year it lands on week 1 of the following year.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

pub const MIN_WEEK: u32 = 1;
pub const MAX_WEEK: u32 = 53;

/// An inclusive Sunday–Saturday calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekRange {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

/// The Sunday on which MMWR week 1 of `year` begins.
///
/// Returns `None` when the year is outside chrono's representable range.
pub fn week1_start(year: i32) -> Option<NaiveDate> {
  let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
  let since_sunday = jan1.weekday().num_days_from_sunday();
  let sunday_on_or_before = jan1.checked_sub_days(Days::new(since_sunday.into()))?;

  // Sunday..=Wednesday: the week holding Jan 1 has >= 4 days in the year.
  if since_sunday <= 3 {
    Some(sunday_on_or_before)
  } else {
    sunday_on_or_before.checked_add_days(Days::new(7))
  }
}

/// Resolve an MMWR `(year, week)` into its calendar range.
///
/// Returns `None` ("unresolved") for week numbers outside `1..=53` or an
/// unrepresentable year. Callers drop unresolved rows rather than failing.
pub fn resolve_week(year: i32, week: u32) -> Option<WeekRange> {
  if !(MIN_WEEK..=MAX_WEEK).contains(&week) {
    return None;
  }
  let start = week1_start(year)?.checked_add_days(Days::new(u64::from(week - 1) * 7))?;
  let end = start.checked_add_days(Days::new(6))?;
  Some(WeekRange { start, end })
}

/// Number of MMWR weeks in `year` (52 or 53).
pub fn weeks_in_year(year: i32) -> Option<u32> {
  let this = week1_start(year)?;
  let next = week1_start(year.checked_add(1)?)?;
  u32::try_from((next - this).num_weeks()).ok()
}

#[cfg(test)]
mod tests {
  use chrono::Weekday;

  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn cdc_published_week1_starts() {
    // Jan 1 on Wednesday: week 1 holds Jan 1.
    assert_eq!(week1_start(2025), Some(date(2024, 12, 29)));
    // Monday.
    assert_eq!(week1_start(2024), Some(date(2023, 12, 31)));
    // Sunday.
    assert_eq!(week1_start(2023), Some(date(2023, 1, 1)));
    // Friday: Jan 1 belongs to the previous year's week 53.
    assert_eq!(week1_start(2021), Some(date(2021, 1, 3)));
    // Thursday.
    assert_eq!(week1_start(2026), Some(date(2026, 1, 4)));
  }

  #[test]
  fn resolve_2025_week_one() {
    let range = resolve_week(2025, 1).unwrap();
    assert_eq!(range.start, date(2024, 12, 29));
    assert_eq!(range.end, date(2025, 1, 4));
    assert_eq!(range.start.weekday(), Weekday::Sun);
  }

  #[test]
  fn every_valid_week_starts_on_sunday_and_spans_six_days() {
    for year in 1990..=2035 {
      for week in MIN_WEEK..=MAX_WEEK {
        let range = resolve_week(year, week).unwrap();
        assert_eq!(range.start.weekday(), Weekday::Sun, "{year}w{week}");
        assert_eq!((range.end - range.start).num_days(), 6);
      }
    }
  }

  #[test]
  fn week1_is_never_more_than_a_few_days_from_new_year() {
    for year in 1900..=2100 {
      let start = resolve_week(year, 1).unwrap().start;
      let offset = (start - date(year, 1, 1)).num_days();
      assert!((-3..=3).contains(&offset), "{year}: {offset}");
    }
  }

  #[test]
  fn consecutive_weeks_are_seven_days_apart() {
    let w1 = resolve_week(2024, 1).unwrap();
    let w2 = resolve_week(2024, 2).unwrap();
    assert_eq!((w2.start - w1.start).num_days(), 7);
  }

  #[test]
  fn out_of_range_weeks_are_unresolved() {
    assert_eq!(resolve_week(2025, 0), None);
    assert_eq!(resolve_week(2025, 54), None);
  }

  #[test]
  fn unrepresentable_year_is_unresolved() {
    assert_eq!(resolve_week(i32::MAX, 1), None);
  }

  #[test]
  fn week_53_only_exists_in_long_years() {
    assert_eq!(weeks_in_year(2020), Some(53));
    assert_eq!(weeks_in_year(2024), Some(52));
    // 2024 has 52 weeks, so "week 53" is week 1 of 2025.
    assert_eq!(resolve_week(2024, 53), resolve_week(2025, 1));
    let last_2020 = resolve_week(2020, 53).unwrap();
    assert_eq!(last_2020.end, date(2021, 1, 2));
  }
}
