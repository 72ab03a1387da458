//! Geography classification for NNDSS reporting areas.
//!
//! Matching happens on slugs so that casing, punctuation and spacing
//! variants ("U.S. Residents", "US RESIDENTS") classify the same way.

use crate::{normalize::slugify, observation::GeoUnit};

/// National-aggregate reporting areas, slugified.
const NATIONAL_SLUGS: &[&str] = &[
  "us-residents",
  "usresidents",
  "non-us-residents",
  "non-usresidents",
  "nonusresidents",
  "total",
];

/// The regional aggregates NNDSS reports, slugified.
const REGION_SLUGS: &[&str] = &[
  "new-england",
  "middle-atlantic",
  "east-north-central",
  "west-north-central",
  "south-atlantic",
  "east-south-central",
  "west-south-central",
  "mountain",
  "pacific",
  "us-territories",
];

/// Upper-case state / territory name → postal code.
const STATE_CODES: &[(&str, &str)] = &[
  ("ALABAMA", "AL"),
  ("ALASKA", "AK"),
  ("ARIZONA", "AZ"),
  ("ARKANSAS", "AR"),
  ("CALIFORNIA", "CA"),
  ("COLORADO", "CO"),
  ("CONNECTICUT", "CT"),
  ("DELAWARE", "DE"),
  ("FLORIDA", "FL"),
  ("GEORGIA", "GA"),
  ("HAWAII", "HI"),
  ("IDAHO", "ID"),
  ("ILLINOIS", "IL"),
  ("INDIANA", "IN"),
  ("IOWA", "IA"),
  ("KANSAS", "KS"),
  ("KENTUCKY", "KY"),
  ("LOUISIANA", "LA"),
  ("MAINE", "ME"),
  ("MARYLAND", "MD"),
  ("MASSACHUSETTS", "MA"),
  ("MICHIGAN", "MI"),
  ("MINNESOTA", "MN"),
  ("MISSISSIPPI", "MS"),
  ("MISSOURI", "MO"),
  ("MONTANA", "MT"),
  ("NEBRASKA", "NE"),
  ("NEVADA", "NV"),
  ("NEW HAMPSHIRE", "NH"),
  ("NEW JERSEY", "NJ"),
  ("NEW MEXICO", "NM"),
  ("NEW YORK", "NY"),
  ("NEW YORK CITY", "NYC"),
  ("NORTH CAROLINA", "NC"),
  ("NORTH DAKOTA", "ND"),
  ("OHIO", "OH"),
  ("OKLAHOMA", "OK"),
  ("OREGON", "OR"),
  ("PENNSYLVANIA", "PA"),
  ("RHODE ISLAND", "RI"),
  ("SOUTH CAROLINA", "SC"),
  ("SOUTH DAKOTA", "SD"),
  ("TENNESSEE", "TN"),
  ("TEXAS", "TX"),
  ("UTAH", "UT"),
  ("VERMONT", "VT"),
  ("VIRGINIA", "VA"),
  ("WASHINGTON", "WA"),
  ("WEST VIRGINIA", "WV"),
  ("WISCONSIN", "WI"),
  ("WYOMING", "WY"),
  ("DISTRICT OF COLUMBIA", "DC"),
  ("AMERICAN SAMOA", "AS"),
  ("GUAM", "GU"),
  ("NORTHERN MARIANA ISLANDS", "MP"),
  ("PUERTO RICO", "PR"),
  ("VIRGIN ISLANDS", "VI"),
];

/// Classify a reporting area as national, region or state.
///
/// Anything not in the national or region sets is a state, including blank
/// and unrecognized names.
pub fn classify_geo_unit(reporting_area: &str) -> GeoUnit {
  let Some(slug) = slugify(reporting_area) else {
    return GeoUnit::State;
  };
  if NATIONAL_SLUGS.contains(&slug.as_str()) {
    GeoUnit::National
  } else if REGION_SLUGS.contains(&slug.as_str()) {
    GeoUnit::Region
  } else {
    GeoUnit::State
  }
}

/// Postal code for a state or territory name, case-insensitively.
pub fn state_code(name: &str) -> Option<&'static str> {
  let upper = name.trim().to_uppercase();
  STATE_CODES
    .iter()
    .find(|(full, _)| *full == upper)
    .map(|(_, code)| *code)
}

/// The value stored in an observation's `state` column for a reporting area.
///
/// States map to their postal code when known and otherwise keep the raw
/// name. Regions and national rows keep their original label.
pub fn state_label(reporting_area: &str, unit: GeoUnit) -> String {
  let area = reporting_area.trim();
  match unit {
    GeoUnit::State => state_code(area).map_or_else(|| area.to_owned(), str::to_owned),
    GeoUnit::National | GeoUnit::Region | GeoUnit::County => area.to_owned(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn national_variants() {
    for area in ["US RESIDENTS", "U.S. Residents", "NON-US RESIDENTS", "NON-U.S.RESIDENTS", "TOTAL"] {
      assert_eq!(classify_geo_unit(area), GeoUnit::National, "{area}");
    }
  }

  #[test]
  fn regions() {
    assert_eq!(classify_geo_unit("NEW ENGLAND"), GeoUnit::Region);
    assert_eq!(classify_geo_unit("West South Central"), GeoUnit::Region);
    assert_eq!(classify_geo_unit("US TERRITORIES"), GeoUnit::Region);
  }

  #[test]
  fn everything_else_is_a_state() {
    assert_eq!(classify_geo_unit("TEXAS"), GeoUnit::State);
    assert_eq!(classify_geo_unit("ATLANTIS"), GeoUnit::State);
    assert_eq!(classify_geo_unit(""), GeoUnit::State);
  }

  #[test]
  fn state_names_map_to_codes() {
    assert_eq!(state_code("Texas"), Some("TX"));
    assert_eq!(state_code("NEW YORK CITY"), Some("NYC"));
    assert_eq!(state_code("Atlantis"), None);
  }

  #[test]
  fn state_label_keeps_non_state_names() {
    assert_eq!(state_label("ILLINOIS", GeoUnit::State), "IL");
    assert_eq!(state_label("Atlantis", GeoUnit::State), "Atlantis");
    assert_eq!(state_label("NEW ENGLAND", GeoUnit::Region), "NEW ENGLAND");
    assert_eq!(state_label("US RESIDENTS", GeoUnit::National), "US RESIDENTS");
  }
}
