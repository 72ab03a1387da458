//! Disease-name normalization.
//!
//! Translates source-specific disease vocabulary into the canonical
//! vocabulary and extracts subtype information embedded in NNDSS labels.
//!
//! All lookup tables live in [`NormalizerTables`] and are injected at
//! construction time; [`Normalizer::default`] uses the built-in tables.
//! Unknown labels are never an error: they pass through unchanged.

use std::collections::{HashMap, HashSet};

// ─── Built-in tables ─────────────────────────────────────────────────────────

/// Tracker label (lowercase) → canonical disease name.
const TRACKER_NAMES: &[(&str, &str)] = &[
  ("measles", "Measles"),
  ("meningococcus", "Meningococcal disease"),
  ("pertussis", "Pertussis"),
];

/// NNDSS labels whose structure the comma parse gets wrong. Exact match.
const NNDSS_LABELS: &[(&str, &str, Option<&str>)] = &[
  ("Hepatitis, B, acute", "Hepatitis B, acute", None),
  ("Hepatitis, B, chronic", "Hepatitis B, chronic", None),
  ("Hepatitis, C, acute", "Hepatitis C, acute", None),
  ("Hepatitis, C, chronic", "Hepatitis C, chronic", None),
  (
    "Haemophilus influenzae, invasive disease, Age <5 years, Serotype b",
    "Haemophilus influenzae, invasive disease",
    Some("b"),
  ),
  (
    "Haemophilus influenzae, invasive disease, All ages, all serotypes",
    "Haemophilus influenzae, invasive disease",
    None,
  ),
];

/// Subtype suffixes that denote a total row rather than a subtype.
/// "imported"/"indigenous" classify measles importation status.
const AGGREGATE_SUBTYPES: &[&str] =
  &["all serogroups", "total", "all", "imported", "indigenous"];

/// Prefixes stripped from NNDSS subtypes ("Serogroup B" → "B").
const SUBTYPE_PREFIXES: &[&str] = &["serogroup ", "serogroups "];

/// Trailing words stripped from NNDSS subtypes ("Other serogroups" → "Other").
const SUBTYPE_SUFFIXES: &[&str] = &["serogroups", "serogroup"];

const NNDSS_SUBTYPES: &[(&str, &str)] = &[
  ("other", "unspecified"),
  ("na", "unspecified"),
  ("n/a", "unspecified"),
  ("unknown", "unknown"),
];

const TRACKER_SUBTYPES: &[(&str, &str)] = &[
  ("other", "unspecified"),
  ("na", "unspecified"),
  ("n/a", "unspecified"),
  ("not specified", "unspecified"),
  ("unknown", "unknown"),
];

/// Variant names of one disease, applied after source normalization.
const DISEASE_ALIASES: &[(&str, &str)] =
  &[("Hansen's Disease", "Leprosy (Hansen's Disease)")];

// ─── Tables ──────────────────────────────────────────────────────────────────

/// Static configuration consumed by [`Normalizer`].
///
/// Keys of the case-insensitive maps are stored lowercase.
#[derive(Debug, Clone)]
pub struct NormalizerTables {
  /// Tracker label (lowercase) → canonical name.
  pub tracker_names:      HashMap<String, String>,
  /// NNDSS label (exact) → (canonical name, subtype).
  pub nndss_labels:       HashMap<String, (String, Option<String>)>,
  /// Lowercase subtype texts that mark an aggregate row.
  pub aggregate_subtypes: HashSet<String>,
  /// Lowercase prefixes stripped from NNDSS subtypes.
  pub subtype_prefixes:   Vec<String>,
  /// Lowercase trailing words stripped from NNDSS subtypes.
  pub subtype_suffixes:   Vec<String>,
  /// Lowercase NNDSS subtype spelling → canonical subtype.
  pub nndss_subtypes:     HashMap<String, String>,
  /// Lowercase tracker subtype spelling → canonical subtype.
  pub tracker_subtypes:   HashMap<String, String>,
  /// Exact canonical-name aliases.
  pub aliases:            HashMap<String, String>,
}

fn pairs(table: &[(&str, &str)]) -> HashMap<String, String> {
  table
    .iter()
    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
    .collect()
}

impl NormalizerTables {
  /// Tables with every map empty, so everything passes through.
  pub fn empty() -> Self {
    Self {
      tracker_names:      HashMap::new(),
      nndss_labels:       HashMap::new(),
      aggregate_subtypes: HashSet::new(),
      subtype_prefixes:   Vec::new(),
      subtype_suffixes:   Vec::new(),
      nndss_subtypes:     HashMap::new(),
      tracker_subtypes:   HashMap::new(),
      aliases:            HashMap::new(),
    }
  }
}

impl Default for NormalizerTables {
  fn default() -> Self {
    Self {
      tracker_names:      pairs(TRACKER_NAMES),
      nndss_labels:       NNDSS_LABELS
        .iter()
        .map(|(label, name, subtype)| {
          (
            (*label).to_owned(),
            ((*name).to_owned(), subtype.map(str::to_owned)),
          )
        })
        .collect(),
      aggregate_subtypes: AGGREGATE_SUBTYPES.iter().map(|s| (*s).to_owned()).collect(),
      subtype_prefixes:   SUBTYPE_PREFIXES.iter().map(|s| (*s).to_owned()).collect(),
      subtype_suffixes:   SUBTYPE_SUFFIXES.iter().map(|s| (*s).to_owned()).collect(),
      nndss_subtypes:     pairs(NNDSS_SUBTYPES),
      tracker_subtypes:   pairs(TRACKER_SUBTYPES),
      aliases:            pairs(DISEASE_ALIASES),
    }
  }
}

// ─── Normalizer ──────────────────────────────────────────────────────────────

/// Pure, stateless translation of disease labels. Every method takes `&self`
/// and reads only the injected tables.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
  tables: NormalizerTables,
}

impl Normalizer {
  pub fn new(tables: NormalizerTables) -> Self { Self { tables } }

  pub fn tables(&self) -> &NormalizerTables { &self.tables }

  /// Case-insensitive lookup of a tracker label; unknown labels come back
  /// unchanged (after alias resolution).
  pub fn normalize_tracker_name(&self, raw_label: &str) -> String {
    let trimmed = raw_label.trim();
    let name = self
      .tables
      .tracker_names
      .get(&trimmed.to_lowercase())
      .map(String::as_str)
      .unwrap_or(trimmed);
    self.alias(name)
  }

  /// Split an NNDSS label into `(canonical_name, canonical_subtype)`.
  ///
  /// The subtype is `None` for labels without a comma suffix and for
  /// aggregate rows ("All serogroups"), so that summing subtypes never
  /// double counts the total row.
  pub fn parse_nndss_label(&self, raw_label: &str) -> (String, Option<String>) {
    let label = raw_label.trim();

    if let Some((name, subtype)) = self.tables.nndss_labels.get(label) {
      return (self.alias(name), subtype.clone());
    }

    let Some((base, suffix)) = label.split_once(',') else {
      return (self.alias(label), None);
    };

    let name = self.alias(base.trim());
    let suffix = suffix.trim();
    if suffix.is_empty()
      || self.tables.aggregate_subtypes.contains(&suffix.to_lowercase())
    {
      return (name, None);
    }

    let stripped = self.strip_subtype_affixes(suffix);
    if stripped.is_empty() {
      return (name, None);
    }

    let subtype = self
      .tables
      .nndss_subtypes
      .get(&stripped.to_lowercase())
      .cloned()
      .unwrap_or_else(|| stripped.to_owned());
    (name, Some(subtype))
  }

  /// Canonicalize a tracker `disease_subtype` cell. Blank cells are `None`.
  pub fn normalize_tracker_subtype(&self, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return None;
    }
    Some(
      self
        .tables
        .tracker_subtypes
        .get(&trimmed.to_lowercase())
        .cloned()
        .unwrap_or_else(|| trimmed.to_owned()),
    )
  }

  /// Resolve a canonical-name alias, or return `name` unchanged.
  pub fn alias(&self, name: &str) -> String {
    self
      .tables
      .aliases
      .get(name)
      .cloned()
      .unwrap_or_else(|| name.to_owned())
  }

  fn strip_subtype_affixes<'a>(&self, suffix: &'a str) -> &'a str {
    let mut rest = suffix;

    // Prefixes are ASCII, so byte offsets line up between `rest` and its
    // lowercase copy.
    let lower = rest.to_ascii_lowercase();
    if let Some(prefix) = self
      .tables
      .subtype_prefixes
      .iter()
      .find(|p| lower.starts_with(p.as_str()))
    {
      rest = &rest[prefix.len()..];
    }

    let lower = rest.to_ascii_lowercase();
    if let Some(word) = self
      .tables
      .subtype_suffixes
      .iter()
      .find(|w| lower.ends_with(w.as_str()))
    {
      rest = &rest[..rest.len() - word.len()];
    }

    rest.trim()
  }
}

// ─── Slugs ───────────────────────────────────────────────────────────────────

/// Convert text to a lowercase, hyphen-separated slug.
///
/// Punctuation other than `-` and `_` is dropped, runs of whitespace,
/// underscores and hyphens collapse to a single `-`. Returns `None` when
/// nothing alphanumeric remains.
pub fn slugify(value: &str) -> Option<String> {
  let mut slug = String::with_capacity(value.len());
  let mut pending_hyphen = false;

  for c in value.trim().chars().flat_map(char::to_lowercase) {
    if c.is_alphanumeric() {
      if pending_hyphen && !slug.is_empty() {
        slug.push('-');
      }
      pending_hyphen = false;
      slug.push(c);
    } else if c.is_whitespace() || c == '-' || c == '_' {
      pending_hyphen = true;
    }
  }

  (!slug.is_empty()).then_some(slug)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn norm() -> Normalizer { Normalizer::default() }

  // ── Tracker names ───────────────────────────────────────────────────────

  #[test]
  fn tracker_lookup_is_case_insensitive() {
    assert_eq!(norm().normalize_tracker_name("Meningococcus"), "Meningococcal disease");
    assert_eq!(norm().normalize_tracker_name("PERTUSSIS"), "Pertussis");
  }

  #[test]
  fn unknown_tracker_label_passes_through() {
    assert_eq!(norm().normalize_tracker_name("Mumps"), "Mumps");
  }

  // ── NNDSS labels ────────────────────────────────────────────────────────

  #[test]
  fn serogroup_prefix_is_stripped() {
    assert_eq!(
      norm().parse_nndss_label("Meningococcal disease, Serogroup B"),
      ("Meningococcal disease".to_owned(), Some("B".to_owned()))
    );
    assert_eq!(
      norm().parse_nndss_label("Meningococcal disease, Serogroups ACWY"),
      ("Meningococcal disease".to_owned(), Some("ACWY".to_owned()))
    );
  }

  #[test]
  fn measles_importation_status_is_not_a_subtype() {
    assert_eq!(
      norm().parse_nndss_label("Measles, Imported"),
      ("Measles".to_owned(), None)
    );
    assert_eq!(
      norm().parse_nndss_label("Measles, Indigenous"),
      ("Measles".to_owned(), None)
    );
  }

  #[test]
  fn aggregate_rows_have_no_subtype() {
    let (name, subtype) = norm().parse_nndss_label("Meningococcal disease, All serogroups");
    assert_eq!(name, "Meningococcal disease");
    assert_eq!(subtype, None);
  }

  #[test]
  fn other_and_unknown_serogroups_are_canonicalized() {
    assert_eq!(
      norm().parse_nndss_label("Meningococcal disease, Other serogroups").1,
      Some("unspecified".to_owned())
    );
    assert_eq!(
      norm().parse_nndss_label("Meningococcal disease, Unknown serogroup").1,
      Some("unknown".to_owned())
    );
  }

  #[test]
  fn label_without_comma_has_no_subtype() {
    assert_eq!(norm().parse_nndss_label(" Pertussis "), ("Pertussis".to_owned(), None));
  }

  #[test]
  fn explicit_transform_wins_over_comma_parse() {
    assert_eq!(
      norm().parse_nndss_label("Hepatitis, B, acute"),
      ("Hepatitis B, acute".to_owned(), None)
    );
  }

  #[test]
  fn aliases_apply_to_both_sources() {
    assert_eq!(norm().normalize_tracker_name("Hansen's Disease"), "Leprosy (Hansen's Disease)");
    assert_eq!(norm().parse_nndss_label("Hansen's Disease").0, "Leprosy (Hansen's Disease)");
  }

  #[test]
  fn specific_serogroups_never_resolve_to_none() {
    for group in ["A", "B", "C", "W", "Y", "ACWY"] {
      let label = format!("Meningococcal disease, Serogroup {group}");
      assert!(norm().parse_nndss_label(&label).1.is_some(), "{label}");
    }
  }

  #[test]
  fn normalization_is_idempotent() {
    let n = norm();
    for label in [
      "Meningococcal disease, Serogroup B",
      "Measles, Imported",
      "Something odd,",
      "",
    ] {
      assert_eq!(n.parse_nndss_label(label), n.parse_nndss_label(label));
    }
    assert_eq!(n.normalize_tracker_name("measles"), n.normalize_tracker_name("measles"));
  }

  #[test]
  fn malformed_labels_degrade_to_pass_through() {
    assert_eq!(norm().parse_nndss_label("Odd label,"), ("Odd label".to_owned(), None));
    assert_eq!(
      norm().parse_nndss_label("Meningococcal disease, Serogroups"),
      ("Meningococcal disease".to_owned(), None)
    );
    assert_eq!(norm().parse_nndss_label(""), (String::new(), None));
  }

  #[test]
  fn injected_tables_replace_builtins() {
    let mut tables = NormalizerTables::empty();
    tables.tracker_names.insert("flu".into(), "Influenza".into());
    let n = Normalizer::new(tables);

    assert_eq!(n.normalize_tracker_name("Flu"), "Influenza");
    assert_eq!(n.normalize_tracker_name("measles"), "measles");
    assert_eq!(
      n.parse_nndss_label("Measles, Imported"),
      ("Measles".to_owned(), Some("Imported".to_owned()))
    );
  }

  // ── Tracker subtypes ────────────────────────────────────────────────────

  #[test]
  fn tracker_subtype_placeholders() {
    let n = norm();
    assert_eq!(n.normalize_tracker_subtype("NA").as_deref(), Some("unspecified"));
    assert_eq!(n.normalize_tracker_subtype("Not Specified").as_deref(), Some("unspecified"));
    assert_eq!(n.normalize_tracker_subtype("n/a").as_deref(), Some("unspecified"));
    assert_eq!(n.normalize_tracker_subtype("Unknown").as_deref(), Some("unknown"));
    assert_eq!(n.normalize_tracker_subtype(" B ").as_deref(), Some("B"));
    assert_eq!(n.normalize_tracker_subtype("  "), None);
  }

  // ── Slugs ───────────────────────────────────────────────────────────────

  #[test]
  fn slugify_examples() {
    assert_eq!(slugify("Meningococcal disease").as_deref(), Some("meningococcal-disease"));
    assert_eq!(slugify("U.S. Residents").as_deref(), Some("us-residents"));
    assert_eq!(slugify("NON-U.S.RESIDENTS").as_deref(), Some("non-usresidents"));
    assert_eq!(slugify("Leprosy (Hansen's Disease)").as_deref(), Some("leprosy-hansens-disease"));
    assert_eq!(slugify("  __--  ").as_deref(), None);
  }
}
