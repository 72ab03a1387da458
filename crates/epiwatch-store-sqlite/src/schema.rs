//! SQL schema for the epiwatch SQLite store.
//!
//! `disease_data` holds the unified relation and `disease_data_merged` is the
//! reconciliation view over it. A load builds `disease_data_next`, then swaps
//! it in and rebuilds indices and the view inside the same transaction.

use epiwatch_core::observation::DataSource;

pub const TABLE: &str = "disease_data";
pub const NEXT_TABLE: &str = "disease_data_next";
pub const MERGED_VIEW: &str = "disease_data_merged";

/// Column order shared by every INSERT and SELECT of an observation.
pub const COLUMNS: &str = "period_start, period_end, date_type, time_unit, \
  disease_name, disease_slug, disease_subtype, reporting_jurisdiction, state, \
  geo_name, geo_unit, age_group, confirmation_status, outcome, count, \
  data_source, original_disease_name";

/// `CREATE TABLE` for the unified relation under `name`.
pub fn table_ddl(name: &str) -> String {
  format!(
    "CREATE TABLE IF NOT EXISTS {name} (
    period_start           TEXT    NOT NULL,   -- YYYY-MM-DD
    period_end             TEXT    NOT NULL,
    date_type              TEXT    NOT NULL,
    time_unit              TEXT    NOT NULL,
    disease_name           TEXT    NOT NULL,
    disease_slug           TEXT    NOT NULL,
    disease_subtype        TEXT,
    reporting_jurisdiction TEXT    NOT NULL,
    state                  TEXT    NOT NULL,
    geo_name               TEXT    NOT NULL,
    geo_unit               TEXT    NOT NULL,   -- 'national' | 'region' | 'state' | 'county'
    age_group              TEXT,
    confirmation_status    TEXT,
    outcome                TEXT    NOT NULL,
    count                  INTEGER NOT NULL CHECK (count >= 0),
    data_source            TEXT    NOT NULL,   -- 'tracker' | 'nndss'
    original_disease_name  TEXT    NOT NULL,
    CHECK (period_start <= period_end)
);"
  )
}

/// Secondary indices on the live table.
pub const INDICES: &str = "
CREATE INDEX IF NOT EXISTS disease_data_disease_idx ON disease_data(disease_name);
CREATE INDEX IF NOT EXISTS disease_data_slug_idx    ON disease_data(disease_slug);
CREATE INDEX IF NOT EXISTS disease_data_state_idx   ON disease_data(state);
CREATE INDEX IF NOT EXISTS disease_data_period_idx  ON disease_data(period_start);
CREATE INDEX IF NOT EXISTS disease_data_source_idx  ON disease_data(data_source);
";

/// Priority ranking as a SQL `CASE`, generated from [`DataSource::priority`]
/// so the view and the in-memory reconciliation can never disagree.
fn priority_case() -> String {
  let arms: Vec<String> = DataSource::ALL
    .iter()
    .map(|s| format!("WHEN '{}' THEN {}", s.as_str(), s.priority()))
    .collect();
  format!("CASE data_source {} ELSE 255 END", arms.join(" "))
}

/// The filler-pattern view: per-period totals summed by month and source,
/// highest priority wins.
pub fn merged_view_ddl() -> String {
  format!(
    "CREATE VIEW IF NOT EXISTS {MERGED_VIEW} AS
WITH periods AS (
    -- a null-subtype row is the period total; its breakdown is not added again
    SELECT disease_name,
           state,
           period_start,
           data_source,
           CASE WHEN MAX(disease_subtype IS NULL) = 1
                THEN SUM(CASE WHEN disease_subtype IS NULL THEN count ELSE 0 END)
                ELSE SUM(count)
           END AS count
    FROM {TABLE}
    GROUP BY disease_name, state, period_start, period_end, data_source
),
monthly AS (
    SELECT disease_name,
           state,
           strftime('%Y-%m-01', period_start) AS month,
           data_source,
           SUM(count) AS count
    FROM periods
    GROUP BY disease_name, state, month, data_source
),
ranked AS (
    SELECT monthly.*,
           ROW_NUMBER() OVER (
               PARTITION BY disease_name, state, month
               ORDER BY {}
           ) AS source_rank
    FROM monthly
)
SELECT disease_name, state, month, data_source, count
FROM ranked
WHERE source_rank = 1;",
    priority_case()
  )
}

/// Counters persisted by the latest load, one row per source.
const DIAGNOSTICS_DDL: &str = "
CREATE TABLE IF NOT EXISTS load_diagnostics (
    position          INTEGER PRIMARY KEY,
    data_source       TEXT,
    files_read        INTEGER NOT NULL,
    files_failed      INTEGER NOT NULL,
    raw_rows          INTEGER NOT NULL,
    transformed_rows  INTEGER NOT NULL,
    filtered_rows     INTEGER NOT NULL,
    loaded_rows       INTEGER NOT NULL,
    malformed_rows    INTEGER NOT NULL,
    unresolved_period INTEGER NOT NULL,
    invalid_counts    INTEGER NOT NULL,
    non_state_rows    INTEGER NOT NULL
);
";

/// Full startup DDL; idempotent thanks to `IF NOT EXISTS`.
pub fn schema() -> String {
  format!(
    "PRAGMA journal_mode = WAL;\n{}\n{INDICES}\n{}\n{DIAGNOSTICS_DDL}\nPRAGMA user_version = 1;\n",
    table_ddl(TABLE),
    merged_view_ddl()
  )
}

/// Statements run inside the load transaction before rows are inserted.
pub fn swap_prelude() -> String {
  format!("DROP TABLE IF EXISTS {NEXT_TABLE};\n{}", table_ddl(NEXT_TABLE))
}

/// Statements that replace the live table with the freshly built one.
pub fn swap_finish() -> String {
  format!(
    "DROP VIEW IF EXISTS {MERGED_VIEW};
DROP TABLE IF EXISTS {TABLE};
ALTER TABLE {NEXT_TABLE} RENAME TO {TABLE};
{INDICES}
{}",
    merged_view_ddl()
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn view_ranks_tracker_first() {
    let ddl = merged_view_ddl();
    assert!(ddl.contains("WHEN 'tracker' THEN 1"));
    assert!(ddl.contains("WHEN 'nndss' THEN 2"));
  }
}
