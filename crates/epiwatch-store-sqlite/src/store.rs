//! [`SqliteStore`], the SQLite implementation of [`ObservationStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, params_from_iter, types::Value};
use tracing::{debug, info};

use epiwatch_core::{
  diagnostics::LoadDiagnostics,
  observation::{CanonicalObservation, DataSource},
  reconcile::{MonthlyAggregate, month_of},
  store::{
    DiseaseRef, MergedQuery, ObservationQuery, ObservationStore, QueryRow, SourceBreakdown,
    SummaryStats,
  },
};

use crate::{
  Error, Result,
  encode::{
    RawAggregate, RawDiagnostics, RawObservation, decode_count, decode_date, diagnostics_params,
    encode_date, json_to_sql, observation_params, query_row,
  },
  schema::{COLUMNS, MERGED_VIEW, NEXT_TABLE, TABLE, schema, swap_finish, swap_prelude},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The unified relation backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// `WHERE` clause plus its positional parameters.
#[derive(Default)]
struct Filter {
  conds:  Vec<&'static str>,
  params: Vec<Value>,
}

impl Filter {
  fn push(&mut self, cond: &'static str, value: Option<Value>) {
    if let Some(value) = value {
      self.conds.push(cond);
      self.params.push(value);
    }
  }

  fn clause(&self) -> String {
    if self.conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.conds.join(" AND "))
    }
  }
}

fn text(s: &Option<String>) -> Option<Value> { s.clone().map(Value::Text) }

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests and `:memory:` configs.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let ddl = schema();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a query whose rows are single strings.
  async fn strings(&self, sql: String, params: Vec<Value>) -> Result<Vec<String>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }
}

// ─── ObservationStore impl ───────────────────────────────────────────────────

impl ObservationStore for SqliteStore {
  type Error = Error;

  // ── Load ──────────────────────────────────────────────────────────────────

  async fn replace_all(
    &self,
    observations: Vec<CanonicalObservation>,
    diagnostics: Vec<LoadDiagnostics>,
  ) -> Result<u64> {
    let prelude = swap_prelude();
    let finish = swap_finish();
    let insert = format!(
      "INSERT INTO {NEXT_TABLE} ({COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
    );
    debug!(rows = observations.len(), "replacing unified relation");

    let count: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(&prelude)?;
        {
          let mut stmt = tx.prepare(&insert)?;
          for obs in &observations {
            stmt.execute(params_from_iter(observation_params(obs)))?;
          }
        }
        tx.execute_batch(&finish)?;

        tx.execute("DELETE FROM load_diagnostics", [])?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO load_diagnostics (
               position, data_source, files_read, files_failed, raw_rows,
               transformed_rows, filtered_rows, loaded_rows, malformed_rows,
               unresolved_period, invalid_counts, non_state_rows
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          )?;
          for (i, d) in diagnostics.iter().enumerate() {
            stmt.execute(params_from_iter(diagnostics_params(i, d)))?;
          }
        }

        let count = tx.query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |r| r.get(0))?;
        tx.commit()?;
        Ok(count)
      })
      .await?;

    let count = decode_count(count)?;
    info!(rows = count, "unified relation and reconciliation view rebuilt");
    Ok(count)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn observations(&self, query: &ObservationQuery) -> Result<Vec<CanonicalObservation>> {
    let mut filter = Filter::default();
    filter.push("disease_name = ?", text(&query.disease_name));
    filter.push("disease_slug = ?", text(&query.disease_slug));
    filter.push("state = ?", text(&query.state));
    filter.push(
      "data_source = ?",
      query.data_source.map(|s| Value::Text(s.as_str().to_owned())),
    );
    filter.push("period_start >= ?", query.from.map(|d| Value::Text(encode_date(d))));
    filter.push("period_end <= ?", query.until.map(|d| Value::Text(encode_date(d))));

    let limit = query.limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
    let offset = query.offset.map_or(0, |n| i64::try_from(n).unwrap_or(i64::MAX));
    let sql = format!(
      "SELECT {COLUMNS} FROM {TABLE} {}
       ORDER BY period_start, disease_name, state, data_source
       LIMIT ? OFFSET ?",
      filter.clause()
    );
    let mut params = filter.params;
    params.push(Value::Integer(limit));
    params.push(Value::Integer(offset));

    let raws: Vec<RawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params.iter()), RawObservation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawObservation::into_observation).collect()
  }

  async fn merged(&self, query: &MergedQuery) -> Result<Vec<MonthlyAggregate>> {
    let mut filter = Filter::default();
    filter.push("disease_name = ?", text(&query.disease_name));
    filter.push("state = ?", text(&query.state));
    filter.push("month >= ?", query.from.map(|d| Value::Text(encode_date(month_of(d)))));
    filter.push("month <= ?", query.until.map(|d| Value::Text(encode_date(month_of(d)))));

    let sql = format!(
      "SELECT disease_name, state, month, data_source, count FROM {MERGED_VIEW} {}
       ORDER BY disease_name, state, month",
      filter.clause()
    );
    let params = filter.params;

    let raws: Vec<RawAggregate> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params.iter()), RawAggregate::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAggregate::into_aggregate).collect()
  }

  async fn diseases(&self, source: Option<DataSource>) -> Result<Vec<String>> {
    let mut filter = Filter::default();
    filter.push("data_source = ?", source.map(|s| Value::Text(s.as_str().to_owned())));
    let sql = format!(
      "SELECT DISTINCT disease_name FROM {TABLE} {} ORDER BY disease_name",
      filter.clause()
    );
    self.strings(sql, filter.params).await
  }

  async fn diseases_with_slugs(&self) -> Result<Vec<DiseaseRef>> {
    let sql = format!(
      "SELECT disease_name, MIN(disease_slug) FROM {TABLE}
       GROUP BY disease_name ORDER BY disease_name"
    );
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&sql)?;
          let rows = stmt
            .query_map([], |row| Ok(DiseaseRef { name: row.get(0)?, slug: row.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn disease_by_slug(&self, slug: &str) -> Result<Option<String>> {
    let slug = slug.trim().to_lowercase();
    let sql = format!("SELECT disease_name FROM {TABLE} WHERE disease_slug = ?1 LIMIT 1");
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(&sql, rusqlite::params![slug], |row| row.get(0))
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn states(&self) -> Result<Vec<String>> {
    self
      .strings(format!("SELECT DISTINCT state FROM {TABLE} ORDER BY state"), Vec::new())
      .await
  }

  async fn summary(&self) -> Result<SummaryStats> {
    let totals_sql = format!(
      "SELECT COUNT(*), COUNT(DISTINCT disease_name), COUNT(DISTINCT state),
              COALESCE(SUM(count), 0), MIN(period_start), MAX(period_end)
       FROM {TABLE}"
    );
    let by_source_sql = format!(
      "SELECT data_source, COUNT(*), COALESCE(SUM(count), 0)
       FROM {TABLE} GROUP BY data_source"
    );

    type Totals = (i64, i64, i64, i64, Option<String>, Option<String>);
    let (totals, by_source): (Totals, Vec<(String, i64, i64)>) = self
      .conn
      .call(move |conn| {
        let totals = conn.query_row(&totals_sql, [], |r| {
          Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?))
        })?;
        let mut stmt = conn.prepare(&by_source_sql)?;
        let by_source = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((totals, by_source))
      })
      .await?;

    let (records, diseases, states, cases, earliest, latest) = totals;
    let mut breakdown = by_source
      .into_iter()
      .map(|(source, records, cases)| {
        Ok(SourceBreakdown {
          data_source: DataSource::parse(&source)?,
          records:     decode_count(records)?,
          cases:       decode_count(cases)?,
        })
      })
      .collect::<Result<Vec<_>>>()?;
    breakdown.sort_by_key(|b| b.data_source.priority());

    Ok(SummaryStats {
      total_records:  decode_count(records)?,
      total_diseases: decode_count(diseases)?,
      total_states:   decode_count(states)?,
      total_cases:    decode_count(cases)?,
      earliest_date:  earliest.as_deref().map(decode_date).transpose()?,
      latest_date:    latest.as_deref().map(decode_date).transpose()?,
      by_source:      breakdown,
    })
  }

  async fn diagnostics(&self) -> Result<Vec<LoadDiagnostics>> {
    let raws: Vec<RawDiagnostics> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT data_source, files_read, files_failed, raw_rows, transformed_rows,
                  filtered_rows, loaded_rows, malformed_rows, unresolved_period,
                  invalid_counts, non_state_rows
           FROM load_diagnostics ORDER BY position",
        )?;
        let rows = stmt
          .query_map([], RawDiagnostics::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDiagnostics::into_diagnostics).collect()
  }

  async fn query(&self, sql: String, params: Vec<serde_json::Value>) -> Result<Vec<QueryRow>> {
    let params = params.into_iter().map(json_to_sql).collect::<Result<Vec<_>>>()?;
    let statement = sql.clone();

    // `None` means the statement would write or change connection state.
    // SQLite counts BEGIN/COMMIT/SAVEPOINT and ATTACH/DETACH as read-only;
    // none of them return columns.
    let rows: Option<Vec<QueryRow>> = self
      .conn
      .call(move |conn| {
        let rows = {
          let mut stmt = conn.prepare(&statement)?;
          if !stmt.readonly() || stmt.column_count() == 0 {
            return Ok(None);
          }
          let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_owned).collect();
          stmt
            .query_map(params_from_iter(params.iter()), |row| query_row(row, &columns))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        if !conn.is_autocommit() {
          conn.execute_batch("ROLLBACK")?;
          return Ok(None);
        }
        Ok(Some(rows))
      })
      .await?;

    rows.ok_or(Error::NotReadOnly(sql))
  }
}
