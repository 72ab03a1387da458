//! epiwatch command-line entry point.
//!
//! Reads `epiwatch.toml` (or the path given with `--config`) layered under
//! `EPIWATCH_*` environment variables, then runs the requested subcommand.
//! With no subcommand the full startup load runs.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use epiwatch_core::{
  mmwr::{resolve_week, weeks_in_year},
  normalize::Normalizer,
  store::ObservationStore,
};
use epiwatch_loader::{LoaderConfig, run_load};
use epiwatch_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Disease-surveillance ETL loader")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "epiwatch.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Transform both feeds and replace the stored relation.
  Load,
  /// Run a read-only SQL query and print one JSON object per row.
  Query {
    sql:    String,
    /// Positional parameter; parsed as JSON, otherwise bound as text.
    #[arg(long = "param")]
    params: Vec<String>,
  },
  /// List the registered source names.
  Sources,
  /// Print the calendar range of an MMWR week.
  Week { year: i32, week: u32 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Load) {
    Command::Sources => {
      for name in epiwatch_etl::source_names() {
        println!("{name}");
      }
    }
    Command::Week { year, week } => match resolve_week(year, week) {
      Some(range) => {
        let weeks = weeks_in_year(year).map_or_else(|| "?".to_owned(), |n| n.to_string());
        println!("{} {} (of {weeks} weeks)", range.start, range.end);
      }
      None => println!("unresolved"),
    },
    Command::Load => {
      let config = load_config(&cli.config)?;
      let store = open_store(&config).await?;
      let report = run_load(&config, &store, Arc::new(Normalizer::default()))
        .await
        .context("load failed")?;
      println!("{} rows loaded into {}", report.rows, config.store_path.display());
    }
    Command::Query { sql, params } => {
      let config = load_config(&cli.config)?;
      let store = open_store(&config).await?;
      if config.is_in_memory() {
        run_load(&config, &store, Arc::new(Normalizer::default()))
          .await
          .context("load failed")?;
      }

      let params = params
        .into_iter()
        .map(|p| serde_json::from_str(&p).unwrap_or(serde_json::Value::String(p)))
        .collect();
      let rows = store.query(sql, params).await.context("query failed")?;
      for row in rows {
        println!("{}", serde_json::to_string(&row)?);
      }
    }
  }

  Ok(())
}

fn load_config(path: &std::path::Path) -> anyhow::Result<LoaderConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path.to_path_buf()).required(false))
    .add_source(config::Environment::with_prefix("EPIWATCH"))
    .build()
    .context("failed to read config file")?;

  let config: LoaderConfig = settings
    .try_deserialize()
    .context("failed to deserialise LoaderConfig")?;
  Ok(config.expanded())
}

async fn open_store(config: &LoaderConfig) -> anyhow::Result<SqliteStore> {
  let store = if config.is_in_memory() {
    SqliteStore::open_in_memory().await
  } else {
    SqliteStore::open(&config.store_path).await
  };
  store.with_context(|| format!("failed to open store at {:?}", config.store_path))
}
