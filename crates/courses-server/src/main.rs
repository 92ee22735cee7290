//! courses-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and serves the course registration API over HTTP.
//!
//! # Seeding
//!
//! Persons, course templates and course instances are provisioned from a
//! JSON file:
//!
//! ```
//! cargo run -p courses-server -- --import seed.json
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use courses_api::ApiState;
use courses_core::repository::Store;
use courses_server::{Provisioning, expand_tilde, load_config, provision};
use courses_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Course registration server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Load persons, course templates and course instances from a JSON file
  /// and exit.
  #[arg(long, value_name = "FILE")]
  import: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = load_config(&cli.config)?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: import provisioning data and exit.
  if let Some(path) = cli.import {
    let raw = tokio::fs::read_to_string(&path)
      .await
      .with_context(|| format!("failed to read {path:?}"))?;
    let data: Provisioning =
      serde_json::from_str(&raw).context("failed to parse import file")?;

    let mut uow = store.begin();
    let count = provision(&mut uow, data).await.context("import failed")?;
    tracing::info!("Imported {count} records from {path:?}");
    return Ok(());
  }

  let state = ApiState::new(Arc::new(store), server_cfg.current_semester.clone());
  let app = courses_api::api_router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
