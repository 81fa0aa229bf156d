//! refrain-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the review API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::TimeDelta;
use clap::Parser;
use refrain_core::{
  Scheduler,
  policy::{EasyInterval, FixedIntervalPolicy},
  scheduler::{InitialDue, SchedulerConfig},
};
use refrain_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::{net::TcpListener, sync::broadcast::error::RecvError};
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `REFRAIN_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ServerConfig {
  host:       String,
  port:       u16,
  store_path: PathBuf,

  /// Reject ingest of text already present in the same partition.
  dedup_per_partition: bool,
  /// Minutes before a freshly ingested item first comes due; 0 means
  /// immediately due.
  initial_grace_minutes: i64,
  /// Offset earned by an Easy rating: `standard` (+3 days) or
  /// `first_pass` (+7 days).
  easy_interval: EasyInterval,
  /// Seconds within which an identical repeated rating is treated as a
  /// duplicate delivery.
  dedup_window_seconds: i64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  "127.0.0.1".into(),
      port:                  8000,
      store_path:            PathBuf::from("refrain.db"),
      dedup_per_partition:   true,
      initial_grace_minutes: 0,
      easy_interval:         EasyInterval::Standard,
      dedup_window_seconds:  30,
    }
  }
}

impl ServerConfig {
  fn scheduler_config(&self) -> SchedulerConfig {
    SchedulerConfig {
      dedup_per_partition: self.dedup_per_partition,
      initial_due:         if self.initial_grace_minutes > 0 {
        InitialDue::Grace(TimeDelta::minutes(self.initial_grace_minutes))
      } else {
        InitialDue::Immediate
      },
      dedup_window:        TimeDelta::seconds(self.dedup_window_seconds),
    }
  }
}

// ─── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Refrain review scheduling server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("REFRAIN"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Build the scheduler.
  let policy = FixedIntervalPolicy::new(server_cfg.easy_interval);
  let scheduler = Arc::new(Scheduler::new(
    Arc::new(store),
    Box::new(policy),
    server_cfg.scheduler_config(),
  ));

  // Push-delivery side-channel: log every scheduler event. A slow or
  // failed consumer never affects the transition it reports.
  let mut events = scheduler.subscribe();
  tokio::spawn(async move {
    loop {
      match events.recv().await {
        Ok(event) => tracing::info!(?event, "scheduler event"),
        Err(RecvError::Lagged(skipped)) => {
          tracing::warn!(skipped, "event listener lagging")
        }
        Err(RecvError::Closed) => break,
      }
    }
  });

  let app = refrain_api::api_router(scheduler).layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
