//! Ledger indexer entry point.
//!
//! The indexer tails two ledger contracts (identities and agreements),
//! decodes their event logs, and folds them into a `PostgreSQL` index:
//! current entity state, an append-only audit trail per agreement, and
//! reputation snapshots derived from that trail.
//!
//! # Architecture
//!
//! ```text
//! JSON-RPC (eth_getLogs) --> Decoder --> Processors --> PostgreSQL
//!                                              |
//!                                   Reputation Engine (replay)
//! ```
//!
//! Startup backfills from the stored checkpoint to the node head, then a
//! polling watcher feeds new blocks to the tail loop until SIGINT or
//! SIGTERM.

mod config;
mod processors;
mod rpc;
mod sync;

use std::path::Path;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use anchor_db::{PostgresConfig, PostgresPool};
use anchor_reputation::ReputationEngine;

use crate::config::IndexerConfig;
use crate::processors::{Pipeline, Processors};
use crate::rpc::{HttpLedgerClient, spawn_block_watcher};
use crate::sync::{PgCheckpoints, Synchronizer};

/// Default configuration file path, overridable via `ANCHOR_CONFIG`.
const DEFAULT_CONFIG_PATH: &str = "anchor-config.yaml";

/// Application entry point.
///
/// Initializes logging, loads and validates configuration, connects to
/// `PostgreSQL` and runs migrations, backfills the index, then tails new
/// blocks until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if initialization, the backfill, or the tail loop
/// fails. Transport failures are fatal; per-entry failures are logged
/// and skipped inside the synchronizer.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("anchor-indexer starting");

    let config_path =
        std::env::var("ANCHOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    let config = IndexerConfig::from_file(Path::new(&config_path))?;
    let sources = config.sources()?;
    info!(
        config_path,
        rpc_url = config.ledger.rpc_url,
        identity_contract = %sources.identity,
        agreements_contract = %sources.agreements,
        "configuration loaded"
    );

    let pg_config = PostgresConfig::new(&config.database.url)
        .with_max_connections(config.database.max_connections);
    let pool = PostgresPool::connect(&pg_config).await?;
    pool.run_migrations().await?;

    let client = HttpLedgerClient::new(&config.ledger.rpc_url);
    let pipeline = Pipeline::new(sources, Processors::new(pool.pool().clone()));
    let checkpoints = PgCheckpoints::new(pool.pool().clone());
    let synchronizer = Synchronizer::new(
        client.clone(),
        pipeline,
        checkpoints,
        [sources.identity, sources.agreements],
    );

    let head = synchronizer.backfill().await?;

    if config.reputation.sweep_after_backfill {
        let scored = ReputationEngine::new(pool.pool())
            .recalculate_all(head)
            .await?;
        info!(identities = scored, head, "post-backfill reputation sweep done");
    }

    let heads = spawn_block_watcher(
        client,
        head,
        Duration::from_millis(config.ledger.poll_interval_ms),
    );

    info!(head, "entering tail loop");
    synchronizer.run(heads, shutdown_signal()).await?;

    pool.close().await;
    info!("anchor-indexer stopped");
    Ok(())
}

/// Resolve when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => {
                tracing::error!("failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("SIGINT received"),
        () = terminate => info!("SIGTERM received"),
    }
}
