//! Payment Ledger - gateway entry point
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌────────────┐
//! │  Config  │───▶│ Postgres │───▶│ LedgerEngine │───▶│  Gateway   │
//! │  (YAML)  │    │  (pool)  │    │ (UoW + locks)│    │  (axum)    │
//! └──────────┘    └──────────┘    └──────────────┘    └────────────┘
//! ```
//!
//! Flags:
//! - `--env <name>`: load `config/<name>.yaml` (default `dev`)
//! - `--port <u16>`: override the gateway port
//! - `--seed <user_id>:<balance>`: provision a wallet before serving (repeatable)

use std::sync::Arc;

use anyhow::Context;

use payment_ledger::config::AppConfig;
use payment_ledger::db::Database;
use payment_ledger::gateway::{self, AppState};
use payment_ledger::ledger::{LedgerEngine, LedgerError, PgLedgerStore};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

fn parse_seed(value: &str) -> anyhow::Result<(String, i64)> {
    let (user_id, balance) = value
        .split_once(':')
        .with_context(|| format!("--seed expects <user_id>:<balance>, got '{}'", value))?;
    if user_id.is_empty() {
        anyhow::bail!("--seed user_id is empty in '{}'", value);
    }
    let balance = balance
        .parse()
        .with_context(|| format!("--seed balance is not an integer in '{}'", value))?;
    Ok((user_id.to_string(), balance))
}

fn get_seeds() -> anyhow::Result<Vec<(String, i64)>> {
    let args: Vec<String> = std::env::args().collect();
    let mut seeds = Vec::new();
    for i in 0..args.len() {
        if args[i] == "--seed" && i + 1 < args.len() {
            seeds.push(parse_seed(&args[i + 1])?);
        }
    }
    Ok(seeds)
}

async fn seed_wallets(store: &PgLedgerStore, seeds: &[(String, i64)]) -> anyhow::Result<()> {
    for (user_id, balance) in seeds {
        match store.create_wallet(user_id, *balance).await {
            Ok(wallet) => tracing::info!(
                user_id = %wallet.user_id,
                wallet_id = %wallet.id,
                balance = wallet.balance,
                "Seeded wallet"
            ),
            Err(LedgerError::InvalidRequest(msg)) => tracing::warn!("Seed skipped: {}", msg),
            Err(e) => return Err(e).with_context(|| format!("Failed to seed wallet {}", user_id)),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let seeds = get_seeds()?;

    let _log_guard = payment_ledger::logging::init_logging(&app_config);
    tracing::info!(
        "Starting Payment Ledger {} ({}) in {} mode",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env
    );

    let db = Database::connect(&app_config.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.health_check()
        .await
        .context("Failed to ping PostgreSQL")?;
    db.ensure_schema()
        .await
        .context("Failed to initialize schema")?;

    let store = Arc::new(PgLedgerStore::new(db.pool().clone()));
    seed_wallets(&store, &seeds).await?;

    let engine = Arc::new(LedgerEngine::new(store));
    gateway::run_server(&app_config.gateway, AppState::new(engine)).await?;

    tracing::info!("Payment Ledger stopped");
    Ok(())
}
