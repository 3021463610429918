//! Payment Ledger
//!
//! Atomic wallet transfers and top-ups over PostgreSQL, behind a thin
//! HTTP gateway.
//!
//! # Modules
//!
//! - [`ledger`] - Engine, store contracts and backends
//! - [`db`] - PostgreSQL pool and schema bootstrap
//! - [`gateway`] - axum routes, handlers and OpenAPI docs
//! - [`config`] - YAML configuration with `DB_*` overrides
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use ledger::{
    InMemoryLedgerStore, LedgerEngine, LedgerError, LedgerService, LedgerStore, PgLedgerStore,
    TopUpReceipt, TopUpRequest, Transaction, TransactionStatus, TransferReceipt, TransferRequest,
    Wallet,
};
