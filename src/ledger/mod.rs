//! Wallet Ledger
//!
//! Moves money between user wallets and records each movement once, under a
//! caller-supplied reference.
//!
//! # Architecture
//!
//! ```text
//! gateway ──▶ LedgerEngine ──▶ UnitOfWork ──▶ { WalletStore, TransactionLog }
//!                                   │
//!                          commit / rollback
//! ```
//!
//! The engine depends only on the [`store`] traits. Two backends ship:
//! - [`postgres::PgLedgerStore`]: `SELECT ... FOR UPDATE` row locks, unique
//!   constraint on the reference
//! - [`memory::InMemoryLedgerStore`]: per-wallet async mutexes, staged
//!   writes published on commit

pub mod engine;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod types;

pub use engine::{LedgerEngine, LedgerService};
pub use error::LedgerError;
pub use memory::{InMemoryLedgerStore, MemoryScope};
pub use postgres::PgLedgerStore;
pub use store::{LedgerStore, TransactionLog, UnitOfWork, WalletStore};
pub use types::{
    TopUpReceipt, TopUpRequest, Transaction, TransactionStatus, TransferReceipt, TransferRequest,
    Wallet,
};
