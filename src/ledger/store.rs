//! Store contracts consumed by the ledger engine
//!
//! The engine only sees these traits. A backend picks its own `Scope` type;
//! every mutating call borrows that scope, so mutations outside an open
//! unit of work do not compile.
//!
//! ```text
//! begin() ──▶ lock / credit / delta / append ──▶ commit(scope)
//!                        │
//!                        └── any error ──▶ rollback(scope)
//! ```

use async_trait::async_trait;

use super::error::LedgerError;
use super::types::{Transaction, Wallet};

/// Atomic scope control.
///
/// `commit` and `rollback` consume the scope. A scope dropped without
/// commit must leave no durable effect.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Scope: Send;

    async fn begin(&self) -> Result<Self::Scope, LedgerError>;

    /// A failed commit discards the scope; the caller must not assume success.
    async fn commit(&self, scope: Self::Scope) -> Result<(), LedgerError>;

    async fn rollback(&self, scope: Self::Scope) -> Result<(), LedgerError>;
}

/// Wallet rows with an exclusive per-row lock.
#[async_trait]
pub trait WalletStore: UnitOfWork {
    /// Fetch the wallet and hold its row lock until the scope ends.
    async fn lock_wallet_for_update(
        &self,
        scope: &mut Self::Scope,
        user_id: &str,
    ) -> Result<Wallet, LedgerError>;

    /// Add `delta` to the balance and bump the version.
    ///
    /// Sufficiency is the caller's job.
    async fn apply_balance_delta(
        &self,
        scope: &mut Self::Scope,
        wallet_id: &str,
        delta: i64,
    ) -> Result<(), LedgerError>;

    /// Single conditional `+amount` update keyed by user. `NotFound` when no
    /// wallet matched.
    async fn credit_wallet(
        &self,
        scope: &mut Self::Scope,
        user_id: &str,
        amount: i64,
    ) -> Result<(), LedgerError>;

    /// Unlocked point read.
    async fn get_wallet_by_user(&self, user_id: &str) -> Result<Wallet, LedgerError>;
}

/// Append-only transaction records.
#[async_trait]
pub trait TransactionLog: UnitOfWork {
    /// Insert a record. `DuplicateReference` when the reference is taken,
    /// including by a concurrent uncommitted scope.
    async fn append(
        &self,
        scope: &mut Self::Scope,
        transaction: &Transaction,
    ) -> Result<(), LedgerError>;

    async fn find_by_reference(&self, reference: &str) -> Result<Transaction, LedgerError>;
}

/// Full capability set the engine needs.
pub trait LedgerStore: WalletStore + TransactionLog {}

impl<T: WalletStore + TransactionLog> LedgerStore for T {}
