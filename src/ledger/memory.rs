//! In-process ledger backend
//!
//! Keeps the same locking contract as the PostgreSQL backend: each wallet
//! row has its own async mutex, held by a scope from first touch until the
//! scope ends. Mutations are staged in the scope and published atomically
//! on commit. References are reserved on append so a concurrent scope with
//! the same reference fails with `DuplicateReference`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use super::error::LedgerError;
use super::store::{TransactionLog, UnitOfWork, WalletStore};
use super::types::{Transaction, Wallet};

#[derive(Debug, Default)]
struct Tables {
    /// user_id -> wallet
    wallets: HashMap<String, Wallet>,
    /// wallet id -> user_id
    wallet_owners: HashMap<String, String>,
    /// reference -> committed transaction
    transactions: HashMap<String, Transaction>,
    /// references appended by scopes that have not ended yet
    reserved_references: HashSet<String>,
}

type SharedTables = Arc<Mutex<Tables>>;

fn lock_tables(tables: &SharedTables) -> MutexGuard<'_, Tables> {
    // Every critical section leaves Tables consistent before it can panic.
    tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory wallet store and transaction log.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: SharedTables,
    row_locks: DashMap<String, Arc<RowLock<()>>>,
}

/// Open unit of work against [`InMemoryLedgerStore`].
///
/// Dropping it without commit releases its row locks and reserved
/// references and discards staged changes.
pub struct MemoryScope {
    tables: SharedTables,
    /// user_id -> row lock guard
    held: HashMap<String, OwnedMutexGuard<()>>,
    /// user_id -> (balance delta, version bumps)
    deltas: HashMap<String, (i64, i64)>,
    appended: Vec<Transaction>,
}

impl MemoryScope {
    fn new(tables: SharedTables) -> Self {
        Self {
            tables,
            held: HashMap::new(),
            deltas: HashMap::new(),
            appended: Vec::new(),
        }
    }

    /// Wallet as seen from inside this scope.
    fn staged_view(&self, mut wallet: Wallet) -> Wallet {
        if let Some((delta, bumps)) = self.deltas.get(&wallet.user_id) {
            wallet.balance += delta;
            wallet.version += bumps;
        }
        wallet
    }

    fn stage_delta(&mut self, user_id: &str, delta: i64) -> Result<(), LedgerError> {
        let entry = self.deltas.entry(user_id.to_string()).or_insert((0, 0));
        entry.0 = entry
            .0
            .checked_add(delta)
            .ok_or_else(|| LedgerError::StoreFailure("balance delta overflow".into()))?;
        entry.1 += 1;
        Ok(())
    }
}

impl Drop for MemoryScope {
    fn drop(&mut self) {
        if self.appended.is_empty() {
            return;
        }
        let mut tables = lock_tables(&self.tables);
        for tx in &self.appended {
            tables.reserved_references.remove(&tx.reference);
        }
    }
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a wallet out of band.
    pub fn create_wallet(&self, user_id: &str, opening_balance: i64) -> Result<Wallet, LedgerError> {
        if opening_balance < 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let mut tables = lock_tables(&self.tables);
        if tables.wallets.contains_key(user_id) {
            return Err(LedgerError::InvalidRequest(format!(
                "wallet already exists for user {}",
                user_id
            )));
        }

        let now = Utc::now();
        let wallet = Wallet {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            balance: opening_balance,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        // Row lock entries exist only for provisioned wallets.
        self.row_locks
            .insert(user_id.to_string(), Arc::new(RowLock::new(())));
        tables
            .wallet_owners
            .insert(wallet.id.clone(), user_id.to_string());
        tables.wallets.insert(user_id.to_string(), wallet.clone());
        Ok(wallet)
    }

    /// Take the row lock for `user_id` unless the scope already holds it.
    ///
    /// Unknown users fail with `NotFound` without touching the lock table.
    async fn acquire_row(
        &self,
        scope: &mut MemoryScope,
        user_id: &str,
    ) -> Result<(), LedgerError> {
        if scope.held.contains_key(user_id) {
            return Ok(());
        }
        let row = self
            .row_locks
            .get(user_id)
            .map(|row| row.value().clone())
            .ok_or_else(|| LedgerError::wallet_not_found(user_id))?;
        let guard = row.lock_owned().await;
        scope.held.insert(user_id.to_string(), guard);
        Ok(())
    }

    fn publish(tables: &mut Tables, scope: &mut MemoryScope) -> Result<(), LedgerError> {
        // Validate everything before touching any row.
        let mut updates = Vec::with_capacity(scope.deltas.len());
        for (user_id, (delta, bumps)) in &scope.deltas {
            let wallet = tables
                .wallets
                .get(user_id)
                .ok_or_else(|| LedgerError::wallet_not_found(user_id))?;
            let balance = wallet
                .balance
                .checked_add(*delta)
                .ok_or_else(|| LedgerError::StoreFailure("balance overflow".into()))?;
            if balance < 0 {
                return Err(LedgerError::StoreFailure(format!(
                    "balance check violated for wallet {}",
                    wallet.id
                )));
            }
            updates.push((user_id.clone(), balance, *bumps));
        }

        let now = Utc::now();
        for (user_id, balance, bumps) in updates {
            if let Some(wallet) = tables.wallets.get_mut(&user_id) {
                wallet.balance = balance;
                wallet.version += bumps;
                wallet.updated_at = now;
            }
        }
        for tx in scope.appended.drain(..) {
            tables.reserved_references.remove(&tx.reference);
            tables.transactions.insert(tx.reference.clone(), tx);
        }
        scope.deltas.clear();
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryLedgerStore {
    type Scope = MemoryScope;

    async fn begin(&self) -> Result<MemoryScope, LedgerError> {
        Ok(MemoryScope::new(self.tables.clone()))
    }

    async fn commit(&self, mut scope: MemoryScope) -> Result<(), LedgerError> {
        let mut tables = lock_tables(&self.tables);
        let result = Self::publish(&mut tables, &mut scope);
        drop(tables);
        // Row locks are released here, after the new state is visible.
        drop(scope);
        result
    }

    async fn rollback(&self, scope: MemoryScope) -> Result<(), LedgerError> {
        drop(scope);
        Ok(())
    }
}

#[async_trait]
impl WalletStore for InMemoryLedgerStore {
    async fn lock_wallet_for_update(
        &self,
        scope: &mut MemoryScope,
        user_id: &str,
    ) -> Result<Wallet, LedgerError> {
        self.acquire_row(scope, user_id).await?;
        let wallet = lock_tables(&self.tables)
            .wallets
            .get(user_id)
            .cloned()
            .ok_or_else(|| LedgerError::wallet_not_found(user_id))?;
        Ok(scope.staged_view(wallet))
    }

    async fn apply_balance_delta(
        &self,
        scope: &mut MemoryScope,
        wallet_id: &str,
        delta: i64,
    ) -> Result<(), LedgerError> {
        let owner = lock_tables(&self.tables)
            .wallet_owners
            .get(wallet_id)
            .cloned()
            .ok_or(LedgerError::NotFound {
                entity: "wallet",
                key: wallet_id.to_string(),
            })?;
        self.acquire_row(scope, &owner).await?;
        scope.stage_delta(&owner, delta)
    }

    async fn credit_wallet(
        &self,
        scope: &mut MemoryScope,
        user_id: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        self.acquire_row(scope, user_id).await?;
        scope.stage_delta(user_id, amount)
    }

    async fn get_wallet_by_user(&self, user_id: &str) -> Result<Wallet, LedgerError> {
        lock_tables(&self.tables)
            .wallets
            .get(user_id)
            .cloned()
            .ok_or_else(|| LedgerError::wallet_not_found(user_id))
    }
}

#[async_trait]
impl TransactionLog for InMemoryLedgerStore {
    async fn append(
        &self,
        scope: &mut MemoryScope,
        transaction: &Transaction,
    ) -> Result<(), LedgerError> {
        let mut tables = lock_tables(&self.tables);
        let reference = &transaction.reference;
        if tables.transactions.contains_key(reference)
            || tables.reserved_references.contains(reference)
        {
            return Err(LedgerError::DuplicateReference(reference.clone()));
        }
        tables.reserved_references.insert(reference.clone());
        drop(tables);
        scope.appended.push(transaction.clone());
        Ok(())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Transaction, LedgerError> {
        lock_tables(&self.tables)
            .transactions
            .get(reference)
            .cloned()
            .ok_or_else(|| LedgerError::transaction_not_found(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::TransferRequest;
    use std::time::Duration;

    fn transaction(reference: &str) -> Transaction {
        Transaction::completed(&TransferRequest {
            sender_id: "alice".into(),
            receiver_id: "bob".into(),
            amount: 10,
            reference: reference.into(),
        })
    }

    #[tokio::test]
    async fn test_create_wallet_rejects_duplicate_and_negative() {
        let store = InMemoryLedgerStore::new();
        store.create_wallet("alice", 100).unwrap();

        assert!(matches!(
            store.create_wallet("alice", 5),
            Err(LedgerError::InvalidRequest(_))
        ));
        assert_eq!(
            store.create_wallet("bob", -1),
            Err(LedgerError::InvalidAmount)
        );
    }

    #[tokio::test]
    async fn test_staged_changes_invisible_until_commit() {
        let store = InMemoryLedgerStore::new();
        let wallet = store.create_wallet("alice", 100).unwrap();

        let mut scope = store.begin().await.unwrap();
        store
            .apply_balance_delta(&mut scope, &wallet.id, -40)
            .await
            .unwrap();

        // Read-your-writes inside the scope
        let inside = store
            .lock_wallet_for_update(&mut scope, "alice")
            .await
            .unwrap();
        assert_eq!(inside.balance, 60);
        assert_eq!(inside.version, 1);

        // Unchanged outside
        assert_eq!(store.get_wallet_by_user("alice").await.unwrap().balance, 100);

        store.commit(scope).await.unwrap();
        let after = store.get_wallet_by_user("alice").await.unwrap();
        assert_eq!(after.balance, 60);
        assert_eq!(after.version, 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_changes() {
        let store = InMemoryLedgerStore::new();
        store.create_wallet("alice", 100).unwrap();

        let mut scope = store.begin().await.unwrap();
        store.credit_wallet(&mut scope, "alice", 50).await.unwrap();
        store.append(&mut scope, &transaction("r1")).await.unwrap();
        store.rollback(scope).await.unwrap();

        let wallet = store.get_wallet_by_user("alice").await.unwrap();
        assert_eq!(wallet.balance, 100);
        assert_eq!(wallet.version, 0);
        assert!(store.find_by_reference("r1").await.unwrap_err().is_not_found());

        // Reservation released
        let mut scope = store.begin().await.unwrap();
        store.append(&mut scope, &transaction("r1")).await.unwrap();
        store.commit(scope).await.unwrap();
        assert!(store.find_by_reference("r1").await.is_ok());
    }

    #[tokio::test]
    async fn test_append_conflicts_with_open_scope() {
        let store = InMemoryLedgerStore::new();

        let mut first = store.begin().await.unwrap();
        store.append(&mut first, &transaction("r1")).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let err = store.append(&mut second, &transaction("r1")).await.unwrap_err();
        assert_eq!(err, LedgerError::DuplicateReference("r1".into()));

        store.commit(first).await.unwrap();
        let mut third = store.begin().await.unwrap();
        let err = store.append(&mut third, &transaction("r1")).await.unwrap_err();
        assert_eq!(err, LedgerError::DuplicateReference("r1".into()));
    }

    #[tokio::test]
    async fn test_commit_rejects_negative_balance() {
        let store = InMemoryLedgerStore::new();
        let wallet = store.create_wallet("alice", 10).unwrap();

        let mut scope = store.begin().await.unwrap();
        store
            .apply_balance_delta(&mut scope, &wallet.id, -11)
            .await
            .unwrap();
        store.append(&mut scope, &transaction("r1")).await.unwrap();
        let err = store.commit(scope).await.unwrap_err();
        assert!(matches!(err, LedgerError::StoreFailure(_)));

        assert_eq!(store.get_wallet_by_user("alice").await.unwrap().balance, 10);
        // Failed commit released the reservation
        assert!(store.find_by_reference("r1").await.unwrap_err().is_not_found());
        let mut scope = store.begin().await.unwrap();
        assert!(store.append(&mut scope, &transaction("r1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_wallet_does_not_keep_lock() {
        let store = InMemoryLedgerStore::new();
        let mut scope = store.begin().await.unwrap();

        let err = store
            .lock_wallet_for_update(&mut scope, "ghost")
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::wallet_not_found("ghost"));
        assert!(scope.held.is_empty());

        let err = store.credit_wallet(&mut scope, "ghost", 5).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_users_do_not_grow_lock_table() {
        let store = InMemoryLedgerStore::new();
        store.create_wallet("alice", 100).unwrap();

        for i in 0..1000 {
            let mut scope = store.begin().await.unwrap();
            let user_id = format!("ghost-{}", i);
            assert!(
                store
                    .lock_wallet_for_update(&mut scope, &user_id)
                    .await
                    .unwrap_err()
                    .is_not_found()
            );
            assert!(
                store
                    .credit_wallet(&mut scope, &user_id, 1)
                    .await
                    .unwrap_err()
                    .is_not_found()
            );
            store.rollback(scope).await.unwrap();
        }

        assert_eq!(store.row_locks.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_row_lock_blocks_second_scope() {
        let store = Arc::new(InMemoryLedgerStore::new());
        store.create_wallet("alice", 100).unwrap();

        let mut holder = store.begin().await.unwrap();
        store
            .lock_wallet_for_update(&mut holder, "alice")
            .await
            .unwrap();

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut scope = store.begin().await.unwrap();
                let wallet = store
                    .lock_wallet_for_update(&mut scope, "alice")
                    .await
                    .unwrap();
                store.rollback(scope).await.unwrap();
                wallet
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished(), "second scope must wait for the lock");

        store.credit_wallet(&mut holder, "alice", 25).await.unwrap();
        store.commit(holder).await.unwrap();

        let seen = contender.await.unwrap();
        assert_eq!(seen.balance, 125, "waiter sees the committed balance");
    }
}
