//! PostgreSQL ledger backend
//!
//! Row locks are `SELECT ... FOR UPDATE`; the unit of work is a sqlx
//! transaction, which rolls back when dropped uncommitted. Reference
//! uniqueness is the `transactions_reference_id_key` constraint.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};

use super::error::LedgerError;
use super::store::{TransactionLog, UnitOfWork, WalletStore};
use super::types::{Transaction, Wallet};
use crate::db::schema::REFERENCE_UNIQUE_CONSTRAINT;

const WALLET_COLUMNS: &str = "id, user_id, balance, version, created_at, updated_at";

/// Wallet store and transaction log over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Provision a wallet out of band.
    pub async fn create_wallet(
        &self,
        user_id: &str,
        opening_balance: i64,
    ) -> Result<Wallet, LedgerError> {
        if opening_balance < 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let query = format!(
            "INSERT INTO wallets (id, user_id, balance, version, created_at, updated_at)
             VALUES ($1, $2, $3, 0, NOW(), NOW())
             ON CONFLICT (user_id) DO NOTHING
             RETURNING {}",
            WALLET_COLUMNS
        );
        sqlx::query_as::<_, Wallet>(&query)
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(opening_balance)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                LedgerError::InvalidRequest(format!("wallet already exists for user {}", user_id))
            })
    }

    fn row_to_transaction(row: &PgRow) -> Result<Transaction, LedgerError> {
        let status: String = row.try_get("status")?;
        Ok(Transaction {
            id: row.try_get("id")?,
            reference: row.try_get("reference_id")?,
            sender_id: row.try_get("sender_id")?,
            receiver_id: row.try_get("receiver_id")?,
            amount: row.try_get("amount")?,
            status: status.parse()?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl UnitOfWork for PgLedgerStore {
    type Scope = sqlx::Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Scope, LedgerError> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, scope: Self::Scope) -> Result<(), LedgerError> {
        scope.commit().await?;
        Ok(())
    }

    async fn rollback(&self, scope: Self::Scope) -> Result<(), LedgerError> {
        scope.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl WalletStore for PgLedgerStore {
    async fn lock_wallet_for_update(
        &self,
        scope: &mut Self::Scope,
        user_id: &str,
    ) -> Result<Wallet, LedgerError> {
        let query = format!(
            "SELECT {} FROM wallets WHERE user_id = $1 FOR UPDATE",
            WALLET_COLUMNS
        );
        sqlx::query_as::<_, Wallet>(&query)
            .bind(user_id)
            .fetch_optional(&mut **scope)
            .await?
            .ok_or_else(|| LedgerError::wallet_not_found(user_id))
    }

    async fn apply_balance_delta(
        &self,
        scope: &mut Self::Scope,
        wallet_id: &str,
        delta: i64,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query(
            "UPDATE wallets SET balance = balance + $1, version = version + 1, updated_at = NOW()
             WHERE id = $2",
        )
        .bind(delta)
        .bind(wallet_id)
        .execute(&mut **scope)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound {
                entity: "wallet",
                key: wallet_id.to_string(),
            });
        }
        Ok(())
    }

    async fn credit_wallet(
        &self,
        scope: &mut Self::Scope,
        user_id: &str,
        amount: i64,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query(
            "UPDATE wallets SET balance = balance + $1, version = version + 1, updated_at = NOW()
             WHERE user_id = $2",
        )
        .bind(amount)
        .bind(user_id)
        .execute(&mut **scope)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::wallet_not_found(user_id));
        }
        Ok(())
    }

    async fn get_wallet_by_user(&self, user_id: &str) -> Result<Wallet, LedgerError> {
        let query = format!("SELECT {} FROM wallets WHERE user_id = $1", WALLET_COLUMNS);
        sqlx::query_as::<_, Wallet>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| LedgerError::wallet_not_found(user_id))
    }
}

#[async_trait]
impl TransactionLog for PgLedgerStore {
    async fn append(
        &self,
        scope: &mut Self::Scope,
        transaction: &Transaction,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO transactions
                (id, reference_id, sender_id, receiver_id, amount, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&transaction.id)
        .bind(&transaction.reference)
        .bind(&transaction.sender_id)
        .bind(&transaction.receiver_id)
        .bind(transaction.amount)
        .bind(transaction.status.as_str())
        .bind(transaction.created_at)
        .execute(&mut **scope)
        .await
        .map_err(|e| {
            let duplicate = matches!(
                &e,
                sqlx::Error::Database(db_err)
                    if db_err.constraint() == Some(REFERENCE_UNIQUE_CONSTRAINT)
            );
            if duplicate {
                LedgerError::DuplicateReference(transaction.reference.clone())
            } else {
                LedgerError::from(e)
            }
        })?;
        Ok(())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Transaction, LedgerError> {
        let row = sqlx::query(
            "SELECT id, reference_id, sender_id, receiver_id, amount, status, created_at
             FROM transactions
             WHERE reference_id = $1",
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_transaction(&row),
            None => Err(LedgerError::transaction_not_found(reference)),
        }
    }
}
