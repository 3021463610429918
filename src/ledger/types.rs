//! Ledger data model and request/receipt DTOs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::error::LedgerError;

/// Per-user balance record.
///
/// `balance` is in minor currency units and is never negative in a committed
/// state. `version` increments on every balance mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Wallet {
    #[schema(example = "7f0c2a4e-6d1b-4c3f-9b1e-2a7d9c1e5f00")]
    pub id: String,
    #[schema(example = "alice")]
    pub user_id: String,
    #[schema(example = 1000)]
    pub balance: i64,
    #[schema(example = 3)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a recorded transaction.
///
/// Only `Completed` is produced today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(TransactionStatus::Completed),
            other => Err(LedgerError::StoreFailure(format!(
                "unknown transaction status: {}",
                other
            ))),
        }
    }
}

/// Immutable record of one completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Caller-supplied idempotency key, unique across all time
    pub reference: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: i64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a completed transaction with a fresh random id.
    ///
    /// `created_at` is truncated to microseconds, the precision of a
    /// `TIMESTAMPTZ` column, so the stored row reads back unchanged.
    pub fn completed(request: &TransferRequest) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            reference: request.reference.clone(),
            sender_id: request.sender_id.clone(),
            receiver_id: request.receiver_id.clone(),
            amount: request.amount,
            status: TransactionStatus::Completed,
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    #[schema(example = "alice")]
    pub sender_id: String,
    #[schema(example = "bob")]
    pub receiver_id: String,
    /// Minor currency units, must be positive
    #[schema(example = 300)]
    pub amount: i64,
    /// Idempotency key
    #[schema(example = "ref-1")]
    pub reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopUpRequest {
    #[schema(example = "alice")]
    pub user_id: String,
    #[schema(example = 500)]
    pub amount: i64,
}

// ============================================================================
// Receipts
// ============================================================================

/// Result of a transfer; also the shape returned for transaction lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferReceipt {
    pub transaction_id: String,
    #[schema(example = "ref-1")]
    pub reference: String,
    #[schema(example = 300)]
    pub amount: i64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransferReceipt {
    fn from(tx: Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            reference: tx.reference,
            amount: tx.amount,
            status: tx.status,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TopUpReceipt {
    #[schema(example = "alice")]
    pub user_id: String,
    #[schema(example = 500)]
    pub amount: i64,
    #[schema(example = 1500)]
    pub new_balance: i64,
}
