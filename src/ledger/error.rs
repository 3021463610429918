//! Ledger Error Types

use thiserror::Error;

/// Ledger error taxonomy
///
/// Business-rule violations are returned without retry. `StoreFailure`
/// covers I/O, lock acquisition, commit and unexpected constraint errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // === Validation Errors ===
    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("cannot transfer to the same user")]
    SameParty,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // === Idempotency Errors ===
    #[error("reference ID already exists: {0}")]
    DuplicateReference(String),

    // === Lookup Errors ===
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    // === Balance Errors ===
    #[error("insufficient balance")]
    InsufficientBalance,

    // === System Errors ===
    #[error("store failure: {0}")]
    StoreFailure(String),
}

impl LedgerError {
    pub fn wallet_not_found(user_id: &str) -> Self {
        LedgerError::NotFound {
            entity: "wallet",
            key: user_id.to_string(),
        }
    }

    pub fn transaction_not_found(reference: &str) -> Self {
        LedgerError::NotFound {
            entity: "transaction",
            key: reference.to_string(),
        }
    }

    /// Get the error code for API responses and logs
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount => "INVALID_AMOUNT",
            LedgerError::SameParty => "SAME_PARTY",
            LedgerError::InvalidRequest(_) => "INVALID_REQUEST",
            LedgerError::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            LedgerError::NotFound { .. } => "NOT_FOUND",
            LedgerError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            LedgerError::StoreFailure(_) => "STORE_FAILURE",
        }
    }

    /// Get HTTP status code suggestion for read paths.
    ///
    /// Write paths collapse `NotFound` into 400, see `gateway::handlers`.
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::InvalidAmount
            | LedgerError::SameParty
            | LedgerError::InvalidRequest(_)
            | LedgerError::DuplicateReference(_)
            | LedgerError::InsufficientBalance => 400,
            LedgerError::NotFound { .. } => 404,
            LedgerError::StoreFailure(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::StoreFailure(e.to_string())
    }
}
