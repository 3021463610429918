//! PostgreSQL schema for the ledger
//!
//! Statements are idempotent and executed one by one at startup.

use sqlx::PgPool;

/// Name of the unique constraint guarding transfer references
pub const REFERENCE_UNIQUE_CONSTRAINT: &str = "transactions_reference_id_key";

pub const CREATE_WALLETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS wallets (
    id          TEXT        PRIMARY KEY,
    user_id     TEXT        NOT NULL UNIQUE,
    balance     BIGINT      NOT NULL DEFAULT 0 CHECK (balance >= 0),
    version     BIGINT      NOT NULL DEFAULT 0,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id           TEXT        PRIMARY KEY,
    reference_id TEXT        NOT NULL,
    sender_id    TEXT        NOT NULL,
    receiver_id  TEXT        NOT NULL,
    amount       BIGINT      NOT NULL CHECK (amount > 0),
    status       TEXT        NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT transactions_reference_id_key UNIQUE (reference_id)
)
"#;

pub const CREATE_TRANSACTIONS_SENDER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_transactions_sender ON transactions (sender_id)";

pub const CREATE_TRANSACTIONS_RECEIVER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_transactions_receiver ON transactions (receiver_id)";

const STATEMENTS: [(&str, &str); 4] = [
    ("wallets table", CREATE_WALLETS_TABLE),
    ("transactions table", CREATE_TRANSACTIONS_TABLE),
    ("transactions sender index", CREATE_TRANSACTIONS_SENDER_INDEX),
    ("transactions receiver index", CREATE_TRANSACTIONS_RECEIVER_INDEX),
];

/// Create ledger tables and indexes if missing
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Initializing ledger schema...");
    for (name, statement) in STATEMENTS {
        sqlx::query(statement).execute(pool).await.inspect_err(|e| {
            tracing::error!("Failed to create {}: {}", name, e);
        })?;
    }
    tracing::info!("Ledger schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_constraint_is_declared() {
        assert!(CREATE_TRANSACTIONS_TABLE.contains(REFERENCE_UNIQUE_CONSTRAINT));
    }

    #[test]
    fn test_balance_check_is_declared() {
        assert!(CREATE_WALLETS_TABLE.contains("CHECK (balance >= 0)"));
        assert!(CREATE_WALLETS_TABLE.contains("user_id     TEXT        NOT NULL UNIQUE"));
    }
}
