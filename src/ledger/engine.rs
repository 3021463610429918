//! Ledger Engine
//!
//! Orchestrates transfers and top-ups over a [`LedgerStore`].
//!
//! # Safety Invariants
//!
//! 1. **Lock-Then-Check**: the sender balance is checked on the locked row,
//!    never on an unlocked read.
//! 2. **Canonical Lock Order**: both wallets of a transfer are locked in
//!    ascending user id order, whatever their roles. When the sender sorts
//!    first its balance is checked before the receiver is locked.
//! 3. **Rollback On Every Error**: once a scope is open, any error rolls it
//!    back before being returned.
//! 4. **Reference Uniqueness**: the pre-flight lookup is advisory; the
//!    store's append is the authoritative duplicate check.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::LedgerError;
use super::store::LedgerStore;
use super::types::{
    TopUpReceipt, TopUpRequest, Transaction, TransferReceipt, TransferRequest, Wallet,
};

pub struct LedgerEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for LedgerEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

fn require_id(field: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidRequest(format!("{} is required", field)));
    }
    Ok(())
}

impl<S: LedgerStore> LedgerEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Move `amount` from sender to receiver and record it under `reference`.
    pub async fn transfer(&self, req: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        // 1. Validation (no store access)
        if req.amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        require_id("sender_id", &req.sender_id)?;
        require_id("receiver_id", &req.receiver_id)?;
        require_id("reference", &req.reference)?;
        if req.sender_id == req.receiver_id {
            return Err(LedgerError::SameParty);
        }

        // 2. Pre-flight idempotency check
        match self.store.find_by_reference(&req.reference).await {
            Ok(_) => {
                tracing::warn!(reference = %req.reference, "Transfer rejected: reference already recorded");
                return Err(LedgerError::DuplicateReference(req.reference));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                // Advisory only; append still enforces uniqueness.
                tracing::warn!(reference = %req.reference, error = %e, "Pre-flight reference lookup failed");
            }
        }

        // 3. Unit of work
        let mut scope = self.store.begin().await?;
        let transaction = match self.transfer_in_scope(&mut scope, &req).await {
            Ok(tx) => tx,
            Err(e) => {
                self.abandon(scope, "transfer", &e).await;
                return Err(e);
            }
        };
        if let Err(e) = self.store.commit(scope).await {
            tracing::error!(reference = %req.reference, error = %e, "Transfer commit failed");
            return Err(e);
        }

        tracing::info!(
            transaction_id = %transaction.id,
            reference = %transaction.reference,
            sender = %transaction.sender_id,
            receiver = %transaction.receiver_id,
            amount = transaction.amount,
            "Transfer committed"
        );
        Ok(transaction.into())
    }

    async fn transfer_in_scope(
        &self,
        scope: &mut S::Scope,
        req: &TransferRequest,
    ) -> Result<Transaction, LedgerError> {
        let sender_first = req.sender_id < req.receiver_id;
        let (first_id, second_id) = if sender_first {
            (&req.sender_id, &req.receiver_id)
        } else {
            (&req.receiver_id, &req.sender_id)
        };

        let first = self.store.lock_wallet_for_update(scope, first_id).await?;
        // Sender first: check funds before the receiver is looked at.
        if sender_first && first.balance < req.amount {
            return Err(LedgerError::InsufficientBalance);
        }
        let second = self.store.lock_wallet_for_update(scope, second_id).await?;
        let (sender, receiver) = if sender_first {
            (first, second)
        } else {
            (second, first)
        };

        if !sender_first && sender.balance < req.amount {
            return Err(LedgerError::InsufficientBalance);
        }

        self.store
            .apply_balance_delta(scope, &sender.id, -req.amount)
            .await?;
        self.store
            .apply_balance_delta(scope, &receiver.id, req.amount)
            .await?;

        let transaction = Transaction::completed(req);
        self.store.append(scope, &transaction).await?;
        Ok(transaction)
    }

    /// Credit a wallet. Not idempotent: every call is a new credit.
    pub async fn top_up(&self, req: TopUpRequest) -> Result<TopUpReceipt, LedgerError> {
        if req.amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        require_id("user_id", &req.user_id)?;

        let mut scope = self.store.begin().await?;
        let wallet = match self.top_up_in_scope(&mut scope, &req).await {
            Ok(wallet) => wallet,
            Err(e) => {
                self.abandon(scope, "top-up", &e).await;
                return Err(e);
            }
        };
        if let Err(e) = self.store.commit(scope).await {
            tracing::error!(user_id = %req.user_id, error = %e, "Top-up commit failed");
            return Err(e);
        }

        tracing::info!(
            user_id = %req.user_id,
            amount = req.amount,
            balance = wallet.balance,
            "Top-up committed"
        );
        Ok(TopUpReceipt {
            user_id: req.user_id,
            amount: req.amount,
            new_balance: wallet.balance,
        })
    }

    async fn top_up_in_scope(
        &self,
        scope: &mut S::Scope,
        req: &TopUpRequest,
    ) -> Result<Wallet, LedgerError> {
        self.store
            .credit_wallet(scope, &req.user_id, req.amount)
            .await?;
        self.store.lock_wallet_for_update(scope, &req.user_id).await
    }

    pub async fn get_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Transaction, LedgerError> {
        self.store.find_by_reference(reference).await
    }

    pub async fn get_wallet(&self, user_id: &str) -> Result<Wallet, LedgerError> {
        self.store.get_wallet_by_user(user_id).await
    }

    async fn abandon(&self, scope: S::Scope, op: &str, cause: &LedgerError) {
        match cause {
            LedgerError::StoreFailure(_) => {
                tracing::error!(op, error = %cause, "Operation failed, rolling back")
            }
            _ => tracing::warn!(op, code = cause.code(), error = %cause, "Operation rejected"),
        }
        if let Err(e) = self.store.rollback(scope).await {
            tracing::error!(op, error = %e, "Rollback failed");
        }
    }
}

/// Object-safe view of the engine for the HTTP gateway.
#[async_trait]
pub trait LedgerService: Send + Sync {
    async fn transfer(&self, req: TransferRequest) -> Result<TransferReceipt, LedgerError>;
    async fn top_up(&self, req: TopUpRequest) -> Result<TopUpReceipt, LedgerError>;
    async fn get_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Transaction, LedgerError>;
    async fn get_wallet(&self, user_id: &str) -> Result<Wallet, LedgerError>;
}

#[async_trait]
impl<S: LedgerStore + 'static> LedgerService for LedgerEngine<S> {
    async fn transfer(&self, req: TransferRequest) -> Result<TransferReceipt, LedgerError> {
        LedgerEngine::transfer(self, req).await
    }

    async fn top_up(&self, req: TopUpRequest) -> Result<TopUpReceipt, LedgerError> {
        LedgerEngine::top_up(self, req).await
    }

    async fn get_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Transaction, LedgerError> {
        LedgerEngine::get_transaction_by_reference(self, reference).await
    }

    async fn get_wallet(&self, user_id: &str) -> Result<Wallet, LedgerError> {
        LedgerEngine::get_wallet(self, user_id).await
    }
}
