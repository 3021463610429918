//! Ledger HTTP handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use super::state::AppState;
use super::types::{ApiError, ApiResult, ErrorBody, ok};
use crate::ledger::{TopUpReceipt, TopUpRequest, TransferReceipt, TransferRequest, Wallet};

pub const LIVENESS_BODY: &str = "Payment Service is running";

fn decode<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(req)| req).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        ApiError::bad_request("invalid request body")
    })
}

/// Liveness probe
///
/// GET /
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service is running", body = String, content_type = "text/plain")
    ),
    tag = "System"
)]
pub async fn liveness() -> &'static str {
    LIVENESS_BODY
}

/// Transfer funds between two wallets
///
/// POST /transfer
#[utoipa::path(
    post,
    path = "/transfer",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer committed", body = TransferReceipt),
        (status = 400, description = "Invalid request, business rule violation or unknown wallet", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    ),
    tag = "Ledger"
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<TransferReceipt> {
    let req = decode(payload)?;
    tracing::info!(
        sender = %req.sender_id,
        receiver = %req.receiver_id,
        amount = req.amount,
        reference = %req.reference,
        "Transfer request"
    );

    match state.ledger.transfer(req).await {
        Ok(receipt) => ok(receipt),
        Err(e) => Err(ApiError::from_write(e)),
    }
}

/// Credit a wallet (not idempotent)
///
/// POST /topup
#[utoipa::path(
    post,
    path = "/topup",
    request_body = TopUpRequest,
    responses(
        (status = 200, description = "Top-up committed", body = TopUpReceipt),
        (status = 400, description = "Invalid amount or unknown wallet", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    ),
    tag = "Ledger"
)]
pub async fn top_up(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TopUpRequest>, JsonRejection>,
) -> ApiResult<TopUpReceipt> {
    let req = decode(payload)?;
    tracing::info!(user_id = %req.user_id, amount = req.amount, "Top-up request");

    match state.ledger.top_up(req).await {
        Ok(receipt) => ok(receipt),
        Err(e) => Err(ApiError::from_write(e)),
    }
}

/// Look up a transfer by reference
///
/// GET /transaction/{reference}
#[utoipa::path(
    get,
    path = "/transaction/{reference}",
    params(
        ("reference" = String, Path, description = "Caller-supplied transfer reference")
    ),
    responses(
        (status = 200, description = "Recorded transfer", body = TransferReceipt),
        (status = 404, description = "Transaction not found", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    ),
    tag = "Ledger"
)]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> ApiResult<TransferReceipt> {
    if reference.trim().is_empty() {
        return Err(ApiError::bad_request("reference ID is required"));
    }

    match state.ledger.get_transaction_by_reference(&reference).await {
        Ok(tx) => ok(TransferReceipt::from(tx)),
        Err(e) => Err(ApiError::from_read(e, "transaction not found")),
    }
}

/// Read a wallet by owning user
///
/// GET /wallet/{user_id}
#[utoipa::path(
    get,
    path = "/wallet/{user_id}",
    params(
        ("user_id" = String, Path, description = "Wallet owner")
    ),
    responses(
        (status = 200, description = "Wallet", body = Wallet),
        (status = 404, description = "Wallet not found", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    ),
    tag = "Ledger"
)]
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Wallet> {
    if user_id.trim().is_empty() {
        return Err(ApiError::bad_request("user ID is required"));
    }

    match state.ledger.get_wallet(&user_id).await {
        Ok(wallet) => ok(wallet),
        Err(e) => Err(ApiError::from_read(e, "wallet not found")),
    }
}
