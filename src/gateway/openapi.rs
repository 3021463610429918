//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::types::ErrorBody;
use crate::ledger::{
    TopUpReceipt, TopUpRequest, TransactionStatus, TransferReceipt, TransferRequest, Wallet,
};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payment Ledger API",
        version = "1.0.0",
        description = "Wallet transfers and top-ups with atomic, idempotent ledger records.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::liveness,
        crate::gateway::handlers::transfer,
        crate::gateway::handlers::top_up,
        crate::gateway::handlers::get_transaction,
        crate::gateway::handlers::get_wallet,
    ),
    components(
        schemas(
            TransferRequest,
            TransferReceipt,
            TopUpRequest,
            TopUpReceipt,
            TransactionStatus,
            Wallet,
            ErrorBody,
        )
    ),
    tags(
        (name = "Ledger", description = "Transfers, top-ups and lookups"),
        (name = "System", description = "Liveness")
    )
)]
pub struct ApiDoc;
