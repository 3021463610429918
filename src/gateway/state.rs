use std::sync::Arc;

use crate::ledger::LedgerService;

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    /// Ledger engine behind its object-safe facade
    pub ledger: Arc<dyn LedgerService>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn LedgerService>) -> Self {
        Self { ledger }
    }
}
