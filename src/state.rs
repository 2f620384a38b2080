use std::sync::Arc;

use crate::ledger::Ledger;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(ledger: Ledger, jwt_secret: &str) -> Self {
        Self { ledger: Arc::new(ledger), jwt_secret: Arc::from(jwt_secret) }
    }
}
