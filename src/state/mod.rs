use std::sync::Arc;
use std::time::Instant;

use crate::auth::AuthService;
use crate::config::WithdrawalConfig;
use crate::ledger::Ledger;
use crate::payments::{PaymentGateway, WebhookVerifier};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub auth: AuthService,
    pub payments: Arc<dyn PaymentGateway>,
    pub webhooks: Arc<WebhookVerifier>,
    pub withdrawals: WithdrawalConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        ledger: Ledger,
        auth: AuthService,
        payments: Arc<dyn PaymentGateway>,
        webhooks: Arc<WebhookVerifier>,
        withdrawals: WithdrawalConfig,
    ) -> Self {
        Self {
            ledger,
            auth,
            payments,
            webhooks,
            withdrawals,
            start_time: Instant::now(),
        }
    }
}
