//! Application State

use std::sync::Arc;

use paywall_payments::{
    AccessGate, Clock, PaymentProvider, PaywallConfig, RecordStore, TokenVerifier,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment provider (store-backed or mock)
    pub provider: Arc<dyn PaymentProvider>,

    /// Token index and per-resource slots
    pub verifier: Arc<TokenVerifier>,

    /// Purchases and slot-backed access checks over `provider` and `verifier`
    pub gate: Arc<AccessGate>,

    /// Resources, transactions and payment records
    pub store: Arc<dyn RecordStore>,

    pub clock: Arc<dyn Clock>,

    pub config: Arc<PaywallConfig>,
}
