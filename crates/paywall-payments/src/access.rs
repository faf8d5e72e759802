//! Access Gating
//!
//! Decides whether a buyer may see a protected resource. The per-resource
//! slot is consulted first; whatever it holds is then checked against the
//! verifier, and stale slots are cleared.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{PaymentRequest, PaymentResponse, PaymentToken, ProtectedResource};
use crate::provider::PaymentProvider;
use crate::verifier::TokenVerifier;

/// Outcome of an access check
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum AccessDecision {
    /// Resource does not require payment
    Free,
    /// A valid token is held for the resource
    Granted { token: PaymentToken },
    /// HTTP 402: pay this much to get in
    PaymentRequired { price: Decimal, currency: String },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, AccessDecision::PaymentRequired { .. })
    }
}

/// Content gate combining a verifier and a payment provider
pub struct AccessGate {
    verifier: Arc<TokenVerifier>,
    provider: Arc<dyn PaymentProvider>,
}

impl AccessGate {
    pub fn new(verifier: Arc<TokenVerifier>, provider: Arc<dyn PaymentProvider>) -> Self {
        Self { verifier, provider }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Check whether the session already has access
    pub fn check_access(&self, resource: &ProtectedResource) -> Result<AccessDecision> {
        if !resource.requires_payment {
            return Ok(AccessDecision::Free);
        }

        if let Some(stored) = self.verifier.get_stored_token(&resource.id)? {
            let verification = self.verifier.verify_token(&stored, &resource.id);
            match verification.token {
                Some(token) if verification.is_valid => {
                    return Ok(AccessDecision::Granted { token });
                }
                _ => {
                    tracing::debug!(
                        resource_id = %resource.id,
                        reason = verification.error.as_deref().unwrap_or("invalid"),
                        "Clearing stale stored token"
                    );
                    self.verifier.clear_stored_token(&resource.id)?;
                }
            }
        }

        Ok(AccessDecision::PaymentRequired {
            price: resource.price,
            currency: resource.currency.clone(),
        })
    }

    /// Pay for a resource and, on success, remember the issued token.
    ///
    /// The token is indexed before its slot is written, so a failed slot
    /// write is logged and the payment response still returned.
    pub async fn purchase(&self, request: &PaymentRequest) -> PaymentResponse {
        let response = self.provider.process_payment(request).await;
        if let Some(token) = &response.token {
            if let Err(err) = self.grant(&request.resource_id, token.clone()) {
                tracing::warn!(
                    resource_id = %request.resource_id,
                    error = %err,
                    "Failed to save token to its slot"
                );
            }
        }
        response
    }

    /// Index a token and save it to the resource's slot
    pub fn grant(&self, resource_id: &str, token: PaymentToken) -> Result<()> {
        let value = token.token.clone();
        self.verifier.store_token(token);
        self.verifier.save_token_to_storage(resource_id, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::PaywallConfig;
    use crate::model::Resource;
    use crate::provider::StorePaymentProvider;
    use crate::storage::MemoryKeyValueStore;
    use crate::store::MemoryRecordStore;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn gate() -> (AccessGate, Arc<ManualClock>, ProtectedResource) {
        let resource = Resource::new("article-1", "Premium Article", dec!(9.99), "USD");
        let protected = resource.to_protected();
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryRecordStore::with_resources([resource]));
        let provider = Arc::new(StorePaymentProvider::new(
            &PaywallConfig::default(),
            store,
            clock.clone(),
        ));
        let verifier = Arc::new(TokenVerifier::new(clock.clone(), Arc::new(MemoryKeyValueStore::new())));
        (AccessGate::new(verifier, provider), clock, protected)
    }

    #[tokio::test]
    async fn test_free_resource() {
        let (gate, _, _) = gate();
        let free = Resource::new("free-1", "Free Article", dec!(0), "USD").to_protected();
        assert_eq!(gate.check_access(&free).unwrap(), AccessDecision::Free);
    }

    #[tokio::test]
    async fn test_purchase_grants_access() {
        let (gate, _, resource) = gate();
        assert_eq!(
            gate.check_access(&resource).unwrap(),
            AccessDecision::PaymentRequired { price: dec!(9.99), currency: "USD".into() }
        );

        let response = gate
            .purchase(&PaymentRequest::new("article-1", dec!(9.99), "USD"))
            .await;
        assert!(response.success);

        let decision = gate.check_access(&resource).unwrap();
        assert!(decision.is_allowed());
        assert_eq!(
            gate.verifier().get_stored_token("article-1").unwrap(),
            response.token.map(|t| t.token)
        );
    }

    #[tokio::test]
    async fn test_expired_slot_is_cleared() {
        let (gate, clock, resource) = gate();
        gate.purchase(&PaymentRequest::new("article-1", dec!(9.99), "USD"))
            .await;

        clock.advance(Duration::days(31));
        assert!(!gate.check_access(&resource).unwrap().is_allowed());
        assert!(gate.verifier().get_stored_token("article-1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_purchase_stores_nothing() {
        let (gate, _, resource) = gate();
        let response = gate
            .purchase(&PaymentRequest::new("article-1", dec!(5.00), "USD"))
            .await;
        assert!(!response.success);
        assert!(gate.verifier().is_empty());
        assert!(!gate.check_access(&resource).unwrap().is_allowed());
    }
}
