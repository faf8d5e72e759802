//! Mock Payment Provider
//!
//! For offline and demo use. No record store: outcomes are random with a
//! configured success rate, and tokens live for the mock token TTL. Outcomes
//! are remembered in memory for `verify_payment`, bounded to the most recent
//! [`MAX_REMEMBERED_PAYMENTS`].

use async_trait::async_trait;
use chrono::Duration;
use parking_lot::RwLock;
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::{PaymentProvider, check_amount};
use crate::clock::Clock;
use crate::config::PaywallConfig;
use crate::error::{ErrorCode, Result};
use crate::model::{PaymentRequest, PaymentResponse, PaymentStatus, PaymentToken};
use crate::token::random_base36;

/// Default number of payment outcomes kept for verification
pub const MAX_REMEMBERED_PAYMENTS: usize = 10_000;

/// Payment outcomes by id, oldest evicted first once over capacity
#[derive(Default)]
struct PaymentLog {
    by_id: HashMap<String, PaymentResponse>,
    order: VecDeque<String>,
}

impl PaymentLog {
    fn remember(&mut self, response: PaymentResponse, capacity: usize) {
        let id = response.payment_id.clone();
        if self.by_id.insert(id.clone(), response).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.by_id.remove(&oldest);
            }
        }
    }
}

/// Mock provider with simulated latency and outcomes
pub struct MockPaymentProvider {
    clock: Arc<dyn Clock>,
    token_ttl: Duration,
    processing_delay: std::time::Duration,
    success_rate: f64,
    /// Known prices; unknown resources are accepted as-is
    catalog: HashMap<String, Decimal>,
    payments: RwLock<PaymentLog>,
    payment_capacity: usize,
}

impl MockPaymentProvider {
    pub fn new(config: &PaywallConfig, clock: Arc<dyn Clock>) -> Self {
        tracing::info!(
            environment = config.environment.as_str(),
            success_rate = config.success_rate,
            "Mock payment provider initialized"
        );

        Self {
            clock,
            token_ttl: config.mock_token_ttl,
            processing_delay: config.processing_delay,
            success_rate: sanitize_rate(config.success_rate),
            catalog: HashMap::new(),
            payments: RwLock::new(PaymentLog::default()),
            payment_capacity: MAX_REMEMBERED_PAYMENTS,
        }
    }

    /// Register resource prices so underpayments are rejected
    pub fn with_catalog(mut self, prices: impl IntoIterator<Item = (String, Decimal)>) -> Self {
        self.catalog.extend(prices);
        self
    }

    /// Override the success probability (clamped to 0..=1)
    pub fn with_success_rate(mut self, rate: f64) -> Self {
        self.success_rate = sanitize_rate(rate);
        self
    }

    /// Keep at most `capacity` payment outcomes (at least one)
    pub fn with_payment_capacity(mut self, capacity: usize) -> Self {
        self.payment_capacity = capacity.max(1);
        self
    }

    /// Number of remembered payments
    pub fn payment_count(&self) -> usize {
        self.payments.read().by_id.len()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn process_payment(&self, request: &PaymentRequest) -> PaymentResponse {
        let price = self.catalog.get(&request.resource_id).copied();
        if let Err(err) = check_amount(request.amount, price) {
            tracing::info!(resource_id = %request.resource_id, error = %err, "Payment rejected");
            return PaymentResponse::failed("", &err);
        }

        // Simulated network latency
        tokio::time::sleep(self.processing_delay).await;

        let success = rand::thread_rng().gen_bool(self.success_rate);
        let now = self.clock.now();
        let payment_id = format!("pay_{}_{}", now.timestamp_millis(), random_base36(9));

        let issued = if success {
            self.generate_token(&request.resource_id, request.user_id.as_deref())
                .map(Some)
        } else {
            Ok(None)
        };

        let response = match issued {
            Ok(Some(token)) => PaymentResponse {
                success: true,
                payment_id: payment_id.clone(),
                status: PaymentStatus::Completed,
                token: Some(token),
                redirect_url: None,
                message: Some("Payment processed successfully".into()),
                transaction_hash: None,
                code: None,
            },
            Ok(None) => PaymentResponse {
                success: false,
                payment_id: payment_id.clone(),
                status: PaymentStatus::Failed,
                token: None,
                redirect_url: None,
                message: Some("Payment failed".into()),
                transaction_hash: None,
                code: Some(ErrorCode::PaymentDeclined),
            },
            Err(err) => {
                tracing::warn!(payment_id = %payment_id, error = %err, "Token could not be issued");
                PaymentResponse::failed(payment_id.clone(), &err)
            }
        };

        tracing::info!(
            payment_id = %payment_id,
            resource_id = %request.resource_id,
            success = response.success,
            "Processed mock payment"
        );

        self.payments
            .write()
            .remember(response.clone(), self.payment_capacity);
        response
    }

    async fn verify_payment(&self, payment_id: &str) -> bool {
        self.payments
            .read()
            .by_id
            .get(payment_id)
            .is_some_and(|p| p.status == PaymentStatus::Completed)
    }

    fn generate_token(&self, resource_id: &str, user_id: Option<&str>) -> Result<PaymentToken> {
        PaymentToken::encoded(resource_id, user_id, self.clock.now(), self.token_ttl)
    }

    fn name(&self) -> &str {
        "MockProvider"
    }
}

fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use rust_decimal_macros::dec;

    fn provider(rate: f64) -> MockPaymentProvider {
        let config = PaywallConfig {
            processing_delay: std::time::Duration::ZERO,
            ..Default::default()
        };
        MockPaymentProvider::new(&config, Arc::new(ManualClock::default())).with_success_rate(rate)
    }

    #[tokio::test]
    async fn test_successful_payment_issues_day_long_token() {
        let provider = provider(1.0);
        let request = PaymentRequest::new("article-1", dec!(9.99), "USD");

        let response = provider.process_payment(&request).await;
        assert!(response.success);
        assert_eq!(response.status, PaymentStatus::Completed);
        assert!(response.payment_id.starts_with("pay_"));

        let token = response.token.unwrap();
        assert_eq!(token.resource_id, "article-1");
        assert_eq!(token.expires_at - token.issued_at, Duration::hours(24));

        assert!(provider.verify_payment(&response.payment_id).await);
    }

    #[tokio::test]
    async fn test_declined_payment() {
        let provider = provider(0.0);
        let request = PaymentRequest::new("article-1", dec!(9.99), "USD");

        let response = provider.process_payment(&request).await;
        assert!(!response.success);
        assert_eq!(response.status, PaymentStatus::Failed);
        assert_eq!(response.message.as_deref(), Some("Payment failed"));
        assert_eq!(response.code, Some(ErrorCode::PaymentDeclined));
        assert!(response.token.is_none());

        assert!(!provider.verify_payment(&response.payment_id).await);
    }

    #[tokio::test]
    async fn test_catalog_rejects_underpayment() {
        let provider = provider(1.0).with_catalog([("article-1".to_string(), dec!(9.99))]);
        let request = PaymentRequest::new("article-1", dec!(5.00), "USD");

        let response = provider.process_payment(&request).await;
        assert!(!response.success);
        assert_eq!(response.code, Some(ErrorCode::InsufficientAmount));
        assert!(response.token.is_none());
        assert_eq!(provider.payment_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_payment_is_unverified() {
        let provider = provider(1.0);
        assert!(!provider.verify_payment("pay_missing").await);
    }

    #[tokio::test]
    async fn test_oldest_payments_are_forgotten() {
        let provider = provider(1.0).with_payment_capacity(2);
        let request = PaymentRequest::new("article-1", dec!(9.99), "USD");

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(provider.process_payment(&request).await.payment_id);
        }

        assert_eq!(provider.payment_count(), 2);
        assert!(!provider.verify_payment(&ids[0]).await);
        assert!(provider.verify_payment(&ids[1]).await);
        assert!(provider.verify_payment(&ids[2]).await);
    }

    #[tokio::test]
    async fn test_oversized_ttl_fails_without_panicking() {
        let config = PaywallConfig {
            processing_delay: std::time::Duration::ZERO,
            mock_token_ttl: Duration::try_seconds(i64::MAX / 1000).unwrap(),
            ..Default::default()
        };
        let provider = MockPaymentProvider::new(&config, Arc::new(ManualClock::default()))
            .with_success_rate(1.0);

        let response = provider
            .process_payment(&PaymentRequest::new("article-1", dec!(9.99), "USD"))
            .await;
        assert!(!response.success);
        assert_eq!(response.code, Some(ErrorCode::Internal));
        assert!(response.token.is_none());
    }

    #[test]
    fn test_rate_is_clamped() {
        assert_eq!(sanitize_rate(1.7), 1.0);
        assert_eq!(sanitize_rate(-0.2), 0.0);
        assert_eq!(sanitize_rate(f64::NAN), 0.0);
    }
}
