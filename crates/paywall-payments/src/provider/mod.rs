//! Payment Providers
//!
//! Abstractions and implementations for processing payments.

mod mock;
mod store;

pub use mock::MockPaymentProvider;
pub use store::StorePaymentProvider;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::{PaymentError, Result};
use crate::model::{PaymentRequest, PaymentResponse, PaymentToken};

/// Payment provider trait (Strategy pattern)
///
/// Failures never escape as errors: every outcome of `process_payment` is a
/// [`PaymentResponse`], with `success: false` and a code on failure.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Validate and execute a payment, issuing a token on acceptance
    async fn process_payment(&self, request: &PaymentRequest) -> PaymentResponse;

    /// Whether a payment has completed and is still within its validity
    async fn verify_payment(&self, payment_id: &str) -> bool;

    /// Mint a fresh access token for a resource
    fn generate_token(&self, resource_id: &str, user_id: Option<&str>) -> Result<PaymentToken>;

    /// Provider name
    fn name(&self) -> &str;

    /// Cancel any deferred work
    fn shutdown(&self) {}
}

/// Amount must be non-negative and cover the price
pub(crate) fn check_amount(offered: Decimal, price: Option<Decimal>) -> Result<()> {
    if offered < Decimal::ZERO {
        return Err(PaymentError::InvalidAmount(offered));
    }
    match price {
        Some(price) if offered < price => Err(PaymentError::InsufficientAmount { price, offered }),
        _ => Ok(()),
    }
}
