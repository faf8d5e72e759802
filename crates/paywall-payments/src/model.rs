//! Domain Models
//!
//! Request, response and record types shared by the payment providers and
//! the token verifier. Uses `rust_decimal` for all monetary values.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ErrorCode, PaymentError};

/// Payment lifecycle status reported to callers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Expired,
}

/// Payment method chosen by the buyer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    #[default]
    Crypto,
    Paypal,
    Stripe,
}

/// A request to pay for access to a resource
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub resource_id: String,

    pub amount: Decimal,

    pub currency: String,

    #[serde(default)]
    pub method: PaymentMethod,

    /// Buyer identifier (wallet address, account id)
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl PaymentRequest {
    pub fn new(resource_id: impl Into<String>, amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            amount,
            currency: currency.into(),
            method: PaymentMethod::default(),
            user_id: None,
            metadata: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }
}

/// A time-bounded access token for one resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentToken {
    /// Opaque unique token value
    pub token: String,
    pub resource_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PaymentToken {
    /// Expired at or after `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of a payment attempt
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub success: bool,
    pub payment_id: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<PaymentToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl PaymentResponse {
    /// Failed attempt built from an error
    pub fn failed(payment_id: impl Into<String>, err: &PaymentError) -> Self {
        Self {
            success: false,
            payment_id: payment_id.into(),
            status: PaymentStatus::Failed,
            token: None,
            redirect_url: None,
            message: Some(err.to_string()),
            transaction_hash: None,
            code: Some(err.code()),
        }
    }
}

/// Result of checking a token against a resource
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<PaymentToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl PaymentVerification {
    pub fn valid(token: PaymentToken) -> Self {
        Self {
            is_valid: true,
            token: Some(token),
            error: None,
            code: None,
        }
    }

    pub fn invalid(err: &PaymentError) -> Self {
        Self {
            is_valid: false,
            token: None,
            error: Some(err.to_string()),
            code: Some(err.code()),
        }
    }
}

/// Transaction settlement status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

/// A (simulated) on-chain transaction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: Decimal,
    /// Settlement token symbol
    pub token: String,
    pub chain: String,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub resource_id: Option<String>,
}

/// Payment record status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Completed,
    Expired,
}

/// Entitlement record linking a buyer, a resource and a transaction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub user_address: String,
    pub resource_id: String,
    pub transaction_id: String,
    pub amount: Decimal,
    pub status: RecordStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Stored status, with expiry applied
    pub fn effective_status(&self, now: DateTime<Utc>) -> RecordStatus {
        if now >= self.expires_at {
            RecordStatus::Expired
        } else {
            self.status
        }
    }
}

/// A resource row in the record store
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub access_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub content_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            currency: currency.into(),
            access_count: 0,
            created_at: Utc::now(),
            content_url: None,
            content: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Gating view of this resource
    pub fn to_protected(&self) -> ProtectedResource {
        ProtectedResource {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            currency: self.currency.clone(),
            requires_payment: self.price > Decimal::ZERO,
            content: self.content.clone(),
        }
    }
}

/// Read-only view of a resource used for access gating
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectedResource {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub requires_payment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
