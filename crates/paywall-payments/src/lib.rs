//! # paywall-payments
//!
//! Payment processing and access tokens for an HTTP 402 paywall.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐  PaymentRequest  ┌─────────────────┐  insert   ┌─────────────┐
//! │  Caller  │─────────────────▶│ PaymentProvider │──────────▶│ RecordStore │
//! └──────────┘                  └─────────────────┘           └─────────────┘
//!      ▲                               │  PaymentResponse + PaymentToken
//!      │                               ▼         (confirmation scheduled)
//!      │  verify_token          ┌─────────────────┐  get/set  ┌───────────────┐
//!      └────────────────────────│  TokenVerifier  │──────────▶│ KeyValueStore │
//!                               └─────────────────┘           └───────────────┘
//! ```
//!
//! Two providers implement [`PaymentProvider`]:
//!
//! - [`StorePaymentProvider`] validates against stored resource prices,
//!   records a pending transaction and payment record, issues a 30-day token
//!   and confirms the payment after a simulated settlement delay.
//! - [`MockPaymentProvider`] needs no store; it succeeds with a configured
//!   probability and issues 24-hour tokens.
//!
//! [`TokenVerifier`] decides validity. A token is valid only while it is
//! indexed, matches the resource and has not reached `expires_at`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use paywall_payments::{
//!     MemoryKeyValueStore, MemoryRecordStore, PaymentProvider, PaymentRequest,
//!     PaywallConfig, StorePaymentProvider, SystemClock, TokenVerifier,
//! };
//!
//! let clock = Arc::new(SystemClock);
//! let provider = StorePaymentProvider::new(&PaywallConfig::default(), store, clock.clone());
//! let verifier = TokenVerifier::new(clock, Arc::new(MemoryKeyValueStore::new()));
//!
//! let response = provider.process_payment(&PaymentRequest::new("article-1", dec!(9.99), "USD")).await;
//! if let Some(token) = response.token {
//!     let value = token.token.clone();
//!     verifier.store_token(token);
//!     assert!(verifier.verify_token(&value, "article-1").is_valid);
//! }
//! ```

mod access;
mod clock;
mod config;
mod error;
mod model;
mod provider;
mod scheduler;
mod stats;
mod storage;
mod store;
mod token;
mod verifier;

pub use access::{AccessDecision, AccessGate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Environment, MAX_TTL_DAYS, PaywallConfig, ProviderKind};
pub use error::{ErrorCode, PaymentError, Result};
pub use model::{
    PaymentMethod, PaymentRecord, PaymentRequest, PaymentResponse, PaymentStatus, PaymentToken,
    PaymentVerification, ProtectedResource, RecordStatus, Resource, Transaction, TransactionStatus,
};
pub use provider::{MockPaymentProvider, PaymentProvider, StorePaymentProvider};
pub use scheduler::Scheduler;
pub use stats::{ActivityStats, DailyActivity};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::{MemoryRecordStore, RecordStore};
pub use verifier::{TokenVerifier, slot_key};
