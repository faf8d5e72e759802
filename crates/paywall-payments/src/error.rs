//! Payment Error Types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment and token errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Requested resource does not exist in the record store
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Offered amount is below the resource price
    #[error("Insufficient amount: price is {price}, offered {offered}")]
    InsufficientAmount { price: Decimal, offered: Decimal },

    /// Negative or otherwise unusable amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// A record store write failed
    #[error("Store write failed: {0}")]
    StoreWriteFailure(String),

    /// Token was never issued or has been evicted
    #[error("Token not found")]
    TokenNotFound,

    /// Token belongs to a different resource
    #[error("Token does not match resource")]
    ResourceMismatch,

    /// Token is past its expiry
    #[error("Token has expired")]
    TokenExpired,

    /// A lifetime pushes an expiry past the representable date range
    #[error("Expiry out of range: {0}")]
    ExpiryOverflow(String),

    /// Storage read error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Machine-readable error code carried by failed responses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ResourceNotFound,
    InsufficientAmount,
    InvalidAmount,
    StoreWriteFailure,
    TokenNotFound,
    ResourceMismatch,
    TokenExpired,
    PaymentDeclined,
    Internal,
}

impl PaymentError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::StoreWriteFailure(_) | PaymentError::Storage(_))
    }

    /// Error code for structured responses
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::ResourceNotFound(_) => ErrorCode::ResourceNotFound,
            PaymentError::InsufficientAmount { .. } => ErrorCode::InsufficientAmount,
            PaymentError::InvalidAmount(_) => ErrorCode::InvalidAmount,
            PaymentError::StoreWriteFailure(_) => ErrorCode::StoreWriteFailure,
            PaymentError::TokenNotFound => ErrorCode::TokenNotFound,
            PaymentError::ResourceMismatch => ErrorCode::ResourceMismatch,
            PaymentError::TokenExpired => ErrorCode::TokenExpired,
            PaymentError::ExpiryOverflow(_)
            | PaymentError::Storage(_)
            | PaymentError::Config(_)
            | PaymentError::Json(_) => ErrorCode::Internal,
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            PaymentError::ResourceNotFound(_) => "The requested resource does not exist.",
            PaymentError::InsufficientAmount { .. } => "Payment amount is below the resource price.",
            PaymentError::InvalidAmount(_) => "Payment amount must not be negative.",
            PaymentError::StoreWriteFailure(_) => "Payment could not be recorded. Please try again.",
            PaymentError::TokenNotFound => "Token not found",
            PaymentError::ResourceMismatch => "Token does not match resource",
            PaymentError::TokenExpired => "Token has expired",
            PaymentError::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}

impl From<anyhow::Error> for PaymentError {
    fn from(err: anyhow::Error) -> Self {
        PaymentError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_token_messages() {
        assert_eq!(PaymentError::TokenNotFound.to_string(), "Token not found");
        assert_eq!(PaymentError::ResourceMismatch.to_string(), "Token does not match resource");
        assert_eq!(PaymentError::TokenExpired.to_string(), "Token has expired");
    }

    #[test]
    fn test_codes() {
        let err = PaymentError::InsufficientAmount { price: dec!(9.99), offered: dec!(5.00) };
        assert_eq!(err.code(), ErrorCode::InsufficientAmount);
        assert!(!err.is_retryable());
        assert!(PaymentError::StoreWriteFailure("down".into()).is_retryable());
    }

    #[test]
    fn test_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::TokenExpired).unwrap();
        assert_eq!(json, "\"TOKEN_EXPIRED\"");
    }
}
