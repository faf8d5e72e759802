//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paywall_payments::{
    ActivityStats, ErrorCode, PaymentRequest, PaymentResponse, PaymentVerification,
    ProtectedResource, Transaction,
};

use crate::state::AppState;

/// Header carrying an access token
pub const TOKEN_HEADER: &str = "x-payment-token";

const DEFAULT_TRANSACTION_LIMIT: usize = 50;
const STATS_SAMPLE: usize = 10_000;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub environment: String,
    pub indexed_tokens: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredResponse {
    pub error: &'static str,
    pub resource_id: String,
    pub price: Decimal,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCheckResponse {
    pub payment_id: String,
    pub verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenRequest {
    pub token: String,
    pub resource_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal_error(context: &str, err: impl std::fmt::Display) -> ApiError {
    tracing::error!("{}: {}", context, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: context.to_string(),
            code: "STORE_ERROR".into(),
        }),
    )
}

/// HTTP status for a failed payment or verification
pub fn status_for(code: Option<ErrorCode>) -> StatusCode {
    match code {
        None => StatusCode::OK,
        Some(ErrorCode::ResourceNotFound) => StatusCode::NOT_FOUND,
        Some(ErrorCode::InvalidAmount) => StatusCode::BAD_REQUEST,
        Some(
            ErrorCode::InsufficientAmount
            | ErrorCode::PaymentDeclined
            | ErrorCode::TokenNotFound
            | ErrorCode::ResourceMismatch
            | ErrorCode::TokenExpired,
        ) => StatusCode::PAYMENT_REQUIRED,
        Some(ErrorCode::StoreWriteFailure) => StatusCode::SERVICE_UNAVAILABLE,
        Some(ErrorCode::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
        environment: state.config.environment.as_str().to_string(),
        indexed_tokens: state.verifier.len(),
    })
}

/// Resource catalog, without content
pub async fn list_resources(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProtectedResource>>, ApiError> {
    let resources = state
        .store
        .list_resources()
        .await
        .map_err(|e| internal_error("Failed to list resources", e))?;

    Ok(Json(
        resources
            .iter()
            .map(|r| ProtectedResource {
                content: None,
                ..r.to_protected()
            })
            .collect(),
    ))
}

/// Resource content, gated by the `x-payment-token` header or the token
/// saved for the resource by an earlier purchase
pub async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let resource = state
        .store
        .get_resource(&id)
        .await
        .map_err(|e| internal_error("Failed to load resource", e))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Resource not found: {id}"),
                    code: "RESOURCE_NOT_FOUND".into(),
                }),
            )
        })?;

    let protected = resource.to_protected();
    if !protected.requires_payment {
        return Ok(Json(protected).into_response());
    }

    let reason = match headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        Some(token) => {
            let verification = state.verifier.verify_token(token, &protected.id);
            if verification.is_valid {
                return Ok(Json(protected).into_response());
            }
            verification.error
        }
        // No header: fall back to the token saved in the resource's slot
        None => {
            let decision = state
                .gate
                .check_access(&protected)
                .map_err(|e| internal_error("Failed to read token slot", e))?;
            if decision.is_allowed() {
                return Ok(Json(protected).into_response());
            }
            None
        }
    };

    Ok((
        StatusCode::PAYMENT_REQUIRED,
        Json(PaymentRequiredResponse {
            error: "Payment required",
            resource_id: protected.id,
            price: protected.price,
            currency: protected.currency,
            reason,
        }),
    )
        .into_response())
}

/// Submit a payment; an issued token is indexed and saved to the
/// resource's slot
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<PaymentRequest>,
) -> (StatusCode, Json<PaymentResponse>) {
    let response = state.gate.purchase(&payload).await;
    (status_for(response.code), Json(response))
}

/// Whether a payment has completed
pub async fn verify_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<PaymentCheckResponse> {
    let verified = state.provider.verify_payment(&id).await;
    Json(PaymentCheckResponse {
        payment_id: id,
        verified,
    })
}

/// Check a token against a resource
pub async fn verify_token(
    State(state): State<AppState>,
    Json(payload): Json<VerifyTokenRequest>,
) -> Json<PaymentVerification> {
    Json(state.verifier.verify_token(&payload.token, &payload.resource_id))
}

/// Recent transactions, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT);
    state
        .store
        .list_transactions(limit)
        .await
        .map(Json)
        .map_err(|e| internal_error("Failed to list transactions", e))
}

/// Seven-day activity summary
pub async fn activity_stats(
    State(state): State<AppState>,
) -> Result<Json<ActivityStats>, ApiError> {
    let transactions = state
        .store
        .list_transactions(STATS_SAMPLE)
        .await
        .map_err(|e| internal_error("Failed to load transactions", e))?;

    let today = state.clock.now().date_naive();
    Ok(Json(ActivityStats::compute(&transactions, today)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Duration;
    use paywall_payments::{
        AccessGate, ManualClock, MemoryKeyValueStore, MemoryRecordStore, PaywallConfig,
        StorePaymentProvider, TokenVerifier,
    };
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn state() -> AppState {
        state_with_clock().0
    }

    fn state_with_clock() -> (AppState, Arc<ManualClock>) {
        let config = Arc::new(PaywallConfig::default());
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryRecordStore::with_resources(crate::seed::demo_resources()));
        let provider = Arc::new(StorePaymentProvider::new(&config, store.clone(), clock.clone()));
        let verifier = Arc::new(TokenVerifier::new(clock.clone(), Arc::new(MemoryKeyValueStore::new())));
        let gate = Arc::new(AccessGate::new(verifier.clone(), provider.clone()));

        let state = AppState {
            provider,
            verifier,
            gate,
            store,
            clock: clock.clone(),
            config,
        };
        (state, clock)
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(None), StatusCode::OK);
        assert_eq!(status_for(Some(ErrorCode::InsufficientAmount)), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(status_for(Some(ErrorCode::ResourceNotFound)), StatusCode::NOT_FOUND);
        assert_eq!(status_for(Some(ErrorCode::StoreWriteFailure)), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_paid_resource_requires_token() {
        let state = state();
        let response = get_resource(State(state), Path("article-1".into()), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_free_resource_is_served() {
        let state = state();
        let response = get_resource(State(state), Path("free-1".into()), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_payment_unlocks_resource() {
        let state = state();
        let (status, Json(payment)) = create_payment(
            State(state.clone()),
            Json(PaymentRequest::new("article-1", dec!(9.99), "USD")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = payment.token.unwrap().token;

        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, HeaderValue::from_str(&token).unwrap());
        let response = get_resource(State(state.clone()), Path("article-1".into()), headers)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let Json(verification) = verify_token(
            State(state),
            Json(VerifyTokenRequest {
                token,
                resource_id: "video-1".into(),
            }),
        )
        .await;
        assert_eq!(verification.code, Some(ErrorCode::ResourceMismatch));
    }

    #[tokio::test]
    async fn test_payment_saves_token_to_slot() {
        let state = state();
        let (status, Json(payment)) = create_payment(
            State(state.clone()),
            Json(PaymentRequest::new("article-1", dec!(9.99), "USD")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let token = payment.token.map(|t| t.token);
        assert!(token.is_some());
        assert_eq!(state.verifier.get_stored_token("article-1").unwrap(), token);

        // The saved slot grants access without a header
        let response = get_resource(State(state.clone()), Path("article-1".into()), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = get_resource(State(state), Path("video-1".into()), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn test_expired_slot_is_cleared_on_access() {
        let (state, clock) = state_with_clock();
        create_payment(
            State(state.clone()),
            Json(PaymentRequest::new("article-1", dec!(9.99), "USD")),
        )
        .await;

        clock.advance(Duration::days(31));
        let response = get_resource(State(state.clone()), Path("article-1".into()), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        assert!(state.verifier.get_stored_token("article-1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_underpayment_is_402() {
        let state = state();
        let (status, Json(payment)) = create_payment(
            State(state),
            Json(PaymentRequest::new("article-1", dec!(5.00), "USD")),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert!(!payment.success);
    }

    #[tokio::test]
    async fn test_missing_resource_is_404() {
        let state = state();
        let status = get_resource(State(state), Path("nope".into()), HeaderMap::new())
            .await
            .err()
            .map(|(status, _)| status);
        assert_eq!(status, Some(StatusCode::NOT_FOUND));
    }
}
