//! HTTP 402 Paywall Server
//!
//! Axum-based server gating demo content behind payments. Paid resources
//! answer `402 Payment Required` until the caller presents a valid access
//! token in the `x-payment-token` header, or a purchase has saved one to the
//! resource's token slot.

mod handlers;
mod seed;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paywall_payments::{
    AccessGate, Clock, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, MemoryRecordStore,
    MockPaymentProvider, PaymentProvider, PaywallConfig, ProviderKind, RecordStore,
    StorePaymentProvider, SystemClock, TokenVerifier,
};

use crate::handlers::{
    activity_stats, create_payment, get_resource, health_check, list_resources,
    list_transactions, verify_payment, verify_token,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(PaywallConfig::from_env()?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Record store with the demo catalog
    let resources = seed::demo_resources();
    let catalog: Vec<_> = resources.iter().map(|r| (r.id.clone(), r.price)).collect();
    let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::with_resources(resources));
    tracing::info!("Loaded {} demo resources", catalog.len());

    // Token slots: file-backed when a path is configured
    let slots: Arc<dyn KeyValueStore> = match std::env::var("PAYWALL_TOKEN_STORE_PATH") {
        Ok(path) if !path.trim().is_empty() => {
            tracing::info!("Token slots persisted to {}", path);
            Arc::new(FileKeyValueStore::open(&path)?)
        }
        _ => Arc::new(MemoryKeyValueStore::new()),
    };

    let verifier = Arc::new(TokenVerifier::new(clock.clone(), slots));

    let provider: Arc<dyn PaymentProvider> = match config.provider {
        ProviderKind::Store => Arc::new(StorePaymentProvider::new(&config, store.clone(), clock.clone())),
        ProviderKind::Mock => {
            Arc::new(MockPaymentProvider::new(&config, clock.clone()).with_catalog(catalog))
        }
    };
    tracing::info!("Using payment provider: {}", provider.name());

    let gate = Arc::new(AccessGate::new(verifier.clone(), provider.clone()));

    // Build application state
    let state = AppState {
        provider: provider.clone(),
        verifier: verifier.clone(),
        gate,
        store,
        clock,
        config,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        // Resources
        .route("/api/resources", get(list_resources))
        .route("/api/resources/{id}", get(get_resource))
        // Payments
        .route("/api/payments", post(create_payment))
        .route("/api/payments/{id}", get(verify_payment))
        .route("/api/tokens/verify", post(verify_token))
        // Activity
        .route("/api/transactions", get(list_transactions))
        .route("/api/stats", get(activity_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("402 paywall server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                - Health check");
    tracing::info!("  GET  /api/resources         - List resources");
    tracing::info!("  GET  /api/resources/{{id}}    - Resource content (402 without a valid token)");
    tracing::info!("  POST /api/payments          - Pay for a resource");
    tracing::info!("  GET  /api/payments/{{id}}     - Verify a payment");
    tracing::info!("  POST /api/tokens/verify     - Verify an access token");
    tracing::info!("  GET  /api/transactions      - Recent transactions");
    tracing::info!("  GET  /api/stats             - 7-day activity");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cancel pending confirmations and eviction timers
    provider.shutdown();
    verifier.shutdown();
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
