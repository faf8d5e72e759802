//! Store-Backed Payment Provider
//!
//! Records a transaction and a payment record for every accepted payment,
//! then confirms them after a simulated settlement delay. The caller gets a
//! `pending` response with a token immediately; confirmation happens later
//! and its failure never reaches the caller.

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

use super::{PaymentProvider, check_amount};
use crate::clock::Clock;
use crate::config::PaywallConfig;
use crate::error::{PaymentError, Result};
use crate::model::{
    PaymentRecord, PaymentRequest, PaymentResponse, PaymentStatus, PaymentToken, RecordStatus,
    Resource, Transaction, TransactionStatus,
};
use crate::scheduler::Scheduler;
use crate::store::RecordStore;
use crate::token::{expiry_after, random_hex};

const ANONYMOUS: &str = "anonymous";

/// Payment provider backed by a [`RecordStore`]
pub struct StorePaymentProvider {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    scheduler: Scheduler,
    token_ttl: Duration,
    record_ttl: Duration,
    settlement_delay: std::time::Duration,
    recipient_address: String,
    settlement_token: String,
    chain: String,
}

impl StorePaymentProvider {
    pub fn new(config: &PaywallConfig, store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        tracing::info!(
            environment = config.environment.as_str(),
            chain = %config.chain,
            "Store payment provider initialized"
        );

        Self {
            store,
            clock,
            scheduler: Scheduler::new(),
            token_ttl: config.token_ttl,
            record_ttl: config.record_ttl,
            settlement_delay: config.settlement_delay,
            recipient_address: config.recipient_address.clone(),
            settlement_token: config.settlement_token.clone(),
            chain: config.chain.clone(),
        }
    }

    /// Recent transactions, newest first
    pub async fn transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        self.store.list_transactions(limit).await
    }

    /// All resources, newest first
    pub async fn resources(&self) -> Result<Vec<Resource>> {
        self.store.list_resources().await
    }

    /// Payment records for a buyer, newest first
    pub async fn user_payments(&self, user_address: &str) -> Result<Vec<PaymentRecord>> {
        self.store.list_payment_records(user_address).await
    }

    /// Number of confirmations still waiting to run
    pub fn pending_confirmations(&self) -> usize {
        self.scheduler.pending()
    }

    async fn try_process(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        check_amount(request.amount, None)?;

        let resource = self
            .store
            .get_resource(&request.resource_id)
            .await?
            .ok_or_else(|| PaymentError::ResourceNotFound(request.resource_id.clone()))?;

        check_amount(request.amount, Some(resource.price))?;

        // Lifetimes are resolved before anything is written
        let now = self.clock.now();
        let record_expires_at = expiry_after(now, self.record_ttl)?;
        let token = self.generate_token(&resource.id, request.user_id.as_deref())?;
        let buyer = request.user_id.as_deref().unwrap_or(ANONYMOUS);

        let transaction = self
            .store
            .insert_transaction(Transaction {
                id: uuid::Uuid::new_v4().to_string(),
                tx_hash: format!("0x{:x}{}", now.timestamp_millis(), random_hex(8)),
                from_address: buyer.to_string(),
                to_address: self.recipient_address.clone(),
                amount: request.amount,
                token: self.settlement_token.clone(),
                chain: self.chain.clone(),
                status: TransactionStatus::Pending,
                timestamp: now,
                resource_id: Some(resource.id.clone()),
            })
            .await
            .map_err(write_failure)?;

        let record = PaymentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_address: buyer.to_string(),
            resource_id: resource.id.clone(),
            transaction_id: transaction.id.clone(),
            amount: request.amount,
            status: RecordStatus::Pending,
            expires_at: record_expires_at,
            created_at: now,
        };

        let record = match self.store.insert_payment_record(record).await {
            Ok(record) => record,
            Err(err) => {
                let err = write_failure(err);
                tracing::warn!(transaction_id = %transaction.id, error = %err, "Payment record insert failed");
                if let Err(e) = self
                    .store
                    .update_transaction_status(&transaction.id, TransactionStatus::Failed)
                    .await
                {
                    tracing::warn!(transaction_id = %transaction.id, error = %e, "Could not mark transaction failed");
                }
                return Ok(PaymentResponse::failed(transaction.id, &err));
            }
        };

        self.schedule_confirmation(transaction.id.clone(), record.id, resource.id.clone());

        tracing::info!(
            transaction_id = %transaction.id,
            resource_id = %resource.id,
            amount = %request.amount,
            "Payment accepted, awaiting confirmation"
        );

        Ok(PaymentResponse {
            success: true,
            payment_id: transaction.id,
            status: PaymentStatus::Pending,
            token: Some(token),
            redirect_url: None,
            message: Some("Payment is processing, awaiting blockchain confirmation".into()),
            transaction_hash: Some(transaction.tx_hash),
            code: None,
        })
    }

    fn schedule_confirmation(&self, transaction_id: String, record_id: String, resource_id: String) {
        let store = Arc::clone(&self.store);
        let key = format!("confirm:{transaction_id}");

        let scheduled = self.scheduler.schedule(key, self.settlement_delay, async move {
            if let Err(err) = confirm(store.as_ref(), &transaction_id, &record_id, &resource_id).await {
                // Best effort: not retried, the caller already has its response
                tracing::warn!(
                    transaction_id = %transaction_id,
                    error = %err,
                    "Settlement confirmation failed"
                );
            }
        });

        if !scheduled {
            tracing::warn!("No runtime for settlement confirmation, payment stays pending");
        }
    }
}

/// Flip a pending payment to confirmed/completed and count the access
async fn confirm(
    store: &dyn RecordStore,
    transaction_id: &str,
    record_id: &str,
    resource_id: &str,
) -> Result<()> {
    store
        .update_transaction_status(transaction_id, TransactionStatus::Confirmed)
        .await?;
    store
        .update_payment_record_status(record_id, RecordStatus::Completed)
        .await?;
    let access_count = store.increment_access_count(resource_id).await?;

    tracing::info!(
        transaction_id = %transaction_id,
        resource_id = %resource_id,
        access_count,
        "Payment confirmed"
    );
    Ok(())
}

fn write_failure(err: PaymentError) -> PaymentError {
    match err {
        PaymentError::StoreWriteFailure(_) => err,
        other => PaymentError::StoreWriteFailure(other.to_string()),
    }
}

#[async_trait]
impl PaymentProvider for StorePaymentProvider {
    async fn process_payment(&self, request: &PaymentRequest) -> PaymentResponse {
        match self.try_process(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::info!(resource_id = %request.resource_id, error = %err, "Payment rejected");
                PaymentResponse::failed("", &err)
            }
        }
    }

    async fn verify_payment(&self, payment_id: &str) -> bool {
        let record = match self.store.get_payment_record(payment_id).await {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => self.store.get_payment_record_by_transaction(payment_id).await,
            Err(err) => Err(err),
        };

        match record {
            Ok(Some(record)) => record.effective_status(self.clock.now()) == RecordStatus::Completed,
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(payment_id = %payment_id, error = %err, "Payment verification failed");
                false
            }
        }
    }

    fn generate_token(&self, resource_id: &str, user_id: Option<&str>) -> Result<PaymentToken> {
        PaymentToken::opaque(resource_id, user_id, self.clock.now(), self.token_ttl)
    }

    fn name(&self) -> &str {
        "StoreProvider"
    }

    fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
