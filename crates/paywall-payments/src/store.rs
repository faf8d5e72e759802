//! Record Storage
//!
//! Resources, transactions and payment records. The trait mirrors what a
//! hosted database client offers: point lookups, insert-returning, update by
//! id and ordered listings.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{PaymentError, Result};
use crate::model::{PaymentRecord, RecordStatus, Resource, Transaction, TransactionStatus};

/// Record storage trait
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Get a resource by id
    async fn get_resource(&self, id: &str) -> Result<Option<Resource>>;

    /// Insert or replace a resource
    async fn insert_resource(&self, resource: Resource) -> Result<Resource>;

    /// All resources, newest first
    async fn list_resources(&self) -> Result<Vec<Resource>>;

    /// Bump the access counter, returning the new value
    async fn increment_access_count(&self, resource_id: &str) -> Result<u64>;

    async fn insert_transaction(&self, transaction: Transaction) -> Result<Transaction>;

    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>>;

    async fn update_transaction_status(&self, id: &str, status: TransactionStatus) -> Result<()>;

    /// Most recent transactions first
    async fn list_transactions(&self, limit: usize) -> Result<Vec<Transaction>>;

    async fn insert_payment_record(&self, record: PaymentRecord) -> Result<PaymentRecord>;

    async fn get_payment_record(&self, id: &str) -> Result<Option<PaymentRecord>>;

    /// Record created for a transaction
    async fn get_payment_record_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>>;

    async fn update_payment_record_status(&self, id: &str, status: RecordStatus) -> Result<()>;

    /// Records for a buyer, newest first
    async fn list_payment_records(&self, user_address: &str) -> Result<Vec<PaymentRecord>>;
}

/// In-memory record store (for development)
#[derive(Default)]
pub struct MemoryRecordStore {
    resources: RwLock<HashMap<String, Resource>>,
    transactions: RwLock<HashMap<String, Transaction>>,
    records: RwLock<HashMap<String, PaymentRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding the given resources
    pub fn with_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        let store = Self::new();
        {
            let mut map = store.resources.write();
            for resource in resources {
                map.insert(resource.id.clone(), resource);
            }
        }
        store
    }

    /// Number of payment records held
    pub fn payment_record_count(&self) -> usize {
        self.records.read().len()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_resource(&self, id: &str) -> Result<Option<Resource>> {
        Ok(self.resources.read().get(id).cloned())
    }

    async fn insert_resource(&self, resource: Resource) -> Result<Resource> {
        self.resources.write().insert(resource.id.clone(), resource.clone());
        Ok(resource)
    }

    async fn list_resources(&self) -> Result<Vec<Resource>> {
        let mut result: Vec<_> = self.resources.read().values().cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(result)
    }

    async fn increment_access_count(&self, resource_id: &str) -> Result<u64> {
        let mut resources = self.resources.write();
        let resource = resources
            .get_mut(resource_id)
            .ok_or_else(|| PaymentError::ResourceNotFound(resource_id.to_string()))?;
        resource.access_count += 1;
        Ok(resource.access_count)
    }

    async fn insert_transaction(&self, transaction: Transaction) -> Result<Transaction> {
        let mut transactions = self.transactions.write();
        if transactions.contains_key(&transaction.id) {
            return Err(PaymentError::StoreWriteFailure(format!(
                "duplicate transaction id {}",
                transaction.id
            )));
        }
        transactions.insert(transaction.id.clone(), transaction.clone());
        Ok(transaction)
    }

    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>> {
        Ok(self.transactions.read().get(id).cloned())
    }

    async fn update_transaction_status(&self, id: &str, status: TransactionStatus) -> Result<()> {
        let mut transactions = self.transactions.write();
        let transaction = transactions
            .get_mut(id)
            .ok_or_else(|| PaymentError::StoreWriteFailure(format!("unknown transaction {id}")))?;
        transaction.status = status;
        Ok(())
    }

    async fn list_transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        let mut result: Vec<_> = self.transactions.read().values().cloned().collect();
        result.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        result.truncate(limit);
        Ok(result)
    }

    async fn insert_payment_record(&self, record: PaymentRecord) -> Result<PaymentRecord> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(PaymentError::StoreWriteFailure(format!(
                "duplicate payment record id {}",
                record.id
            )));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_payment_record(&self, id: &str) -> Result<Option<PaymentRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn get_payment_record_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>> {
        Ok(self
            .records
            .read()
            .values()
            .find(|r| r.transaction_id == transaction_id)
            .cloned())
    }

    async fn update_payment_record_status(&self, id: &str, status: RecordStatus) -> Result<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| PaymentError::StoreWriteFailure(format!("unknown payment record {id}")))?;
        record.status = status;
        Ok(())
    }

    async fn list_payment_records(&self, user_address: &str) -> Result<Vec<PaymentRecord>> {
        let mut result: Vec<_> = self
            .records
            .read()
            .values()
            .filter(|r| r.user_address == user_address)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}
