use crate::domain::payment::{PaymentRecord, PaymentStatus, ReferenceId};
use crate::domain::ports::{PaymentStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payment records.
///
/// Uses `Arc<RwLock<HashMap<String, PaymentRecord>>>` keyed by reference, so
/// clones share the same records. The existence check and the insert happen
/// under one write guard, which makes the reference unique even when inserts
/// race.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<String, PaymentRecord>>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn find_by_reference(
        &self,
        reference_id: &ReferenceId,
    ) -> StoreResult<Option<PaymentRecord>> {
        let payments = self.payments.read().await;
        Ok(payments.get(reference_id.as_str()).cloned())
    }

    async fn insert(&self, record: PaymentRecord) -> StoreResult<PaymentRecord> {
        let mut payments = self.payments.write().await;
        match payments.entry(record.reference_id.to_string()) {
            Entry::Occupied(_) => Err(StoreError::UniquenessViolation {
                reference_id: record.reference_id.to_string(),
            }),
            Entry::Vacant(slot) => Ok(slot.insert(record).clone()),
        }
    }

    async fn update(&self, record: PaymentRecord, expected: PaymentStatus) -> StoreResult<()> {
        let mut payments = self.payments.write().await;
        match payments.get_mut(record.reference_id.as_str()) {
            Some(stored) if stored.status != expected => Err(StoreError::StatusChanged {
                reference_id: record.reference_id.to_string(),
                expected,
                found: stored.status,
            }),
            Some(stored) => {
                *stored = record;
                Ok(())
            }
            None => Err(StoreError::Missing {
                reference_id: record.reference_id.to_string(),
            }),
        }
    }
}
