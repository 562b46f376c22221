use super::payment::{PaymentRecord, PaymentStatus, ReferenceId};
use async_trait::async_trait;
use thiserror::Error;

/// Failures surfaced by a [`PaymentStore`] adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Another writer already stored a record under this reference.
    #[error("a payment with reference '{reference_id}' already exists")]
    UniquenessViolation { reference_id: String },
    #[error("no payment with reference '{reference_id}' to update")]
    Missing { reference_id: String },
    /// The stored record left `expected` before this write could land.
    #[error("payment '{reference_id}' is {found}, expected {expected}")]
    StatusChanged {
        reference_id: String,
        expected: PaymentStatus,
        found: PaymentStatus,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("stored payment could not be encoded or decoded: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable storage for payment records, keyed by reference.
///
/// Implementations must reject a second insert for the same reference with
/// [`StoreError::UniquenessViolation`], even when both inserts race, and a
/// successful insert must be readable by any later `find_by_reference`.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn find_by_reference(
        &self,
        reference_id: &ReferenceId,
    ) -> StoreResult<Option<PaymentRecord>>;

    /// Persists a new record, returning it as stored.
    async fn insert(&self, record: PaymentRecord) -> StoreResult<PaymentRecord>;

    /// Replaces the record stored under `record.reference_id`, provided the
    /// stored record is still in status `expected`. The check and the write
    /// are atomic with respect to other updates.
    async fn update(&self, record: PaymentRecord, expected: PaymentStatus) -> StoreResult<()>;
}

pub type PaymentStoreBox = Box<dyn PaymentStore>;
