use crate::domain::payment::{PaymentRecord, PaymentStatus, ReferenceId};
use crate::domain::ports::{PaymentStoreBox, StoreError};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use tracing::{info, instrument};

/// The downstream verdict on a payment that was left `Processing`.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Confirmed,
    Declined { reason: String },
}

/// Advances `Processing` payments to their final status.
///
/// This is the only writer of existing records; admission never updates.
pub struct Reconciler {
    store: PaymentStoreBox,
}

impl Reconciler {
    pub fn new(store: PaymentStoreBox) -> Self {
        Self { store }
    }

    /// Applies `settlement` to the payment stored under `reference_id`.
    ///
    /// Returns `Ok(None)` when no such payment exists and
    /// `PaymentError::InvalidTransition` when it is not `Processing`.
    #[instrument(skip(self))]
    pub async fn settle(
        &self,
        reference_id: &ReferenceId,
        settlement: Settlement,
    ) -> Result<Option<PaymentRecord>> {
        let Some(mut record) = self.store.find_by_reference(reference_id).await? else {
            return Ok(None);
        };

        let (next, reason) = match settlement {
            Settlement::Confirmed => (PaymentStatus::Completed, None),
            Settlement::Declined { reason } => (PaymentStatus::Failed, Some(reason)),
        };
        let from = record.status;
        record.transition(next, reason, Utc::now())?;
        match self.store.update(record.clone(), from).await {
            Ok(()) => {}
            // Another settlement got there first.
            Err(StoreError::StatusChanged { found, .. }) => {
                return Err(PaymentError::InvalidTransition { from: found, to: next });
            }
            Err(err) => return Err(err.into()),
        }
        info!(payment_id = %record.id, status = %record.status, "payment settled");
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::admission::AdmissionCoordinator;
    use crate::domain::evaluator::OutcomeEvaluator;
    use crate::domain::payment::{Amount, Currency, PaymentRequest};
    use crate::domain::ports::{PaymentStore, StoreResult};
    use crate::infrastructure::in_memory::InMemoryPaymentStore;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tokio::sync::Barrier;

    /// Holds every reader at a barrier until all of them have read, so each
    /// settlement starts from the same stored status.
    struct LockstepStore {
        inner: InMemoryPaymentStore,
        readers: Barrier,
    }

    #[async_trait]
    impl PaymentStore for LockstepStore {
        async fn find_by_reference(
            &self,
            reference_id: &ReferenceId,
        ) -> StoreResult<Option<PaymentRecord>> {
            let found = self.inner.find_by_reference(reference_id).await;
            self.readers.wait().await;
            found
        }

        async fn insert(&self, record: PaymentRecord) -> StoreResult<PaymentRecord> {
            self.inner.insert(record).await
        }

        async fn update(&self, record: PaymentRecord, expected: PaymentStatus) -> StoreResult<()> {
            self.inner.update(record, expected).await
        }
    }

    struct SharedLockstep(Arc<LockstepStore>);

    #[async_trait]
    impl PaymentStore for SharedLockstep {
        async fn find_by_reference(
            &self,
            reference_id: &ReferenceId,
        ) -> StoreResult<Option<PaymentRecord>> {
            self.0.find_by_reference(reference_id).await
        }

        async fn insert(&self, record: PaymentRecord) -> StoreResult<PaymentRecord> {
            self.0.insert(record).await
        }

        async fn update(&self, record: PaymentRecord, expected: PaymentStatus) -> StoreResult<()> {
            self.0.update(record, expected).await
        }
    }

    async fn admitted(store: &InMemoryPaymentStore, reference: &str, amount: Decimal) {
        let coordinator = AdmissionCoordinator::new(
            Box::new(store.clone()),
            OutcomeEvaluator::new(["XTS"], dec!(50000)),
        );
        coordinator
            .admit(PaymentRequest::new(
                ReferenceId::new(reference).unwrap(),
                Amount::new(amount).unwrap(),
                Currency::new("USD").unwrap(),
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_confirm_processing_payment() {
        let store = InMemoryPaymentStore::new();
        admitted(&store, "ref-big", dec!(75000)).await;
        let reconciler = Reconciler::new(Box::new(store.clone()));
        let reference = ReferenceId::new("ref-big").unwrap();

        let settled = reconciler
            .settle(&reference, Settlement::Confirmed)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(settled.status, PaymentStatus::Completed);
        assert_eq!(settled.failure_reason, None);
        assert!(settled.updated_at.is_some());
        assert!(settled.updated_at.unwrap() >= settled.created_at);
    }

    #[tokio::test]
    async fn test_decline_processing_payment() {
        let store = InMemoryPaymentStore::new();
        admitted(&store, "ref-big", dec!(75000)).await;
        let reconciler = Reconciler::new(Box::new(store.clone()));
        let reference = ReferenceId::new("ref-big").unwrap();

        reconciler
            .settle(
                &reference,
                Settlement::Declined {
                    reason: "issuer declined".into(),
                },
            )
            .await
            .unwrap();

        let stored = reconciler
            .store
            .find_by_reference(&reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
        assert_eq!(stored.failure_reason.as_deref(), Some("issuer declined"));
    }

    #[tokio::test]
    async fn test_completed_payment_cannot_be_settled() {
        let store = InMemoryPaymentStore::new();
        admitted(&store, "ref-small", dec!(10)).await;
        let reconciler = Reconciler::new(Box::new(store.clone()));

        let err = reconciler
            .settle(
                &ReferenceId::new("ref-small").unwrap(),
                Settlement::Declined {
                    reason: "late".into(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PaymentError::InvalidTransition {
                from: PaymentStatus::Completed,
                to: PaymentStatus::Failed
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_reference_settles_nothing() {
        let reconciler = Reconciler::new(Box::new(InMemoryPaymentStore::new()));
        let settled = reconciler
            .settle(&ReferenceId::new("nope").unwrap(), Settlement::Confirmed)
            .await
            .unwrap();
        assert!(settled.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_settlements_apply_once() {
        let inner = InMemoryPaymentStore::new();
        admitted(&inner, "ref-big", dec!(75000)).await;
        let store = Arc::new(LockstepStore {
            inner: inner.clone(),
            readers: Barrier::new(2),
        });
        let confirm = Reconciler::new(Box::new(SharedLockstep(store.clone())));
        let decline = Reconciler::new(Box::new(SharedLockstep(store)));
        let reference = ReferenceId::new("ref-big").unwrap();

        let (confirmed, declined) = tokio::join!(
            confirm.settle(&reference, Settlement::Confirmed),
            decline.settle(
                &reference,
                Settlement::Declined {
                    reason: "issuer declined".into(),
                },
            ),
        );

        let stored = inner.find_by_reference(&reference).await.unwrap().unwrap();
        let (winner, loser) = match (confirmed, declined) {
            (Ok(Some(winner)), Err(loser)) | (Err(loser), Ok(Some(winner))) => (winner, loser),
            other => panic!("expected exactly one settlement to apply, got {other:?}"),
        };
        assert_eq!(winner, stored);
        assert!(matches!(
            loser,
            PaymentError::InvalidTransition { from, .. } if from == stored.status
        ));
    }
}
