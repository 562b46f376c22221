use crate::domain::evaluator::OutcomeEvaluator;
use crate::domain::payment::{PaymentRecord, PaymentRequest, ReferenceId};
use crate::domain::ports::{PaymentStoreBox, StoreError};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Result of an admission: either a freshly stored record or the one that
/// already existed for the reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Created(PaymentRecord),
    Replayed(PaymentRecord),
}

impl Admission {
    pub fn record(&self) -> &PaymentRecord {
        match self {
            Admission::Created(record) | Admission::Replayed(record) => record,
        }
    }

    pub fn into_record(self) -> PaymentRecord {
        match self {
            Admission::Created(record) | Admission::Replayed(record) => record,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Admission::Created(_))
    }
}

/// How hard a loser of the insert race tries to read the winner's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for ReplayPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(25),
        }
    }
}

/// Admits payments at most once per reference.
///
/// The coordinator keeps no state of its own between calls. Lookups and
/// inserts are optimistic; the store's uniqueness constraint on the
/// reference settles concurrent admissions, and the loser replays the
/// winner's record instead of failing.
pub struct AdmissionCoordinator {
    store: PaymentStoreBox,
    evaluator: OutcomeEvaluator,
    replay_policy: ReplayPolicy,
}

impl AdmissionCoordinator {
    /// Creates a new `AdmissionCoordinator`.
    ///
    /// # Arguments
    ///
    /// * `store` - The store holding payment records.
    /// * `evaluator` - Classifies requests that have no stored record yet.
    pub fn new(store: PaymentStoreBox, evaluator: OutcomeEvaluator) -> Self {
        Self {
            store,
            evaluator,
            replay_policy: ReplayPolicy::default(),
        }
    }

    pub fn with_replay_policy(mut self, replay_policy: ReplayPolicy) -> Self {
        self.replay_policy = replay_policy;
        self
    }

    /// Admits a payment request.
    ///
    /// If a record already exists for the reference it is returned untouched
    /// and the request's amount and currency are ignored.
    #[instrument(skip_all, fields(reference_id = %request.reference_id))]
    pub async fn admit(&self, request: PaymentRequest) -> Result<Admission> {
        if let Some(existing) = self.store.find_by_reference(&request.reference_id).await? {
            debug!(payment_id = %existing.id, "replaying stored payment");
            return Ok(Admission::Replayed(existing));
        }

        let reference_id = request.reference_id.clone();
        let outcome = self.evaluator.evaluate(&request);
        let record = PaymentRecord::admit(request, outcome, Utc::now());

        match self.store.insert(record).await {
            Ok(stored) => {
                info!(payment_id = %stored.id, status = %stored.status, "payment admitted");
                Ok(Admission::Created(stored))
            }
            Err(StoreError::UniquenessViolation { .. }) => {
                warn!("lost admission race, reading the winning record");
                self.read_winner(&reference_id).await.map(Admission::Replayed)
            }
            Err(err) => {
                // The failed write may still have been raced by a successful one.
                match self.store.find_by_reference(&reference_id).await {
                    Ok(Some(existing)) => {
                        warn!(error = %err, "insert failed but the payment exists, replaying it");
                        Ok(Admission::Replayed(existing))
                    }
                    _ => Err(err.into()),
                }
            }
        }
    }

    /// Looks up a payment by its reference. A missing record is `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn find_by_reference(
        &self,
        reference_id: &ReferenceId,
    ) -> Result<Option<PaymentRecord>> {
        Ok(self.store.find_by_reference(reference_id).await?)
    }

    async fn read_winner(&self, reference_id: &ReferenceId) -> Result<PaymentRecord> {
        let attempts = self.replay_policy.attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(existing) = self.store.find_by_reference(reference_id).await? {
                return Ok(existing);
            }
            debug!(attempt, "winning payment not visible yet");
            if attempt < attempts {
                tokio::time::sleep(self.replay_policy.backoff).await;
            }
        }

        Err(PaymentError::ReplayNotVisible {
            reference_id: reference_id.to_string(),
            attempts,
        })
    }
}
