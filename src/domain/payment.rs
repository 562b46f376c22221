use super::evaluator::Outcome;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of fractional digits every stored amount carries.
pub const AMOUNT_SCALE: u32 = 4;

/// Longest caller-supplied reference accepted, in characters.
pub const MAX_REFERENCE_LEN: usize = 128;

/// Opaque identifier assigned to a payment when it is first admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(Uuid);

impl PaymentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Caller-supplied idempotency key.
///
/// Between 1 and 128 characters. Two submissions carrying the same reference
/// are the same payment, whatever else they contain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceId(String);

impl ReferenceId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let len = value.chars().count();
        if (1..=MAX_REFERENCE_LEN).contains(&len) {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(format!(
                "Reference must be 1 to {MAX_REFERENCE_LEN} characters, got {len}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReferenceId {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ReferenceId> for String {
    fn from(reference: ReferenceId) -> Self {
        reference.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a positive monetary amount with exactly 4 decimal places.
///
/// Inputs with more than 4 significant fractional digits are refused rather
/// than rounded, so the stored value is always the submitted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }

        let mut value = value.normalize();
        if value.scale() > AMOUNT_SCALE {
            return Err(PaymentError::ValidationError(format!(
                "Amount {value} has more than {AMOUNT_SCALE} decimal places"
            )));
        }
        value.rescale(AMOUNT_SCALE);
        // Rescaling stops short when the integer part leaves no room for four digits.
        if value.scale() != AMOUNT_SCALE {
            return Err(PaymentError::ValidationError(format!(
                "Amount {value} is too large to carry {AMOUNT_SCALE} decimal places"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Three-letter currency code, normalised to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self> {
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(PaymentError::ValidationError(format!(
                "Currency must be a 3-letter code, got '{code}'"
            )))
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Rejected,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Processing => "Processing",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Rejected => "Rejected",
            PaymentStatus::Failed => "Failed",
        }
    }

    /// Transitions allowed outside of admission, i.e. by reconciliation.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Processing)
                | (PaymentStatus::Processing, PaymentStatus::Completed)
                | (PaymentStatus::Processing, PaymentStatus::Failed)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Processing" => Ok(PaymentStatus::Processing),
            "Completed" => Ok(PaymentStatus::Completed),
            "Rejected" => Ok(PaymentStatus::Rejected),
            "Failed" => Ok(PaymentStatus::Failed),
            other => Err(PaymentError::ValidationError(format!(
                "Unknown payment status '{other}'"
            ))),
        }
    }
}

/// A payment submission as it arrives at the boundary, before shape validation.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PaymentSubmission {
    pub reference: String,
    pub amount: Decimal,
    pub currency: String,
}

/// A shape-validated payment submission, ready for admission.
#[derive(Debug, PartialEq, Clone)]
pub struct PaymentRequest {
    pub reference_id: ReferenceId,
    pub amount: Amount,
    pub currency: Currency,
}

impl PaymentRequest {
    pub fn new(reference_id: ReferenceId, amount: Amount, currency: Currency) -> Self {
        Self {
            reference_id,
            amount,
            currency,
        }
    }
}

impl TryFrom<PaymentSubmission> for PaymentRequest {
    type Error = PaymentError;

    fn try_from(submission: PaymentSubmission) -> Result<Self> {
        Ok(Self {
            reference_id: ReferenceId::new(submission.reference)?,
            amount: Amount::new(submission.amount)?,
            currency: Currency::new(&submission.currency)?,
        })
    }
}

/// The durable record of an admitted payment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRecord {
    pub id: PaymentId,
    /// Unique across every record ever stored.
    pub reference_id: ReferenceId,
    pub amount: Amount,
    pub currency: Currency,
    pub status: PaymentStatus,
    /// Only set for `Rejected` and `Failed`.
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `None` until the first status change after admission.
    pub updated_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    /// Builds the initial record for a request the evaluator has classified.
    pub fn admit(request: PaymentRequest, outcome: Outcome, now: DateTime<Utc>) -> Self {
        Self {
            id: PaymentId::new(),
            reference_id: request.reference_id,
            amount: request.amount,
            currency: request.currency,
            status: outcome.status,
            failure_reason: outcome.failure_reason,
            created_at: now,
            updated_at: None,
        }
    }

    /// Moves the record to `next`, stamping `updated_at`.
    ///
    /// `failure_reason` is kept only when `next` is a failure state.
    pub fn transition(
        &mut self,
        next: PaymentStatus,
        failure_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(PaymentError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.failure_reason = match next {
            PaymentStatus::Rejected | PaymentStatus::Failed => failure_reason,
            _ => None,
        };
        self.updated_at = Some(now);
        Ok(())
    }
}
