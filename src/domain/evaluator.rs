use super::payment::{PaymentRequest, PaymentStatus};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// The classification the evaluator assigns to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
}

/// Decides the simulated outcome of a payment.
///
/// Rules are checked in order and the first match wins:
/// 1. a currency in the rejected set yields `Rejected`,
/// 2. an amount strictly above the large-amount threshold yields `Processing`,
/// 3. anything else is `Completed`.
///
/// The evaluator holds only its configuration and never performs I/O, so the
/// same request always produces the same outcome.
#[derive(Debug, Clone)]
pub struct OutcomeEvaluator {
    rejected_currencies: HashSet<String>,
    large_amount_threshold: Decimal,
}

impl OutcomeEvaluator {
    /// Currency codes are matched case-insensitively.
    pub fn new<I, S>(rejected_currencies: I, large_amount_threshold: Decimal) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rejected_currencies: rejected_currencies
                .into_iter()
                .map(|code| code.as_ref().trim().to_ascii_uppercase())
                .collect(),
            large_amount_threshold,
        }
    }

    pub fn large_amount_threshold(&self) -> Decimal {
        self.large_amount_threshold
    }

    pub fn is_rejected_currency(&self, code: &str) -> bool {
        self.rejected_currencies.contains(&code.to_ascii_uppercase())
    }

    pub fn evaluate(&self, request: &PaymentRequest) -> Outcome {
        let currency = request.currency.code();
        if self.is_rejected_currency(currency) {
            return Outcome {
                status: PaymentStatus::Rejected,
                failure_reason: Some(format!("Currency {currency} is not accepted")),
            };
        }

        if request.amount.value() > self.large_amount_threshold {
            return Outcome {
                status: PaymentStatus::Processing,
                failure_reason: None,
            };
        }

        Outcome {
            status: PaymentStatus::Completed,
            failure_reason: None,
        }
    }
}
