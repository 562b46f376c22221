//! Operator-tunable settings for admission.
//!
//! Values come from the built-in defaults, optionally overlaid by a JSON file;
//! the binary applies command-line and environment overrides on top.

use crate::application::admission::ReplayPolicy;
use crate::domain::evaluator::OutcomeEvaluator;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdmissionConfig {
    /// Currency codes whose payments are rejected outright.
    pub rejected_currencies: Vec<String>,
    /// Amounts strictly above this are left `Processing`.
    pub large_amount_threshold: Decimal,
    /// Reads a losing admission makes for the winning record.
    pub replay_attempts: u32,
    pub replay_backoff_ms: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            rejected_currencies: vec!["XTS".to_string()],
            large_amount_threshold: dec!(50000),
            replay_attempts: 3,
            replay_backoff_ms: 25,
        }
    }
}

impl AdmissionConfig {
    /// Loads a JSON config file; keys it omits keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.replay_attempts == 0 {
            return Err(PaymentError::ValidationError(
                "replay_attempts must be at least 1".to_string(),
            ));
        }
        if self.large_amount_threshold.is_sign_negative() {
            return Err(PaymentError::ValidationError(
                "large_amount_threshold must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn evaluator(&self) -> OutcomeEvaluator {
        OutcomeEvaluator::new(&self.rejected_currencies, self.large_amount_threshold)
    }

    pub fn replay_policy(&self) -> ReplayPolicy {
        ReplayPolicy {
            attempts: self.replay_attempts,
            backoff: Duration::from_millis(self.replay_backoff_ms),
        }
    }
}
