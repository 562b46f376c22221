use crate::domain::payment::PaymentStatus;
use crate::domain::ports::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Storage error: {0}")]
    StorageError(#[from] StoreError),
    /// A concurrent admission won the insert race but its record did not
    /// become readable within the retry budget.
    #[error(
        "payment '{reference_id}' was admitted concurrently but is not visible after {attempts} reads"
    )]
    ReplayNotVisible { reference_id: String, attempts: u32 },
    #[error("cannot move payment from {from} to {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

pub type Result<T> = std::result::Result<T, PaymentError>;
