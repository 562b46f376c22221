use crate::application::admission::Admission;
use crate::domain::payment::{
    Amount, Currency, PaymentId, PaymentRecord, PaymentStatus, ReferenceId,
};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// How a record came to be written: the boundary-level response signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOutcome {
    Created,
    Replayed,
    Found,
    Settled,
}

impl From<&Admission> for RecordOutcome {
    fn from(admission: &Admission) -> Self {
        match admission {
            Admission::Created(_) => RecordOutcome::Created,
            Admission::Replayed(_) => RecordOutcome::Replayed,
        }
    }
}

#[derive(Serialize)]
struct RecordRow<'a> {
    reference: &'a ReferenceId,
    outcome: RecordOutcome,
    id: &'a PaymentId,
    amount: &'a Amount,
    currency: &'a Currency,
    status: PaymentStatus,
    failure_reason: Option<&'a str>,
    created_at: &'a DateTime<Utc>,
    updated_at: Option<&'a DateTime<Utc>>,
}

/// Writes payment records as CSV, one row per record.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_record(&mut self, record: &PaymentRecord, outcome: RecordOutcome) -> Result<()> {
        self.writer.serialize(RecordRow {
            reference: &record.reference_id,
            outcome,
            id: &record.id,
            amount: &record.amount,
            currency: &record.currency,
            status: record.status,
            failure_reason: record.failure_reason.as_deref(),
            created_at: &record.created_at,
            updated_at: record.updated_at.as_ref(),
        })?;
        Ok(())
    }

    pub fn write_admissions<'a, I>(&mut self, admissions: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Admission>,
    {
        for admission in admissions {
            self.write_record(admission.record(), admission.into())?;
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
