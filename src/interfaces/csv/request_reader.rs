use crate::domain::payment::{PaymentRequest, PaymentSubmission};
use crate::error::{PaymentError, Result};
use std::io::Read;

/// Reads payment submissions from a CSV source.
///
/// Expects a `reference, amount, currency` header. Each row is deserialized
/// and then shape-validated, so the iterator only yields requests the
/// admission core can accept as-is.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates requests.
    pub fn requests(self) -> impl Iterator<Item = Result<PaymentRequest>> {
        self.reader.into_deserialize().map(|result| {
            let submission: PaymentSubmission = result.map_err(PaymentError::from)?;
            PaymentRequest::try_from(submission)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "reference, amount, currency\nref-1, 100.00, USD\nref-2, 0.5, gbp";
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentRequest>> = reader.requests().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.reference_id.as_str(), "ref-1");
        assert_eq!(first.amount.value(), dec!(100));
        let second = results[1].as_ref().unwrap();
        assert_eq!(second.currency.code(), "GBP");
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "reference, amount, currency\nref-1, lots, USD";
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentRequest>> = reader.requests().collect();

        assert!(matches!(results[0], Err(PaymentError::CsvError(_))));
    }

    #[test]
    fn test_reader_rejects_bad_shapes() {
        let data = "reference, amount, currency\n\
                    ref-1, 0, USD\n\
                    ref-2, 10, DOLLARS\n\
                    , 10, USD\n\
                    ref-4, 10, EUR";
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentRequest>> = reader.requests().collect();

        assert_eq!(results.len(), 4);
        for bad in &results[..3] {
            assert!(matches!(bad, Err(PaymentError::ValidationError(_))));
        }
        assert!(results[3].is_ok());
    }
}
