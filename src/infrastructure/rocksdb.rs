use crate::domain::payment::{PaymentRecord, PaymentStatus, ReferenceId};
use crate::domain::ports::{PaymentStore, StoreError, StoreResult};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing payment records, keyed by reference.
pub const CF_PAYMENTS: &str = "payments";

impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// A persistent store implementation using RocksDB.
///
/// Records are stored as JSON under their reference. RocksDB locks its
/// directory to a single process, so the write guard below is enough to
/// make the reference unique: every insert probes for the key and writes it
/// while holding the guard. Updates compare the stored status under the same
/// guard.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>` and
/// the insert guard).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_guard: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "payments" column family exists.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments])?;

        Ok(Self {
            db: Arc::new(db),
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    fn payments(&self) -> StoreResult<&ColumnFamily> {
        self.db
            .cf_handle(CF_PAYMENTS)
            .ok_or_else(|| StoreError::Unavailable("Payments column family not found".into()))
    }

    fn read(&self, key: &str) -> StoreResult<Option<PaymentRecord>> {
        let cf = self.payments()?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("Deserialization error: {e}"))),
            None => Ok(None),
        }
    }

    fn write(&self, record: &PaymentRecord) -> StoreResult<()> {
        let cf = self.payments()?;
        let value = serde_json::to_vec(record)
            .map_err(|e| StoreError::Serialization(format!("Serialization error: {e}")))?;
        self.db.put_cf(cf, record.reference_id.as_str(), value)?;
        Ok(())
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        let cf = self.payments()?;
        // Just check if the key exists without copying the value out
        Ok(self.db.get_pinned_cf(cf, key.as_bytes())?.is_some())
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn find_by_reference(
        &self,
        reference_id: &ReferenceId,
    ) -> StoreResult<Option<PaymentRecord>> {
        self.read(reference_id.as_str())
    }

    async fn insert(&self, record: PaymentRecord) -> StoreResult<PaymentRecord> {
        let _guard = self.write_guard.lock().await;
        if self.exists(record.reference_id.as_str())? {
            return Err(StoreError::UniquenessViolation {
                reference_id: record.reference_id.to_string(),
            });
        }
        self.write(&record)?;
        Ok(record)
    }

    async fn update(&self, record: PaymentRecord, expected: PaymentStatus) -> StoreResult<()> {
        let _guard = self.write_guard.lock().await;
        let Some(stored) = self.read(record.reference_id.as_str())? else {
            return Err(StoreError::Missing {
                reference_id: record.reference_id.to_string(),
            });
        };
        if stored.status != expected {
            return Err(StoreError::StatusChanged {
                reference_id: record.reference_id.to_string(),
                expected,
                found: stored.status,
            });
        }
        self.write(&record)
    }
}
