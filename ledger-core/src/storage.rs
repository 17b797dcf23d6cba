//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `entries` - Append-only entry log (key: entry_id)
//! - `idempotency` - Idempotency key -> entry_id (enforces at-most-once)
//! - `indices` - Secondary index: length-framed subject_id || entry_id
//! - `reversals` - Original entry_id -> reversal entry_id

use crate::{
    error::{Error, Result},
    types::{LedgerEntry, SubjectId},
    Config,
};
use parking_lot::Mutex;
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_ENTRIES: &str = "entries";
const CF_IDEMPOTENCY: &str = "idempotency";
const CF_INDICES: &str = "indices";
const CF_REVERSALS: &str = "reversals";

/// Storage wrapper for RocksDB
///
/// All mutations go through [`Storage::insert_entry`], which serializes the
/// check-then-write section so the idempotency invariant holds under
/// concurrent awards.
pub struct Storage {
    db: Arc<DB>,

    /// Serializes insert check-then-write sections
    write_lock: Mutex<()>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ENTRIES, Options::default()),
            ColumnFamilyDescriptor::new(CF_IDEMPOTENCY, Options::default()),
            ColumnFamilyDescriptor::new(CF_INDICES, Options::default()),
            ColumnFamilyDescriptor::new(CF_REVERSALS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = %path.display(), "Opened ledger RocksDB");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    /// Insert entry if its idempotency key is unseen (atomic)
    ///
    /// Returns `Ok(false)` without writing when an entry with the same
    /// idempotency key already exists. For reversal entries the reversal
    /// index is checked and written in the same critical section; a second
    /// reversal of the same original fails with [`Error::AlreadyReversed`].
    pub fn insert_entry(&self, entry: &LedgerEntry) -> Result<bool> {
        let _guard = self.write_lock.lock();

        let cf_idem = self.cf_handle(CF_IDEMPOTENCY)?;
        if self.db.get_cf(&cf_idem, entry.idempotency_key)?.is_some() {
            tracing::debug!(
                entry_id = %entry.entry_id,
                subject_id = %entry.subject_id,
                action = %entry.action,
                "Duplicate idempotency key, entry not applied"
            );
            return Ok(false);
        }

        let cf_reversals = self.cf_handle(CF_REVERSALS)?;
        if let Some(original) = entry.reverses {
            if self.db.get_cf(&cf_reversals, original.as_bytes())?.is_some() {
                return Err(Error::AlreadyReversed(original.to_string()));
            }
        }

        let mut batch = WriteBatch::default();

        // 1. Entry
        let cf_entries = self.cf_handle(CF_ENTRIES)?;
        batch.put_cf(&cf_entries, entry.entry_id.as_bytes(), bincode::serialize(entry)?);

        // 2. Idempotency key -> entry_id
        batch.put_cf(&cf_idem, entry.idempotency_key, entry.entry_id.as_bytes());

        // 3. Index: subject_id || entry_id -> empty
        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            &cf_indices,
            Self::index_key_subject_entry(&entry.subject_id, Some(entry.entry_id)),
            [],
        );

        // 4. Reversal index
        if let Some(original) = entry.reverses {
            batch.put_cf(&cf_reversals, original.as_bytes(), entry.entry_id.as_bytes());
        }

        self.db.write(batch)?;

        tracing::debug!(
            entry_id = %entry.entry_id,
            subject_id = %entry.subject_id,
            action = %entry.action,
            points = entry.points,
            "Entry appended"
        );

        Ok(true)
    }

    /// Get entry by ID
    pub fn get_entry(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        let cf = self.cf_handle(CF_ENTRIES)?;

        let value = self
            .db
            .get_cf(&cf, entry_id.as_bytes())?
            .ok_or_else(|| Error::EntryNotFound(entry_id.to_string()))?;

        let entry: LedgerEntry = bincode::deserialize(&value)?;
        Ok(entry)
    }

    /// Find entry by idempotency key
    pub fn find_by_idempotency_key(&self, key: &[u8; 32]) -> Result<Option<LedgerEntry>> {
        let cf = self.cf_handle(CF_IDEMPOTENCY)?;

        match self.db.get_cf(&cf, key)? {
            Some(id_bytes) => {
                let entry_id = Self::uuid_from_bytes(&id_bytes)?;
                Ok(Some(self.get_entry(entry_id)?))
            }
            None => Ok(None),
        }
    }

    /// Entry ID of the reversal for `original`, if one exists
    pub fn reversal_of(&self, original: Uuid) -> Result<Option<Uuid>> {
        let cf = self.cf_handle(CF_REVERSALS)?;

        match self.db.get_cf(&cf, original.as_bytes())? {
            Some(id_bytes) => Ok(Some(Self::uuid_from_bytes(&id_bytes)?)),
            None => Ok(None),
        }
    }

    /// Get all entries for a subject, oldest first (entry IDs are UUIDv7)
    pub fn entries_for_subject(&self, subject: &SubjectId) -> Result<Vec<LedgerEntry>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let prefix = Self::index_key_subject_entry(subject, None);

        let iter = self
            .db
            .iterator_cf(&cf_indices, IteratorMode::From(&prefix, rocksdb::Direction::Forward));

        let mut entries = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }

            let entry_id = Self::uuid_from_bytes(&key[prefix.len()..])?;
            entries.push(self.get_entry(entry_id)?);
        }

        Ok(entries)
    }

    /// Sum of all entry points for a subject under a single snapshot
    ///
    /// The snapshot prevents a reader from observing half of a concurrent
    /// award (phantom totals).
    pub fn balance_of(&self, subject: &SubjectId) -> Result<i64> {
        let snapshot = self.db.snapshot();
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let cf_entries = self.cf_handle(CF_ENTRIES)?;
        let prefix = Self::index_key_subject_entry(subject, None);

        let iter = snapshot
            .iterator_cf(&cf_indices, IteratorMode::From(&prefix, rocksdb::Direction::Forward));

        let mut balance = 0i64;
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }

            let entry_id = Self::uuid_from_bytes(&key[prefix.len()..])?;
            let value = snapshot
                .get_cf(&cf_entries, entry_id.as_bytes())?
                .ok_or_else(|| Error::EntryNotFound(entry_id.to_string()))?;
            let entry: LedgerEntry = bincode::deserialize(&value)?;
            balance += entry.points;
        }

        Ok(balance)
    }

    // Index key helpers

    /// Length-framed subject prefix. Subject IDs are opaque strings, so a
    /// separator byte could occur inside one; the length frame keeps a
    /// subject whose name extends another's from sharing its prefix.
    fn index_key_subject_entry(subject: &SubjectId, entry_id: Option<Uuid>) -> Vec<u8> {
        let name = subject.as_str().as_bytes();
        let mut key = Vec::with_capacity(4 + name.len() + 16);
        key.extend_from_slice(&(name.len() as u32).to_be_bytes());
        key.extend_from_slice(name);
        if let Some(id) = entry_id {
            key.extend_from_slice(id.as_bytes());
        }
        key
    }

    fn uuid_from_bytes(bytes: &[u8]) -> Result<Uuid> {
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| Error::Storage("Malformed UUID key in index".to_string()))?;
        Ok(Uuid::from_bytes(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{idempotency_key, LedgerAction};
    use chrono::Utc;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn test_entry(subject: &str, reference: &str) -> LedgerEntry {
        let subject_id = SubjectId::new(subject);
        LedgerEntry {
            entry_id: Uuid::now_v7(),
            idempotency_key: idempotency_key(
                &subject_id,
                LedgerAction::RiskAssessmentCompleted,
                reference,
            ),
            subject_id,
            action: LedgerAction::RiskAssessmentCompleted,
            points: 150,
            created_at: Utc::now(),
            reason: "assessment completed".to_string(),
            reverses: None,
        }
    }

    #[test]
    fn test_insert_and_get_entry() {
        let (storage, _temp) = test_storage();

        let entry = test_entry("U1", "S1");
        assert!(storage.insert_entry(&entry).unwrap());

        let retrieved = storage.get_entry(entry.entry_id).unwrap();
        assert_eq!(retrieved.entry_id, entry.entry_id);
        assert_eq!(retrieved.points, 150);
    }

    #[test]
    fn test_duplicate_idempotency_key_not_applied() {
        let (storage, _temp) = test_storage();

        let first = test_entry("U1", "S1");
        assert!(storage.insert_entry(&first).unwrap());

        // Same subject/action/reference, fresh entry id
        let mut duplicate = test_entry("U1", "S1");
        duplicate.entry_id = Uuid::now_v7();
        assert!(!storage.insert_entry(&duplicate).unwrap());

        let entries = storage.entries_for_subject(&SubjectId::new("U1")).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_balance_sums_entries() {
        let (storage, _temp) = test_storage();

        storage.insert_entry(&test_entry("U1", "S1")).unwrap();
        storage.insert_entry(&test_entry("U1", "S2")).unwrap();
        storage.insert_entry(&test_entry("U2", "S3")).unwrap();

        assert_eq!(storage.balance_of(&SubjectId::new("U1")).unwrap(), 300);
        assert_eq!(storage.balance_of(&SubjectId::new("U2")).unwrap(), 150);
        assert_eq!(storage.balance_of(&SubjectId::new("U3")).unwrap(), 0);
    }

    #[test]
    fn test_reversal_index_blocks_second_reversal() {
        let (storage, _temp) = test_storage();

        let original = test_entry("U1", "S1");
        storage.insert_entry(&original).unwrap();

        let subject_id = SubjectId::new("U1");
        let reversal = LedgerEntry {
            entry_id: Uuid::now_v7(),
            idempotency_key: idempotency_key(
                &subject_id,
                LedgerAction::Reversal,
                &original.entry_id.to_string(),
            ),
            subject_id: subject_id.clone(),
            action: LedgerAction::Reversal,
            points: -150,
            created_at: Utc::now(),
            reason: "duplicate submission".to_string(),
            reverses: Some(original.entry_id),
        };
        assert!(storage.insert_entry(&reversal).unwrap());
        assert_eq!(
            storage.reversal_of(original.entry_id).unwrap(),
            Some(reversal.entry_id)
        );

        let mut second = reversal.clone();
        second.entry_id = Uuid::now_v7();
        second.idempotency_key = idempotency_key(
            &subject_id,
            LedgerAction::Reversal,
            &format!("{}-retry", original.entry_id),
        );
        let err = storage.insert_entry(&second).unwrap_err();
        assert!(matches!(err, Error::AlreadyReversed(_)));
    }

    #[test]
    fn test_subject_index_isolates_prefix_sharing_subjects() {
        let (storage, _temp) = test_storage();

        storage.insert_entry(&test_entry("U1", "S1")).unwrap();
        storage.insert_entry(&test_entry("U1|evil", "S2")).unwrap();

        assert_eq!(storage.balance_of(&SubjectId::new("U1")).unwrap(), 150);
        let entries = storage.entries_for_subject(&SubjectId::new("U1")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subject_id, SubjectId::new("U1"));

        assert_eq!(storage.balance_of(&SubjectId::new("U1|evil")).unwrap(), 150);
    }

    #[test]
    fn test_entries_for_subject_chronological() {
        let (storage, _temp) = test_storage();

        for reference in ["S1", "S2", "S3"] {
            storage.insert_entry(&test_entry("U1", reference)).unwrap();
        }

        let entries = storage.entries_for_subject(&SubjectId::new("U1")).unwrap();
        assert_eq!(entries.len(), 3);
        for pair in entries.windows(2) {
            assert!(pair[0].entry_id <= pair[1].entry_id);
        }
    }
}
