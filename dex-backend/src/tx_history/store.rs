//! Persistent transaction history store

use parking_lot::Mutex;
use std::sync::Arc;
use trade_queue_types::TxRecordStatus;

use super::types::{NewTransactionRecord, TransactionRecord, TransactionRecordUpdate};
use crate::db::KeyValueStorage;
use crate::domain_types::same_address;

/// Bounded transaction log persisted as one JSON array.
///
/// Storage failures never reach the caller: unreadable or corrupt state reads
/// as an empty history and failed writes are logged.
pub struct TxHistoryStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    max_records: usize,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl TxHistoryStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: &str, max_records: usize) -> Self {
        Self {
            storage,
            key: key.to_string(),
            max_records: max_records.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    fn load(&self) -> Vec<TransactionRecord> {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("[TxHistory] Failed to read {}: {}", self.key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("[TxHistory] Discarding corrupt history under {}: {}", self.key, e);
                Vec::new()
            }
        }
    }

    fn save(&self, records: &[TransactionRecord]) {
        let json = match serde_json::to_string(records) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("[TxHistory] Failed to serialize history: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set_item(&self.key, &json) {
            log::warn!("[TxHistory] Failed to persist {} records: {}", records.len(), e);
        }
    }

    /// Record a new transaction. It becomes the first entry; the oldest entries
    /// beyond `max_records` are dropped.
    pub fn add(&self, req: NewTransactionRecord) -> TransactionRecord {
        let _guard = self.write_lock.lock();
        let record = TransactionRecord::from_new(uuid::Uuid::new_v4().to_string(), req);

        let mut records = self.load();
        records.insert(0, record.clone());
        records.truncate(self.max_records);
        self.save(&records);

        log::info!(
            "[TxHistory] Recorded {} {} for {}",
            record.tx_type,
            record.hash,
            record.user_address
        );
        record
    }

    /// Merge `update` into the record with `id`. Returns false if no such record exists.
    pub fn update(&self, id: &str, update: TransactionRecordUpdate) -> bool {
        self.update_where(|r| r.id == id, update)
    }

    /// Merge `update` into the record carrying transaction `hash`
    pub fn update_by_hash(&self, hash: &str, update: TransactionRecordUpdate) -> bool {
        self.update_where(|r| r.hash.eq_ignore_ascii_case(hash), update)
    }

    fn update_where<F>(&self, matches: F, update: TransactionRecordUpdate) -> bool
    where
        F: Fn(&TransactionRecord) -> bool,
    {
        let _guard = self.write_lock.lock();
        let mut records = self.load();
        match records.iter_mut().find(|r| matches(r)) {
            Some(record) => {
                record.apply(update);
                self.save(&records);
                true
            }
            None => false,
        }
    }

    pub fn find_by_hash(&self, hash: &str) -> Option<TransactionRecord> {
        self.load()
            .into_iter()
            .find(|r| r.hash.eq_ignore_ascii_case(hash))
    }

    /// All records, newest first
    pub fn get_all(&self) -> Vec<TransactionRecord> {
        self.load()
    }

    pub fn get_for_user(&self, address: &str) -> Vec<TransactionRecord> {
        self.load()
            .into_iter()
            .filter(|r| same_address(&r.user_address, address))
            .collect()
    }

    pub fn get_pending(&self) -> Vec<TransactionRecord> {
        self.load()
            .into_iter()
            .filter(|r| r.status == TxRecordStatus::Pending)
            .collect()
    }

    /// Remove every record owned by `address`. Returns the number removed.
    pub fn clear_for_user(&self, address: &str) -> usize {
        let _guard = self.write_lock.lock();
        let mut records = self.load();
        let before = records.len();
        records.retain(|r| !same_address(&r.user_address, address));
        let removed = before - records.len();
        self.save(&records);

        if removed > 0 {
            log::info!("[TxHistory] Cleared {} records for {}", removed, address);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, MemoryStorage};
    use trade_queue_types::TxType;

    const ALICE: &str = "0xAbC0000000000000000000000000000000000001";
    const BOB: &str = "0x000000000000000000000000000000000000b0b0";

    fn memory_store(max: usize) -> TxHistoryStore {
        TxHistoryStore::new(Arc::new(MemoryStorage::new()), "history", max)
    }

    fn deposit(hash: &str, user: &str) -> NewTransactionRecord {
        NewTransactionRecord::pending(hash, TxType::Deposit, "10", user)
    }

    /// Storage that fails every operation
    struct BrokenStorage;

    impl KeyValueStorage for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>, String> {
            Err("quota exceeded".to_string())
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<(), String> {
            Err("quota exceeded".to_string())
        }
        fn remove_item(&self, _key: &str) -> Result<(), String> {
            Err("quota exceeded".to_string())
        }
    }

    #[test]
    fn test_newest_first() {
        let store = memory_store(10);
        store.add(deposit("0x01", ALICE));
        store.add(deposit("0x02", ALICE));

        let all = store.get_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].hash, "0x02");
        assert_eq!(all[1].hash, "0x01");
    }

    #[test]
    fn test_bounded_evicts_oldest() {
        let store = memory_store(100);
        for i in 0..101 {
            store.add(deposit(&format!("0x{:04x}", i), ALICE));
        }

        let all = store.get_all();
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].hash, "0x0064");
        assert!(store.find_by_hash("0x0000").is_none());
        assert!(store.find_by_hash("0x0001").is_some());
    }

    #[test]
    fn test_update_by_id() {
        let store = memory_store(10);
        let record = store.add(deposit("0xaa", ALICE));

        assert!(store.update(&record.id, TransactionRecordUpdate::confirmed(42, "21000")));

        let updated = store.find_by_hash("0xaa").unwrap();
        assert_eq!(updated.status, TxRecordStatus::Success);
        assert_eq!(updated.block_number, Some(42));
        assert_eq!(updated.gas_used.as_deref(), Some("21000"));
        assert_eq!(updated.amount, "10");
    }

    #[test]
    fn test_update_missing_returns_false() {
        let store = memory_store(10);
        store.add(deposit("0xaa", ALICE));
        assert!(!store.update("nope", TransactionRecordUpdate::failed("x")));
        assert_eq!(store.get_all()[0].status, TxRecordStatus::Pending);
    }

    #[test]
    fn test_update_by_hash_ignores_case() {
        let store = memory_store(10);
        store.add(deposit("0xABCD", ALICE));
        assert!(store.update_by_hash("0xabcd", TransactionRecordUpdate::failed("reverted")));

        let record = store.find_by_hash("0xabcd").unwrap();
        assert_eq!(record.status, TxRecordStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("reverted"));
    }

    #[test]
    fn test_clear_for_user_case_insensitive() {
        let store = memory_store(10);
        store.add(deposit("0x01", ALICE));
        store.add(deposit("0x02", BOB));
        store.add(deposit("0x03", &ALICE.to_lowercase()));

        let removed = store.clear_for_user(&ALICE.to_uppercase().replacen("0X", "0x", 1));
        assert_eq!(removed, 2);

        let remaining = store.get_all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].hash, "0x02");
    }

    #[test]
    fn test_get_for_user_and_pending() {
        let store = memory_store(10);
        let a = store.add(deposit("0x01", ALICE));
        store.add(deposit("0x02", BOB));
        store.update(&a.id, TransactionRecordUpdate::confirmed(1, "1"));

        assert_eq!(store.get_for_user(&ALICE.to_lowercase()).len(), 1);
        let pending = store.get_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].hash, "0x02");
    }

    #[test]
    fn test_corrupt_state_reads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("history", "{not json").unwrap();
        let store = TxHistoryStore::new(storage.clone(), "history", 10);

        assert!(store.get_all().is_empty());
        assert!(store.find_by_hash("0x01").is_none());

        // Next write replaces the corrupt blob
        store.add(deposit("0x01", ALICE));
        assert_eq!(store.get_all().len(), 1);
    }

    #[test]
    fn test_storage_errors_are_swallowed() {
        let store = TxHistoryStore::new(Arc::new(BrokenStorage), "history", 10);
        let record = store.add(deposit("0x01", ALICE));
        assert_eq!(record.hash, "0x01");
        assert!(store.get_all().is_empty());
        assert!(!store.update(&record.id, TransactionRecordUpdate::failed("x")));
        assert_eq!(store.clear_for_user(ALICE), 0);
    }

    #[test]
    fn test_persists_in_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dex.db");
        let path = path.to_str().unwrap();

        {
            let db: Arc<dyn KeyValueStorage> = Arc::new(Database::new(path).unwrap());
            let store = TxHistoryStore::new(db, "history", 10);
            store.add(deposit("0x01", ALICE));
        }

        let db: Arc<dyn KeyValueStorage> = Arc::new(Database::new(path).unwrap());
        let store = TxHistoryStore::new(db, "history", 10);
        assert_eq!(store.get_all().len(), 1);
    }
}
