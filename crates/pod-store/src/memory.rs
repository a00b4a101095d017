use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use pod_types::Digest;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::record::ContentRecord;
use crate::traits::ContentStore;

/// Retention state of a stored record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinState {
    /// Stored, never pinned or unpinned. Retained.
    Stored,
    /// Explicitly pinned. Retained.
    Pinned,
    /// Explicitly unpinned. Eligible for reclamation.
    Released,
}

struct Entry {
    record: ContentRecord,
    pin: PinState,
}

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Records are held behind a `RwLock`;
/// identical payloads are stored and billed once.
pub struct InMemoryContentStore {
    entries: RwLock<HashMap<Digest, Entry>>,
    billed_bytes: AtomicU64,
    disabled: AtomicBool,
}

impl InMemoryContentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            billed_bytes: AtomicU64::new(0),
            disabled: AtomicBool::new(false),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Bytes charged for storage so far. Deduplicated puts are free.
    pub fn billed_bytes(&self) -> u64 {
        self.billed_bytes.load(Ordering::Relaxed)
    }

    /// Full record (payload plus annotations) for a digest.
    pub fn record(&self, digest: &Digest) -> Option<ContentRecord> {
        self.entries
            .read()
            .expect("lock poisoned")
            .get(digest)
            .map(|e| e.record.clone())
    }

    /// Retention state of a digest.
    pub fn pin_state(&self, digest: &Digest) -> Option<PinState> {
        self.entries
            .read()
            .expect("lock poisoned")
            .get(digest)
            .map(|e| e.pin)
    }

    /// Switch every operation to `StoreError::Disabled` (or back).
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
    }

    /// Overwrite the bytes held under `digest` without rehashing.
    ///
    /// Simulates a compromised or desynchronized store. Returns `false` if
    /// nothing is stored under the digest.
    pub fn corrupt(&self, digest: &Digest, bytes: Vec<u8>) -> bool {
        let mut map = self.entries.write().expect("lock poisoned");
        match map.get_mut(digest) {
            Some(entry) => {
                entry.record.payload = bytes;
                true
            }
            None => false,
        }
    }

    /// Drop every record that was explicitly unpinned. Returns the count.
    pub fn collect_garbage(&self) -> usize {
        let mut map = self.entries.write().expect("lock poisoned");
        let before = map.len();
        map.retain(|_, e| e.pin != PinState::Released);
        let reclaimed = before - map.len();
        debug!(reclaimed, "garbage collected released content");
        reclaimed
    }

    fn check_enabled(&self) -> StoreResult<()> {
        if self.disabled.load(Ordering::Relaxed) {
            Err(StoreError::Disabled)
        } else {
            Ok(())
        }
    }

    fn insert(&self, record: ContentRecord) -> Digest {
        let digest = record.digest;
        let size = record.size() as u64;
        let mut map = self.entries.write().expect("lock poisoned");
        match map.get_mut(&digest) {
            Some(existing) => {
                // Re-storing released content makes it retained again.
                if existing.pin == PinState::Released {
                    existing.pin = PinState::Stored;
                }
            }
            None => {
                map.insert(
                    digest,
                    Entry {
                        record,
                        pin: PinState::Stored,
                    },
                );
                self.billed_bytes.fetch_add(size, Ordering::Relaxed);
            }
        }
        digest
    }

    fn set_pin(&self, digest: &Digest, pin: PinState) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        let entry = map.get_mut(digest).ok_or(StoreError::NotFound(*digest))?;
        entry.pin = pin;
        Ok(())
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(&self, payload: &[u8]) -> StoreResult<Digest> {
        self.check_enabled()?;
        Ok(self.insert(ContentRecord::new(payload.to_vec())))
    }

    async fn get(&self, digest: &Digest) -> StoreResult<Vec<u8>> {
        self.check_enabled()?;
        self.entries
            .read()
            .expect("lock poisoned")
            .get(digest)
            .map(|e| e.record.payload.clone())
            .ok_or(StoreError::NotFound(*digest))
    }

    async fn exists(&self, digest: &Digest) -> StoreResult<bool> {
        self.check_enabled()?;
        Ok(self
            .entries
            .read()
            .expect("lock poisoned")
            .contains_key(digest))
    }

    async fn pin(&self, digest: &Digest) -> StoreResult<()> {
        self.check_enabled()?;
        self.set_pin(digest, PinState::Pinned)
    }

    async fn unpin(&self, digest: &Digest) -> StoreResult<()> {
        self.check_enabled()?;
        self.set_pin(digest, PinState::Released)
    }

    async fn put_record(&self, record: &ContentRecord) -> StoreResult<Digest> {
        self.check_enabled()?;
        if !record.is_intact() {
            return Err(StoreError::HashMismatch {
                expected: record.digest,
                reported: pod_crypto::ContentHasher::CONTENT.hash(&record.payload),
            });
        }
        Ok(self.insert(record.clone()))
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("record_count", &self.len())
            .field("billed_bytes", &self.billed_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MessageContent;
    use crate::traits::ContentStoreExt;
    use pod_crypto::ContentHasher;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn put_get_roundtrip() {
        let store = InMemoryContentStore::new();
        let digest = store.put(b"hello world").await.unwrap();
        assert_eq!(digest, ContentHasher::CONTENT.hash(b"hello world"));
        assert_eq!(store.get(&digest).await.unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn put_is_idempotent_and_billed_once() {
        let store = InMemoryContentStore::new();
        let d1 = store.put(b"same").await.unwrap();
        let d2 = store.put(b"same").await.unwrap();
        assert_eq!(d1, d2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.billed_bytes(), 4);
    }

    #[tokio::test]
    async fn concurrent_identical_puts_store_once() {
        let store = Arc::new(InMemoryContentStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.put(b"racy").await.unwrap() }));
        }
        let mut digests = Vec::new();
        for h in handles {
            digests.push(h.await.unwrap());
        }
        digests.dedup();
        assert_eq!(digests.len(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.billed_bytes(), 4);
    }

    #[tokio::test]
    async fn missing_digest_is_not_found() {
        let store = InMemoryContentStore::new();
        let digest = Digest::from_hash([3; 32]);
        assert_eq!(store.get(&digest).await, Err(StoreError::NotFound(digest)));
        assert!(!store.exists(&digest).await.unwrap());
    }

    #[tokio::test]
    async fn only_released_content_is_collected() {
        let store = InMemoryContentStore::new();
        let kept = store.put(b"kept").await.unwrap();
        let pinned = store.put(b"pinned").await.unwrap();
        let released = store.put(b"released").await.unwrap();
        store.pin(&pinned).await.unwrap();
        store.unpin(&released).await.unwrap();

        assert_eq!(store.collect_garbage(), 1);
        assert!(store.exists(&kept).await.unwrap());
        assert!(store.exists(&pinned).await.unwrap());
        assert!(!store.exists(&released).await.unwrap());
    }

    #[tokio::test]
    async fn re_put_revives_released_content() {
        let store = InMemoryContentStore::new();
        let d = store.put(b"x").await.unwrap();
        store.unpin(&d).await.unwrap();
        store.put(b"x").await.unwrap();
        assert_eq!(store.pin_state(&d), Some(PinState::Stored));
        assert_eq!(store.collect_garbage(), 0);
    }

    #[tokio::test]
    async fn pin_unknown_digest_fails() {
        let store = InMemoryContentStore::new();
        let d = Digest::from_hash([1; 32]);
        assert_eq!(store.pin(&d).await, Err(StoreError::NotFound(d)));
    }

    #[tokio::test]
    async fn corrupt_changes_returned_bytes() {
        let store = InMemoryContentStore::new();
        let d = store.put(b"honest").await.unwrap();
        assert!(store.corrupt(&d, b"forged".to_vec()));
        assert_eq!(store.get(&d).await.unwrap(), b"forged");
        assert!(!store.record(&d).unwrap().is_intact());
    }

    #[tokio::test]
    async fn disabled_store_rejects_everything() {
        let store = InMemoryContentStore::new();
        store.set_disabled(true);
        assert_eq!(store.put(b"x").await, Err(StoreError::Disabled));
        store.set_disabled(false);
        assert!(store.put(b"x").await.is_ok());
    }

    #[tokio::test]
    async fn put_record_keeps_annotations() {
        let store = InMemoryContentStore::new();
        let record = MessageContent::new("hello")
            .with_metadata("lang", "en")
            .to_record()
            .unwrap();
        let d = store.put_record(&record).await.unwrap();
        let stored = store.record(&d).unwrap();
        assert_eq!(stored.metadata.get("lang").map(String::as_str), Some("en"));
    }

    #[tokio::test]
    async fn put_record_rejects_inconsistent_record() {
        let store = InMemoryContentStore::new();
        let mut record = ContentRecord::new(b"a".to_vec());
        record.payload = b"b".to_vec();
        assert!(matches!(
            store.put_record(&record).await,
            Err(StoreError::HashMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn json_helpers_roundtrip() {
        let store = InMemoryContentStore::new();
        let msg = MessageContent::new("typed").with_timestamp(42);
        let d = store.put_json(&msg).await.unwrap();
        let back: MessageContent = store.get_json(&d).await.unwrap();
        assert_eq!(back, msg);
        assert_eq!(d, msg.to_record().unwrap().digest);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn any_payload_roundtrips_and_dedupes(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let store = InMemoryContentStore::new();
                let first = store.put(&payload).await.unwrap();
                let second = store.put(&payload).await.unwrap();
                assert_eq!(first, second);
                assert_eq!(first, ContentHasher::CONTENT.hash(&payload));
                assert_eq!(store.get(&first).await.unwrap(), payload);
                assert_eq!(store.len(), 1);
                assert_eq!(store.billed_bytes(), payload.len() as u64);
            });
        }
    }
}
