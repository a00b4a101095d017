use async_trait::async_trait;
use pod_types::Digest;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::record::ContentRecord;

/// Content-addressed payload store.
///
/// All implementations must satisfy these invariants:
/// - `put` returns the content hasher's digest of the exact bytes given.
/// - Storing identical bytes twice returns the same digest and does not
///   store (or bill) them twice. Concurrent identical puts are safe.
/// - `get` returns the bytes held under the digest. It does not verify
///   them; integrity checking belongs to the read path above the store.
/// - `unpin` is advisory: it permits reclamation but never forces it.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a payload and return its digest.
    async fn put(&self, payload: &[u8]) -> StoreResult<Digest>;

    /// Fetch the payload stored under `digest`.
    ///
    /// Fails with [`StoreError::NotFound`] if absent and
    /// [`StoreError::Timeout`] if the store does not answer in time.
    async fn get(&self, digest: &Digest) -> StoreResult<Vec<u8>>;

    /// Check whether a payload is stored under `digest`.
    async fn exists(&self, digest: &Digest) -> StoreResult<bool>;

    /// Guarantee retention of a stored payload.
    async fn pin(&self, digest: &Digest) -> StoreResult<()>;

    /// Permit reclamation of a stored payload.
    async fn unpin(&self, digest: &Digest) -> StoreResult<()>;

    /// Store a record with its annotations.
    ///
    /// Backends that cannot keep attachments and metadata store the payload
    /// only. Fails if the backend's digest disagrees with the record's.
    async fn put_record(&self, record: &ContentRecord) -> StoreResult<Digest> {
        let digest = self.put(&record.payload).await?;
        if digest != record.digest {
            return Err(StoreError::HashMismatch {
                expected: record.digest,
                reported: digest,
            });
        }
        Ok(digest)
    }
}

/// Typed helpers over any [`ContentStore`].
#[async_trait]
pub trait ContentStoreExt: ContentStore {
    /// Store a value as canonical JSON.
    async fn put_json<T: Serialize + Sync>(&self, value: &T) -> StoreResult<Digest> {
        let bytes = pod_crypto::canonical_json(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.put(&bytes).await
    }

    /// Fetch and decode a JSON value.
    async fn get_json<T: DeserializeOwned + Send>(&self, digest: &Digest) -> StoreResult<T> {
        let bytes = self.get(digest).await?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl<S: ContentStore + ?Sized> ContentStoreExt for S {}
