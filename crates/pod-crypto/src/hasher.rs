use pod_types::Digest;

use crate::canonical::canonical_json;

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is prepended to every hash computation. Content digests
/// and Merkle parent nodes go through the same hasher so the write path and
/// the verify path can never disagree on the algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for stored payloads and batch commitments.
    pub const CONTENT: Self = Self {
        domain: "pod-content-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Digest::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash the concatenation `left || right`. Used for Merkle parents.
    pub fn hash_pair(&self, left: &Digest, right: &Digest) -> Digest {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(left.as_bytes());
        buf[32..].copy_from_slice(right.as_bytes());
        self.hash(&buf)
    }

    /// Hash a serializable value over its canonical JSON encoding.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<Digest, HasherError> {
        let data = canonical_json(value)?;
        Ok(self.hash(&data))
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }

    /// Field-sized view of a digest: the leading byte is zeroed so the value
    /// fits a 254-bit prime field. Needed only by ledgers that store
    /// commitments as field elements.
    pub fn field_sized(digest: &Digest) -> [u8; 32] {
        let mut bytes = *digest.as_bytes();
        bytes[0] = 0;
        bytes
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::CONTENT
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
