use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pod_crypto::{canonical_json, ContentHasher};
use pod_types::Digest;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// A stored payload and its annotations.
///
/// `digest` always equals the content hasher's digest of `payload`.
/// Attachments and metadata are annotations kept beside the payload and do
/// not feed the digest. Structured content folds them into the payload
/// itself (see [`MessageContent`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub digest: Digest,
    pub payload: Vec<u8>,
    pub attachments: Vec<Digest>,
    pub metadata: BTreeMap<String, String>,
    pub stored_at: DateTime<Utc>,
}

impl ContentRecord {
    /// Build a record for raw payload bytes.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            digest: ContentHasher::CONTENT.hash(&payload),
            payload,
            attachments: Vec::new(),
            metadata: BTreeMap::new(),
            stored_at: Utc::now(),
        }
    }

    /// Build a record for a value's canonical JSON encoding.
    pub fn from_json<T: Serialize>(value: &T) -> StoreResult<Self> {
        let payload =
            canonical_json(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self::new(payload))
    }

    pub fn with_attachments(mut self, attachments: Vec<Digest>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the payload still hashes to the record's digest.
    pub fn is_intact(&self) -> bool {
        ContentHasher::CONTENT.verify(&self.payload, &self.digest)
    }
}

/// Off-ledger body of a direct or channel message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Digest>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: i64,
    pub version: String,
}

impl MessageContent {
    pub const VERSION: &'static str = "1.0.0";

    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachments: Vec::new(),
            metadata: BTreeMap::new(),
            timestamp: Utc::now().timestamp_millis(),
            version: Self::VERSION.into(),
        }
    }

    pub fn with_attachment(mut self, digest: Digest) -> Self {
        self.attachments.push(digest);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = timestamp_ms;
        self
    }

    /// Canonical record for storage.
    pub fn to_record(&self) -> StoreResult<ContentRecord> {
        Ok(ContentRecord::from_json(self)?
            .with_attachments(self.attachments.clone())
            .with_metadata(self.metadata.clone()))
    }
}

/// Off-ledger extended profile of a channel participant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantMetadata {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub custom_data: BTreeMap<String, String>,
    /// Milliseconds since the UNIX epoch.
    pub last_updated: i64,
}

impl ParticipantMetadata {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            last_updated: Utc::now().timestamp_millis(),
            ..Default::default()
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_data.insert(key.into(), value.into());
        self
    }

    pub fn to_record(&self) -> StoreResult<ContentRecord> {
        Ok(ContentRecord::from_json(self)?.with_metadata(self.custom_data.clone()))
    }
}
