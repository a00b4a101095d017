use serde::{Deserialize, Serialize};

use crate::address::{Namespace, PublicKey};
use crate::digest::Digest;
use crate::error::TypeError;

const MAX_METADATA_URI_LENGTH: usize = 200;
const MAX_CHANNEL_NAME_LENGTH: usize = 50;

/// Kind of message carried by a direct or channel message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Data,
    Command,
    Response,
    Custom(u8),
}

impl MessageType {
    /// Seed encoding used when deriving message addresses.
    ///
    /// Custom types take two bytes so that no custom value can alias a
    /// built-in type.
    pub fn seed_bytes(self) -> Vec<u8> {
        match self {
            Self::Text => vec![0],
            Self::Data => vec![1],
            Self::Command => vec![2],
            Self::Response => vec![3],
            Self::Custom(x) => vec![4, x],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Delivered,
    Read,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelVisibility {
    Public,
    Private,
}

/// Discriminant of a [`LedgerRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Agent,
    Channel,
    Message,
    CompressedMessage,
    Participant,
    Escrow,
    Invitation,
}

/// Typed view of an on-ledger account.
///
/// Raw account data arrives as JSON tagged by `kind`. It is decoded and
/// validated exactly once by [`LedgerRecord::from_json`]; code past that
/// point matches on the variant instead of probing optional fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerRecord {
    Agent {
        pubkey: PublicKey,
        capabilities: u64,
        reputation: u64,
        metadata_uri: String,
        #[serde(default)]
        metadata_hash: Option<Digest>,
        last_updated: i64,
    },
    Channel {
        creator: PublicKey,
        name: String,
        visibility: ChannelVisibility,
        fee_per_message: u64,
        max_participants: u32,
        current_participants: u32,
    },
    Message {
        sender: PublicKey,
        recipient: PublicKey,
        payload_hash: Digest,
        message_type: MessageType,
        status: MessageStatus,
        created_at: i64,
        expires_at: i64,
    },
    CompressedMessage {
        channel: PublicKey,
        sender: PublicKey,
        content_hash: Digest,
        message_type: MessageType,
        created_at: i64,
    },
    Participant {
        channel: PublicKey,
        participant: PublicKey,
        metadata_hash: Digest,
        joined_at: i64,
        messages_sent: u64,
    },
    Escrow {
        channel: PublicKey,
        depositor: PublicKey,
        amount: u64,
    },
    Invitation {
        channel: PublicKey,
        inviter: PublicKey,
        invitee: PublicKey,
        invitation_hash: Digest,
        expires_at: i64,
    },
}

impl LedgerRecord {
    /// Decode and validate a raw JSON account.
    pub fn from_json(data: &[u8]) -> Result<Self, TypeError> {
        let record: Self = serde_json::from_slice(data)
            .map_err(|e| TypeError::MalformedRecord(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Decode and validate an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, TypeError> {
        let record: Self = serde_json::from_value(value)
            .map_err(|e| TypeError::MalformedRecord(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Enforce the size and count limits the ledger program applies.
    pub fn validate(&self) -> Result<(), TypeError> {
        match self {
            Self::Agent { metadata_uri, .. } if metadata_uri.len() > MAX_METADATA_URI_LENGTH => {
                Err(TypeError::MalformedRecord(format!(
                    "metadata uri exceeds {MAX_METADATA_URI_LENGTH} bytes"
                )))
            }
            Self::Channel { name, .. } if name.len() > MAX_CHANNEL_NAME_LENGTH => {
                Err(TypeError::MalformedRecord(format!(
                    "channel name exceeds {MAX_CHANNEL_NAME_LENGTH} bytes"
                )))
            }
            Self::Channel {
                max_participants,
                current_participants,
                ..
            } if current_participants > max_participants => Err(TypeError::MalformedRecord(
                "channel participant count exceeds its maximum".into(),
            )),
            Self::Message {
                created_at,
                expires_at,
                ..
            } if expires_at < created_at => Err(TypeError::MalformedRecord(
                "message expires before it was created".into(),
            )),
            _ => Ok(()),
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Agent { .. } => RecordKind::Agent,
            Self::Channel { .. } => RecordKind::Channel,
            Self::Message { .. } => RecordKind::Message,
            Self::CompressedMessage { .. } => RecordKind::CompressedMessage,
            Self::Participant { .. } => RecordKind::Participant,
            Self::Escrow { .. } => RecordKind::Escrow,
            Self::Invitation { .. } => RecordKind::Invitation,
        }
    }

    /// Namespace whose addresses hold this kind of record.
    pub fn namespace(&self) -> Namespace {
        match self.kind() {
            RecordKind::Agent => Namespace::Agent,
            RecordKind::Channel => Namespace::Channel,
            RecordKind::Message | RecordKind::CompressedMessage => Namespace::Message,
            RecordKind::Participant => Namespace::Participant,
            RecordKind::Escrow => Namespace::Escrow,
            RecordKind::Invitation => Namespace::Invitation,
        }
    }

    /// Digest of the off-ledger content this record commits to, if any.
    pub fn committed_digest(&self) -> Option<Digest> {
        match self {
            Self::Agent { metadata_hash, .. } => *metadata_hash,
            Self::Message { payload_hash, .. } => Some(*payload_hash),
            Self::CompressedMessage { content_hash, .. } => Some(*content_hash),
            Self::Participant { metadata_hash, .. } => Some(*metadata_hash),
            Self::Channel { .. } | Self::Escrow { .. } | Self::Invitation { .. } => None,
        }
    }
}
