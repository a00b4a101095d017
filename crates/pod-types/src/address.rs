use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{decode_32, TypeError};

/// Entity kinds that own a deterministic address.
///
/// The discriminant byte is mixed into every derivation before any seed, so
/// two namespaces never share an address even with identical seeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Agent,
    Channel,
    Message,
    Escrow,
    Participant,
    Invitation,
}

impl Namespace {
    /// Every namespace, in tag order.
    pub const ALL: [Namespace; 6] = [
        Namespace::Agent,
        Namespace::Channel,
        Namespace::Message,
        Namespace::Escrow,
        Namespace::Participant,
        Namespace::Invitation,
    ];

    /// Stable one-byte discriminant used in derivation.
    pub const fn tag(self) -> u8 {
        match self {
            Self::Agent => 0x01,
            Self::Channel => 0x02,
            Self::Message => 0x03,
            Self::Escrow => 0x04,
            Self::Participant => 0x05,
            Self::Invitation => 0x06,
        }
    }

    /// Inverse of [`Namespace::tag`].
    pub fn from_tag(tag: u8) -> Result<Self, TypeError> {
        Self::ALL
            .into_iter()
            .find(|ns| ns.tag() == tag)
            .ok_or(TypeError::UnknownNamespace(tag))
    }

    /// Lowercase label, matching the serde representation.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Channel => "channel",
            Self::Message => "message",
            Self::Escrow => "escrow",
            Self::Participant => "participant",
            Self::Invitation => "invitation",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

macro_rules! hex_key_type {
    ($name:ident, $prefix:literal) => {
        impl $name {
            /// Wrap raw bytes.
            pub const fn from_raw(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// The raw 32 bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Full hex-encoded string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Short identifier (prefix plus first 8 hex characters).
            pub fn short_id(&self) -> String {
                format!(concat!($prefix, ":{}"), hex::encode(&self.0[..4]))
            }

            /// Parse from 64 hex characters, with or without the short-id prefix.
            pub fn from_hex(s: &str) -> Result<Self, TypeError> {
                let s = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                decode_32(s).map(Self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Deterministic ledger address.
///
/// Never stored on its own: it is recomputed on demand from a namespace and
/// ordered seeds. Construct one through the address deriver in `pod-crypto`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

hex_key_type!(Address, "addr");

/// 32-byte public key of an agent, wallet, or program.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; 32]);

hex_key_type!(PublicKey, "pk");

impl PublicKey {
    /// Random key for tests and demos.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }
}
