//! Foundation types for the PoD commitment core.
//!
//! Every other `pod-*` crate depends on `pod-types`. Nothing here performs
//! I/O; the types are plain values that hash, compare, and serialize.
//!
//! # Key Types
//!
//! - [`Digest`] -- 32-byte content hash, the store key and on-ledger commitment
//! - [`Address`] -- deterministic, namespace-separated ledger address
//! - [`Namespace`] -- closed set of entity kinds an address can belong to
//! - [`PublicKey`] -- 32-byte agent / wallet key used as a derivation seed
//! - [`Ticket`] -- unique handle for one enqueued commitment request
//! - [`TxRef`] -- opaque reference to a submitted ledger transaction
//! - [`LedgerRecord`] -- typed view of an on-ledger account, validated once

pub mod address;
pub mod digest;
pub mod error;
pub mod record;
pub mod ticket;

pub use address::{Address, Namespace, PublicKey};
pub use digest::Digest;
pub use error::TypeError;
pub use record::{ChannelVisibility, LedgerRecord, MessageStatus, MessageType, RecordKind};
pub use ticket::{Ticket, TxRef};
