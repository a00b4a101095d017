//! High-level SDK for the PoD commitment core.
//!
//! [`PodClient`] wires the pieces together along the write and read paths:
//!
//! ```text
//! publish:      derive address -> store payload -> enqueue digest -> batch commit
//! read_verified: ledger digest -> fetch payload -> recompute hash -> verified flag
//! ```
//!
//! Configuration is loaded from TOML through [`PodConfig`].

pub mod client;
pub mod config;
pub mod error;

pub use client::{PodClient, Published};
pub use config::PodConfig;
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use pod_batch::{CommitReceipt, CompactorConfig, CompactorStats};
pub use pod_store::{MessageContent, ParticipantMetadata, StoreConfig};
pub use pod_types::{Address, Digest, MessageType, Namespace, PublicKey, Ticket, TxRef};
pub use pod_verify::VerifiedContent;
