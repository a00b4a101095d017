//! Ledger boundary for the PoD commitment core.
//!
//! The ledger is the source of truth for commitments: batch Merkle roots go
//! in through [`LedgerGateway::submit_commitment`], and committed digests
//! come back out through [`LedgerGateway::fetch_digest`]. This crate provides:
//! - The [`LedgerGateway`] trait boundary
//! - [`CommitmentMetadata`] and [`LedgerCommitment`] records
//! - [`InMemoryLedger`], an emulator for tests and embedding with failure
//!   injection

pub mod error;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::{LedgerError, LedgerResult};
pub use memory::InMemoryLedger;
pub use records::{CommitmentMetadata, LedgerCommitment, MAX_LEAVES_PER_COMMITMENT};
pub use traits::LedgerGateway;
