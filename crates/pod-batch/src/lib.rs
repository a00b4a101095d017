//! Batch compactor for the PoD commitment core.
//!
//! Callers enqueue `(address, digest)` pairs and receive a [`PendingCommit`]
//! handle. The [`BatchCompactor`] accumulates pending items and flushes when
//! the queue reaches `max_batch_size` or when `batch_timeout` has passed
//! since the last flush. Each flush builds a Merkle tree over the batch in
//! enqueue order and submits only the root through a
//! [`pod_ledger::LedgerGateway`]: one ledger transaction per batch.
//!
//! # Batch lifecycle
//!
//! ```text
//! Accumulating --(size | timer | manual)--> Flushing --> Committed
//!                                                   \--> Failed
//! ```
//!
//! Waiters are tracked by [`pod_types::Ticket`], never by digest, so two
//! items with identical content resolve independently. A failed batch
//! rejects every waiter in it with [`CommitError::CommitFailed`] and is not
//! requeued.

pub mod batch;
pub mod compactor;
pub mod config;
pub mod error;

pub use batch::{BatchCommitment, BatchEntry, CommitReceipt, FlushOutcome};
pub use compactor::{BatchCompactor, CompactorStats, PendingCommit};
pub use config::CompactorConfig;
pub use error::{CommitError, CompactorError};
