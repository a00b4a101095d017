use pod_ledger::LedgerError;
use pod_types::Ticket;

/// Outcome delivered to a waiter whose item did not commit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    /// The batch containing the item was not accepted by the ledger. The
    /// item is not requeued.
    #[error("batch {batch} commit failed: {reason}")]
    CommitFailed { batch: u64, reason: LedgerError },

    /// The item was withdrawn before its batch flushed.
    #[error("commit cancelled before flush")]
    Cancelled,

    /// The item waited longer than the pending TTL.
    #[error("commit expired in queue")]
    Expired,

    /// The caller stopped waiting. The item may still commit.
    #[error("timed out waiting for commit")]
    Timeout,

    /// The compactor was dropped while the item was still queued.
    #[error("compactor shut down")]
    Shutdown,

    /// The item's outcome was lost without being resolved, e.g. its flush
    /// task panicked or the runtime stopped mid-flush.
    #[error("commit abandoned before its batch resolved")]
    Abandoned,
}

/// Errors from compactor control operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompactorError {
    /// The item's batch is already being flushed.
    #[error("ticket {0} is in flight and can no longer be cancelled")]
    InFlight(Ticket),

    /// The ticket is neither queued nor in flight.
    #[error("unknown ticket {0}")]
    UnknownTicket(Ticket),

    #[error("compactor is shut down")]
    Shutdown,

    #[error("invalid compactor config: {0}")]
    InvalidConfig(String),
}
