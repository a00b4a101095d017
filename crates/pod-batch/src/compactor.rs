use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pod_crypto::{ContentHasher, MerkleTree};
use pod_ledger::{CommitmentMetadata, LedgerGateway};
use pod_types::{Address, Digest, Ticket};
use serde::Serialize;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::batch::{BatchCommitment, BatchEntry, CommitReceipt, FlushOutcome};
use crate::config::CompactorConfig;
use crate::error::{CommitError, CompactorError};

type Outcome = Result<CommitReceipt, CommitError>;

struct PendingEntry {
    ticket: Ticket,
    address: Address,
    digest: Digest,
    enqueued_at: Instant,
    waiter: oneshot::Sender<Outcome>,
}

struct QueueState {
    pending: Vec<PendingEntry>,
    in_flight: HashSet<Ticket>,
    last_flush: Instant,
    closed: bool,
}

#[derive(Default)]
struct Counters {
    batches_committed: AtomicU64,
    batches_failed: AtomicU64,
    items_committed: AtomicU64,
    items_failed: AtomicU64,
    items_cancelled: AtomicU64,
    items_expired: AtomicU64,
}

/// Point-in-time compactor counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CompactorStats {
    pub queued: usize,
    pub in_flight: usize,
    pub batches_committed: u64,
    pub batches_failed: u64,
    pub items_committed: u64,
    pub items_failed: u64,
    pub items_cancelled: u64,
    pub items_expired: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trigger {
    Size,
    Timer,
    Manual,
}

struct Inner {
    config: CompactorConfig,
    ledger: Arc<dyn LedgerGateway>,
    hasher: ContentHasher,
    queue: Mutex<QueueState>,
    /// Held for the whole of a flush, so at most one batch is in flight.
    flush_gate: tokio::sync::Mutex<()>,
    next_batch: AtomicU64,
    counters: Counters,
    stop: Notify,
}

/// Clears a batch's tickets from the in-flight set on every exit path.
struct InFlight<'a> {
    queue: &'a Mutex<QueueState>,
    tickets: Vec<Ticket>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut q) = self.queue.lock() {
            for ticket in &self.tickets {
                q.in_flight.remove(ticket);
            }
        }
    }
}

impl Inner {
    /// Run a flush on its own task so a caller that stops waiting cannot
    /// abandon a drained batch halfway through submission.
    async fn spawn_flush(self: &Arc<Self>, trigger: Trigger) -> Option<FlushOutcome> {
        let inner = Arc::clone(self);
        match tokio::spawn(async move { inner.flush(trigger).await }).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(?trigger, error = %err, "flush task did not complete");
                None
            }
        }
    }

    async fn flush(&self, trigger: Trigger) -> Option<FlushOutcome> {
        let _gate = self.flush_gate.lock().await;

        let batch: Vec<PendingEntry> = {
            let mut q = self.queue.lock().expect("lock poisoned");
            let ready = match trigger {
                Trigger::Size => q.pending.len() >= self.config.max_batch_size,
                Trigger::Timer => {
                    !q.pending.is_empty() && q.last_flush.elapsed() >= self.config.batch_timeout()
                }
                Trigger::Manual => !q.pending.is_empty(),
            };
            if !ready {
                return None;
            }
            let take = q.pending.len().min(self.config.max_batch_size);
            let batch: Vec<PendingEntry> = q.pending.drain(..take).collect();
            for entry in &batch {
                q.in_flight.insert(entry.ticket);
            }
            q.last_flush = Instant::now();
            batch
        };

        let batch_id = self.next_batch.fetch_add(1, Ordering::Relaxed);
        let tree = MerkleTree::with_hasher(self.hasher, batch.iter().map(|e| e.digest).collect());
        let root = tree.root();
        let metadata = CommitmentMetadata::new(batch_id, batch.len());
        info!(
            batch = batch_id,
            items = batch.len(),
            root = %root.short_hex(),
            ?trigger,
            "flushing batch"
        );

        let in_flight = InFlight {
            queue: &self.queue,
            tickets: batch.iter().map(|e| e.ticket).collect(),
        };
        let submitted = self.ledger.submit_commitment(root, &metadata).await;
        drop(in_flight);

        let items = batch.len() as u64;
        match submitted {
            Ok(tx_ref) => {
                let proofs = tree.proofs();
                let entries = batch
                    .iter()
                    .map(|e| BatchEntry {
                        ticket: e.ticket,
                        address: e.address,
                        digest: e.digest,
                    })
                    .collect();
                let commitment = Arc::new(BatchCommitment::new(batch_id, tx_ref, entries, tree));
                for (entry, proof) in batch.into_iter().zip(proofs) {
                    let receipt = CommitReceipt {
                        ticket: entry.ticket,
                        address: entry.address,
                        digest: entry.digest,
                        proof,
                        batch: Arc::clone(&commitment),
                    };
                    // The caller may have stopped waiting; the item is committed either way.
                    let _ = entry.waiter.send(Ok(receipt));
                }
                self.counters.batches_committed.fetch_add(1, Ordering::Relaxed);
                self.counters.items_committed.fetch_add(items, Ordering::Relaxed);
                info!(
                    batch = batch_id,
                    items,
                    tx = %commitment.tx_ref,
                    "batch committed"
                );
                Some(FlushOutcome::Committed(commitment))
            }
            Err(error) => {
                warn!(batch = batch_id, items, %error, "batch commit failed");
                for entry in batch {
                    let _ = entry.waiter.send(Err(CommitError::CommitFailed {
                        batch: batch_id,
                        reason: error.clone(),
                    }));
                }
                self.counters.batches_failed.fetch_add(1, Ordering::Relaxed);
                self.counters.items_failed.fetch_add(items, Ordering::Relaxed);
                Some(FlushOutcome::Failed {
                    batch_id,
                    items: items as usize,
                    error,
                })
            }
        }
    }

    fn expire_stale(&self) {
        let Some(ttl) = self.config.pending_ttl() else {
            return;
        };
        let stale: Vec<PendingEntry> = {
            let mut q = self.queue.lock().expect("lock poisoned");
            let now = Instant::now();
            let (stale, fresh): (Vec<_>, Vec<_>) = q
                .pending
                .drain(..)
                .partition(|e| now.duration_since(e.enqueued_at) >= ttl);
            q.pending = fresh;
            stale
        };
        for entry in stale {
            debug!(ticket = %entry.ticket.short_id(), "pending commit expired");
            self.counters.items_expired.fetch_add(1, Ordering::Relaxed);
            let _ = entry.waiter.send(Err(CommitError::Expired));
        }
    }

    fn last_flush(&self) -> Instant {
        self.queue.lock().expect("lock poisoned").last_flush
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let Ok(q) = self.queue.get_mut() else {
            return;
        };
        for entry in q.pending.drain(..) {
            let _ = entry.waiter.send(Err(CommitError::Shutdown));
        }
    }
}

async fn run_timer(inner: Arc<Inner>) {
    let timeout = inner.config.batch_timeout();
    let mut next_tick = Instant::now() + timeout;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(next_tick) => {}
            _ = inner.stop.notified() => break,
        }
        inner.expire_stale();
        inner.flush(Trigger::Timer).await;

        let now = Instant::now();
        let due = inner.last_flush() + timeout;
        next_tick = if due > now { due } else { now + timeout };
    }
    debug!("batch timer stopped");
}

/// Accumulates pending commitments and flushes them to the ledger in
/// Merkle-rooted batches.
///
/// A flush is triggered by the enqueue call that brings the queue to
/// `max_batch_size` (that call flushes before returning), by the timer once
/// `batch_timeout` has passed since the last flush, or manually. Only one
/// flush runs at a time; items enqueued during a flush go to the next batch.
/// Flushes run on their own task, so a caller that stops waiting on
/// `enqueue` or `flush` does not interrupt one.
pub struct BatchCompactor {
    inner: Arc<Inner>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl BatchCompactor {
    /// Start a compactor and its batch timer. Must be called from within a
    /// Tokio runtime.
    pub fn new(
        config: CompactorConfig,
        ledger: Arc<dyn LedgerGateway>,
    ) -> Result<Self, CompactorError> {
        config.validate()?;
        let inner = Arc::new(Inner {
            config,
            ledger,
            hasher: ContentHasher::CONTENT,
            queue: Mutex::new(QueueState {
                pending: Vec::new(),
                in_flight: HashSet::new(),
                last_flush: Instant::now(),
                closed: false,
            }),
            flush_gate: tokio::sync::Mutex::new(()),
            next_batch: AtomicU64::new(1),
            counters: Counters::default(),
            stop: Notify::new(),
        });
        let timer = tokio::spawn(run_timer(Arc::clone(&inner)));
        Ok(Self {
            inner,
            timer: Mutex::new(Some(timer)),
        })
    }

    pub fn config(&self) -> &CompactorConfig {
        &self.inner.config
    }

    /// Queue a digest for commitment at `address`.
    ///
    /// Returns once the item is queued, or, if it filled the batch, once
    /// that batch has been flushed.
    pub async fn enqueue(
        &self,
        address: Address,
        digest: Digest,
    ) -> Result<PendingCommit, CompactorError> {
        let ticket = Ticket::new();
        let (waiter, rx) = oneshot::channel();
        let queued = {
            let mut q = self.inner.queue.lock().expect("lock poisoned");
            if q.closed {
                return Err(CompactorError::Shutdown);
            }
            q.pending.push(PendingEntry {
                ticket,
                address,
                digest,
                enqueued_at: Instant::now(),
                waiter,
            });
            q.pending.len()
        };
        debug!(
            ticket = %ticket.short_id(),
            digest = %digest.short_hex(),
            queued,
            "commit enqueued"
        );

        if queued >= self.inner.config.max_batch_size {
            self.inner.spawn_flush(Trigger::Size).await;
        }

        Ok(PendingCommit {
            ticket,
            address,
            digest,
            rx,
        })
    }

    /// Withdraw a queued item. Its waiter resolves with `Cancelled`.
    pub fn cancel(&self, ticket: Ticket) -> Result<(), CompactorError> {
        let entry = {
            let mut q = self.inner.queue.lock().expect("lock poisoned");
            match q.pending.iter().position(|e| e.ticket == ticket) {
                Some(pos) => q.pending.remove(pos),
                None if q.in_flight.contains(&ticket) => {
                    return Err(CompactorError::InFlight(ticket))
                }
                None => return Err(CompactorError::UnknownTicket(ticket)),
            }
        };
        debug!(ticket = %ticket.short_id(), "commit cancelled");
        self.inner
            .counters
            .items_cancelled
            .fetch_add(1, Ordering::Relaxed);
        let _ = entry.waiter.send(Err(CommitError::Cancelled));
        Ok(())
    }

    /// Flush up to `max_batch_size` queued items now. `None` if the queue
    /// was empty.
    pub async fn flush(&self) -> Option<FlushOutcome> {
        self.inner.spawn_flush(Trigger::Manual).await
    }

    pub fn queued(&self) -> usize {
        self.inner.queue.lock().expect("lock poisoned").pending.len()
    }

    pub fn stats(&self) -> CompactorStats {
        let (queued, in_flight) = {
            let q = self.inner.queue.lock().expect("lock poisoned");
            (q.pending.len(), q.in_flight.len())
        };
        let c = &self.inner.counters;
        CompactorStats {
            queued,
            in_flight,
            batches_committed: c.batches_committed.load(Ordering::Relaxed),
            batches_failed: c.batches_failed.load(Ordering::Relaxed),
            items_committed: c.items_committed.load(Ordering::Relaxed),
            items_failed: c.items_failed.load(Ordering::Relaxed),
            items_cancelled: c.items_cancelled.load(Ordering::Relaxed),
            items_expired: c.items_expired.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting items, stop the timer, and flush everything still
    /// queued. Returns the number of items flushed.
    pub async fn shutdown(&self) -> usize {
        self.inner.queue.lock().expect("lock poisoned").closed = true;
        self.inner.stop.notify_one();
        let timer = self.timer.lock().expect("lock poisoned").take();
        if let Some(timer) = timer {
            let _ = timer.await;
        }

        let mut flushed = 0;
        while let Some(outcome) = self.inner.spawn_flush(Trigger::Manual).await {
            flushed += outcome.items();
        }
        info!(flushed, "compactor shut down");
        flushed
    }
}

impl Drop for BatchCompactor {
    /// Stops the timer without interrupting a flush it is running. Items
    /// still queued once the timer exits resolve with `Shutdown`.
    fn drop(&mut self) {
        if let Ok(mut q) = self.inner.queue.lock() {
            q.closed = true;
        }
        self.inner.stop.notify_one();
    }
}

impl std::fmt::Debug for BatchCompactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCompactor")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Handle to one enqueued item.
///
/// Waiting is purely caller-side: giving up on a handle does not remove the
/// item from the compactor.
#[derive(Debug)]
pub struct PendingCommit {
    ticket: Ticket,
    address: Address,
    digest: Digest,
    rx: oneshot::Receiver<Outcome>,
}

impl PendingCommit {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Wait until the item's batch commits or fails.
    pub async fn wait(self) -> Result<CommitReceipt, CommitError> {
        self.rx.await.unwrap_or(Err(CommitError::Abandoned))
    }

    /// Wait at most `limit`. On `Timeout` the handle can be waited on again.
    ///
    /// Must not be called again after it has returned anything but `Timeout`.
    pub async fn wait_timeout(&mut self, limit: Duration) -> Result<CommitReceipt, CommitError> {
        match tokio::time::timeout(limit, &mut self.rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(CommitError::Abandoned),
            Err(_) => Err(CommitError::Timeout),
        }
    }

    /// The outcome, if the item has already been resolved.
    pub fn try_outcome(&mut self) -> Option<Result<CommitReceipt, CommitError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(CommitError::Abandoned)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_ledger::{InMemoryLedger, LedgerError};
    use proptest::prelude::*;

    fn digest(seed: u8) -> Digest {
        ContentHasher::CONTENT.hash(&[seed])
    }

    fn address(seed: u8) -> Address {
        Address::from_raw([seed; 32])
    }

    fn setup(max: usize, timeout_ms: u64) -> (Arc<InMemoryLedger>, BatchCompactor) {
        let ledger = Arc::new(InMemoryLedger::new());
        let config = CompactorConfig::new(max, Duration::from_millis(timeout_ms));
        let compactor = BatchCompactor::new(config, ledger.clone()).unwrap();
        (ledger, compactor)
    }

    async fn wait_until_in_flight(compactor: &BatchCompactor) {
        while compactor.stats().in_flight == 0 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn filling_the_batch_flushes_before_enqueue_returns() {
        let (ledger, compactor) = setup(5, 60_000);
        let mut handles = Vec::new();
        for i in 0..4 {
            handles.push(compactor.enqueue(address(i), digest(i)).await.unwrap());
        }
        assert_eq!(ledger.commitment_count(), 0);
        assert!(handles[0].try_outcome().is_none());

        handles.push(compactor.enqueue(address(4), digest(4)).await.unwrap());
        assert_eq!(ledger.commitment_count(), 1);
        assert_eq!(compactor.queued(), 0);

        let tx = ledger.commitments()[0].tx_ref.clone();
        for (i, handle) in handles.iter_mut().enumerate() {
            let receipt = handle.try_outcome().unwrap().unwrap();
            assert_eq!(receipt.index(), i);
            assert_eq!(receipt.tx_ref(), &tx);
            assert!(receipt.verify());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timer_flushes_partial_batch() {
        let (ledger, compactor) = setup(5, 2_000);
        let start = Instant::now();
        let mut handles = Vec::new();
        for i in 0..3 {
            handles.push(compactor.enqueue(address(i), digest(i)).await.unwrap());
        }

        tokio::time::sleep(Duration::from_millis(1_999)).await;
        assert_eq!(ledger.commitment_count(), 0);

        let mut roots = Vec::new();
        for handle in handles {
            let receipt = handle.wait().await.unwrap();
            assert!(receipt.verify());
            roots.push(receipt.root());
        }
        assert!(start.elapsed() >= Duration::from_millis(2_000));
        assert_eq!(ledger.commitment_count(), 1);
        assert_eq!(ledger.commitments()[0].metadata.leaf_count, 3);
        assert!(roots.iter().all(|r| *r == roots[0]));
        assert_eq!(ledger.commitments()[0].root, roots[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timer_submits_nothing() {
        let (ledger, compactor) = setup(5, 1_000);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ledger.commitment_count(), 0);
        assert!(compactor.flush().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_counts_from_last_flush() {
        let (ledger, compactor) = setup(2, 2_000);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        compactor.enqueue(address(0), digest(0)).await.unwrap();
        compactor.enqueue(address(1), digest(1)).await.unwrap();
        assert_eq!(ledger.commitment_count(), 1);

        let late = compactor.enqueue(address(2), digest(2)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(ledger.commitment_count(), 1);

        let receipt = late.wait().await.unwrap();
        assert_eq!(receipt.batch.batch_id, 2);
        assert_eq!(ledger.commitment_count(), 2);
    }

    #[tokio::test]
    async fn identical_content_resolves_per_ticket() {
        let (_ledger, compactor) = setup(2, 60_000);
        let same = digest(7);
        let a = compactor.enqueue(address(1), same).await.unwrap();
        let b = compactor.enqueue(address(1), same).await.unwrap();
        assert_ne!(a.ticket(), b.ticket());

        let (ta, tb) = (a.ticket(), b.ticket());
        let ra = a.wait().await.unwrap();
        let rb = b.wait().await.unwrap();
        assert_eq!(ra.ticket, ta);
        assert_eq!(rb.ticket, tb);
        assert_eq!((ra.index(), rb.index()), (0, 1));
        assert_eq!(ra.batch.index_of(&tb), Some(1));
    }

    #[tokio::test]
    async fn failed_commit_rejects_every_waiter_without_requeue() {
        let (ledger, compactor) = setup(4, 60_000);
        ledger.inject_failure(LedgerError::Rejected("insufficient fee".into()));
        let mut handles = Vec::new();
        for i in 0..4 {
            handles.push(compactor.enqueue(address(i), digest(i)).await.unwrap());
        }
        for handle in handles {
            match handle.wait().await {
                Err(CommitError::CommitFailed { batch, reason }) => {
                    assert_eq!(batch, 1);
                    assert_eq!(reason, LedgerError::Rejected("insufficient fee".into()));
                }
                other => panic!("expected CommitFailed, got {other:?}"),
            }
        }
        let stats = compactor.stats();
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.batches_failed, 1);
        assert_eq!(stats.items_failed, 4);
        assert_eq!(ledger.commitment_count(), 0);

        let retry = compactor.enqueue(address(0), digest(0)).await.unwrap();
        compactor.flush().await.unwrap();
        assert!(retry.wait().await.is_ok());
    }

    #[tokio::test]
    async fn cancel_withdraws_queued_item() {
        let (_ledger, compactor) = setup(10, 60_000);
        let a = compactor.enqueue(address(0), digest(0)).await.unwrap();
        let b = compactor.enqueue(address(1), digest(1)).await.unwrap();

        compactor.cancel(a.ticket()).unwrap();
        assert_eq!(a.wait().await.unwrap_err(), CommitError::Cancelled);
        assert_eq!(compactor.queued(), 1);

        let outcome = compactor.flush().await.unwrap();
        assert_eq!(outcome.items(), 1);
        let receipt = b.wait().await.unwrap();
        assert_eq!(receipt.index(), 0);

        assert_eq!(
            compactor.cancel(receipt.ticket),
            Err(CompactorError::UnknownTicket(receipt.ticket))
        );
        assert_eq!(compactor.stats().items_cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_items_cannot_be_cancelled() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_latency(Some(Duration::from_secs(1)));
        let compactor = Arc::new(
            BatchCompactor::new(
                CompactorConfig::new(10, Duration::from_secs(60)),
                ledger.clone(),
            )
            .unwrap(),
        );
        let handle = compactor.enqueue(address(0), digest(0)).await.unwrap();

        let flusher = {
            let compactor = Arc::clone(&compactor);
            tokio::spawn(async move { compactor.flush().await })
        };
        wait_until_in_flight(&compactor).await;

        assert_eq!(
            compactor.cancel(handle.ticket()),
            Err(CompactorError::InFlight(handle.ticket()))
        );

        // Arrivals during a flush wait for the next batch.
        let next = compactor.enqueue(address(1), digest(1)).await.unwrap();
        assert_eq!(compactor.queued(), 1);

        let outcome = flusher.await.unwrap().unwrap();
        assert_eq!(outcome.items(), 1);
        assert!(handle.wait().await.is_ok());
        assert_eq!(compactor.queued(), 1);
        compactor.cancel(next.ticket()).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn caller_timeout_leaves_item_committing() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_latency(Some(Duration::from_secs(10)));
        let compactor = Arc::new(
            BatchCompactor::new(
                CompactorConfig::new(10, Duration::from_secs(60)),
                ledger.clone(),
            )
            .unwrap(),
        );
        let mut handle = compactor.enqueue(address(0), digest(0)).await.unwrap();
        let flusher = {
            let compactor = Arc::clone(&compactor);
            tokio::spawn(async move { compactor.flush().await })
        };
        wait_until_in_flight(&compactor).await;

        assert_eq!(
            handle.wait_timeout(Duration::from_secs(1)).await.unwrap_err(),
            CommitError::Timeout
        );
        assert_eq!(compactor.stats().in_flight, 1);

        let receipt = handle.wait_timeout(Duration::from_secs(30)).await.unwrap();
        assert!(receipt.verify());
        assert!(flusher.await.unwrap().unwrap().is_committed());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_never_exceeds_max_batch_size() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_latency(Some(Duration::from_secs(1)));
        let compactor = Arc::new(
            BatchCompactor::new(
                CompactorConfig::new(2, Duration::from_secs(60)),
                ledger.clone(),
            )
            .unwrap(),
        );

        let mut tasks = Vec::new();
        for i in 0..2u8 {
            let compactor = Arc::clone(&compactor);
            tasks.push(tokio::spawn(async move {
                compactor.enqueue(address(i), digest(i)).await.unwrap()
            }));
        }
        wait_until_in_flight(&compactor).await;
        for i in 2..5u8 {
            let compactor = Arc::clone(&compactor);
            tasks.push(tokio::spawn(async move {
                compactor.enqueue(address(i), digest(i)).await.unwrap()
            }));
        }
        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }

        compactor.flush().await;
        for handle in handles {
            assert!(handle.wait().await.is_ok());
        }
        let commitments = ledger.commitments();
        assert_eq!(
            commitments.iter().map(|c| c.metadata.leaf_count).sum::<usize>(),
            5
        );
        assert!(commitments.iter().all(|c| c.metadata.leaf_count <= 2));
    }

    #[tokio::test]
    async fn shutdown_flushes_remaining_and_refuses_new_items() {
        let (ledger, compactor) = setup(10, 60_000);
        let mut handles = Vec::new();
        for i in 0..3 {
            handles.push(compactor.enqueue(address(i), digest(i)).await.unwrap());
        }
        assert_eq!(compactor.shutdown().await, 3);
        assert_eq!(ledger.commitment_count(), 1);
        for handle in handles {
            assert!(handle.wait().await.is_ok());
        }
        assert_eq!(
            compactor.enqueue(address(9), digest(9)).await.unwrap_err(),
            CompactorError::Shutdown
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_items_expire_on_timer_tick() {
        let ledger = Arc::new(InMemoryLedger::new());
        let config = CompactorConfig::new(10, Duration::from_secs(5))
            .with_pending_ttl(Duration::from_secs(1));
        let compactor = BatchCompactor::new(config, ledger.clone()).unwrap();
        let handle = compactor.enqueue(address(0), digest(0)).await.unwrap();

        assert_eq!(handle.wait().await.unwrap_err(), CommitError::Expired);
        assert_eq!(compactor.stats().items_expired, 1);
        assert_eq!(ledger.commitment_count(), 0);
    }

    #[tokio::test]
    async fn dropping_the_compactor_releases_waiters() {
        let (_ledger, compactor) = setup(10, 60_000);
        let handle = compactor.enqueue(address(0), digest(0)).await.unwrap();
        drop(compactor);
        tokio::task::yield_now().await;
        assert_eq!(handle.wait().await.unwrap_err(), CommitError::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_batch_filling_enqueue_still_commits() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_latency(Some(Duration::from_secs(10)));
        let compactor = BatchCompactor::new(
            CompactorConfig::new(2, Duration::from_secs(60)),
            ledger.clone(),
        )
        .unwrap();

        let first = compactor.enqueue(address(0), digest(0)).await.unwrap();
        let filling = tokio::time::timeout(
            Duration::from_secs(1),
            compactor.enqueue(address(1), digest(1)),
        )
        .await;
        assert!(filling.is_err());

        let receipt = first.wait().await.unwrap();
        assert_eq!(receipt.batch.len(), 2);
        assert!(receipt.verify());

        let stats = compactor.stats();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.batches_committed, 1);
        assert_eq!(stats.items_committed, 2);
        assert_eq!(ledger.commitment_count(), 1);
        assert_eq!(
            compactor.cancel(receipt.ticket),
            Err(CompactorError::UnknownTicket(receipt.ticket))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_manual_flush_still_commits() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_latency(Some(Duration::from_secs(10)));
        let compactor = BatchCompactor::new(
            CompactorConfig::new(10, Duration::from_secs(60)),
            ledger.clone(),
        )
        .unwrap();
        let handle = compactor.enqueue(address(0), digest(0)).await.unwrap();

        assert!(
            tokio::time::timeout(Duration::from_secs(1), compactor.flush())
                .await
                .is_err()
        );
        assert!(handle.wait().await.is_ok());
        assert_eq!(compactor.stats().in_flight, 0);
        assert_eq!(ledger.commitment_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_compactor_mid_flush_lets_the_batch_land() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_latency(Some(Duration::from_secs(5)));
        let compactor = BatchCompactor::new(
            CompactorConfig::new(10, Duration::from_secs(2)),
            ledger.clone(),
        )
        .unwrap();
        let flushing = compactor.enqueue(address(0), digest(0)).await.unwrap();

        // Timer flush starts at 2s and waits on the ledger until 7s.
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        let stats = compactor.stats();
        assert_eq!((stats.in_flight, stats.queued), (1, 0));
        let queued = compactor.enqueue(address(1), digest(1)).await.unwrap();

        drop(compactor);

        let receipt = flushing.wait().await.unwrap();
        assert!(receipt.verify());
        assert_eq!(queued.wait().await.unwrap_err(), CommitError::Shutdown);
        assert_eq!(ledger.commitment_count(), 1);
        assert_eq!(ledger.commitments()[0].metadata.leaf_count, 1);
    }

    fn orphaned_handle() -> PendingCommit {
        let (waiter, rx) = oneshot::channel::<Outcome>();
        drop(waiter);
        PendingCommit {
            ticket: Ticket::new(),
            address: address(0),
            digest: digest(0),
            rx,
        }
    }

    #[tokio::test]
    async fn lost_sender_is_abandoned_not_shutdown() {
        assert!(matches!(
            orphaned_handle().try_outcome(),
            Some(Err(CommitError::Abandoned))
        ));
        assert_eq!(
            orphaned_handle()
                .wait_timeout(Duration::from_secs(1))
                .await
                .unwrap_err(),
            CommitError::Abandoned
        );
        assert_eq!(
            orphaned_handle().wait().await.unwrap_err(),
            CommitError::Abandoned
        );
    }

    #[tokio::test]
    async fn stats_track_committed_batches() {
        let (_ledger, compactor) = setup(2, 60_000);
        for i in 0..5 {
            compactor.enqueue(address(i), digest(i)).await.unwrap();
        }
        let stats = compactor.stats();
        assert_eq!(stats.batches_committed, 2);
        assert_eq!(stats.items_committed, 4);
        assert_eq!(stats.queued, 1);
    }

    #[test]
    fn invalid_config_is_refused() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let ledger = Arc::new(InMemoryLedger::new());
            let err = BatchCompactor::new(CompactorConfig::new(0, Duration::from_secs(1)), ledger)
                .unwrap_err();
            assert!(matches!(err, CompactorError::InvalidConfig(_)));
        });
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn every_receipt_proves_membership(n in 1usize..40, max in 1usize..16) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let (ledger, compactor) = setup(max, 60_000);
                let mut handles = Vec::new();
                for i in 0..n {
                    handles.push(compactor.enqueue(address(i as u8), digest(i as u8)).await.unwrap());
                }
                compactor.flush().await;
                for handle in handles {
                    let receipt = handle.wait().await.unwrap();
                    assert!(receipt.verify());
                    assert!(ledger.has_root(&receipt.root()));
                    assert!(receipt.batch.len() <= max);
                }
            });
        }
    }
}
