use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use pod_types::{Address, Digest, LedgerRecord, TxRef};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::records::{CommitmentMetadata, LedgerCommitment, MAX_LEAVES_PER_COMMITMENT};
use crate::traits::LedgerGateway;

/// In-memory ledger for tests, local demos, and embedding.
///
/// Records are written directly with [`InMemoryLedger::write_record`], standing
/// in for the on-ledger program that owns them. Commitments are appended to a
/// sequential log. Failures and confirmation latency can be injected.
pub struct InMemoryLedger {
    inner: RwLock<LedgerState>,
    injected: Mutex<VecDeque<LedgerError>>,
    latency: Mutex<Option<Duration>>,
}

#[derive(Default)]
struct LedgerState {
    records: HashMap<Address, LedgerRecord>,
    commitments: Vec<LedgerCommitment>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerState::default()),
            injected: Mutex::new(VecDeque::new()),
            latency: Mutex::new(None),
        }
    }

    /// Store a validated record at `address`, replacing any previous one.
    pub fn write_record(&self, address: Address, record: LedgerRecord) -> LedgerResult<()> {
        record
            .validate()
            .map_err(|e| LedgerError::MalformedRecord(e.to_string()))?;
        debug!(address = %address.short_id(), kind = ?record.kind(), "record written");
        self.inner
            .write()
            .expect("lock poisoned")
            .records
            .insert(address, record);
        Ok(())
    }

    /// Decode raw account JSON and store it at `address`.
    pub fn write_raw_record(&self, address: Address, data: &[u8]) -> LedgerResult<()> {
        let record =
            LedgerRecord::from_json(data).map_err(|e| LedgerError::MalformedRecord(e.to_string()))?;
        self.write_record(address, record)
    }

    /// Remove the record at `address`, returning it if present.
    pub fn close_record(&self, address: &Address) -> Option<LedgerRecord> {
        self.inner
            .write()
            .expect("lock poisoned")
            .records
            .remove(address)
    }

    /// Make the next submission fail with `error`. Injected errors queue up
    /// and are consumed one per submission.
    pub fn inject_failure(&self, error: LedgerError) {
        self.injected.lock().expect("lock poisoned").push_back(error);
    }

    /// Delay every submission by `latency` before it is confirmed.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().expect("lock poisoned") = latency;
    }

    /// All confirmed commitments, oldest first.
    pub fn commitments(&self) -> Vec<LedgerCommitment> {
        self.inner.read().expect("lock poisoned").commitments.clone()
    }

    pub fn commitment_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").commitments.len()
    }

    pub fn commitment(&self, tx_ref: &TxRef) -> Option<LedgerCommitment> {
        self.inner
            .read()
            .expect("lock poisoned")
            .commitments
            .iter()
            .find(|c| &c.tx_ref == tx_ref)
            .cloned()
    }

    /// Returns `true` if some confirmed commitment has this root.
    pub fn has_root(&self, root: &Digest) -> bool {
        self.inner
            .read()
            .expect("lock poisoned")
            .commitments
            .iter()
            .any(|c| &c.root == root)
    }

    pub fn record_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").records.len()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn submit_commitment(
        &self,
        root: Digest,
        metadata: &CommitmentMetadata,
    ) -> LedgerResult<TxRef> {
        let latency = *self.latency.lock().expect("lock poisoned");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let injected = self.injected.lock().expect("lock poisoned").pop_front();
        if let Some(err) = injected {
            warn!(batch = metadata.batch_id, error = %err, "commitment failed");
            return Err(err);
        }

        if metadata.leaf_count == 0 || root.is_null() {
            return Err(LedgerError::Rejected("empty commitment".into()));
        }
        if metadata.leaf_count > MAX_LEAVES_PER_COMMITMENT {
            return Err(LedgerError::Rejected(format!(
                "{} leaves exceeds limit of {MAX_LEAVES_PER_COMMITMENT}",
                metadata.leaf_count
            )));
        }

        let mut state = self.inner.write().expect("lock poisoned");
        let seq = state.commitments.len() as u64 + 1;
        let commitment = LedgerCommitment::new(seq, root, metadata.clone());
        let tx_ref = commitment.tx_ref.clone();
        state.commitments.push(commitment);

        info!(
            seq,
            batch = metadata.batch_id,
            items = metadata.leaf_count,
            root = %root.short_hex(),
            "commitment confirmed"
        );
        Ok(tx_ref)
    }

    async fn fetch_record(&self, address: &Address) -> LedgerResult<LedgerRecord> {
        self.inner
            .read()
            .expect("lock poisoned")
            .records
            .get(address)
            .cloned()
            .ok_or(LedgerError::NotFound(*address))
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("records", &self.record_count())
            .field("commitments", &self.commitment_count())
            .finish()
    }
}
