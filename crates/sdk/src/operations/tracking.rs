//! Operation tracking for deploy, mint, transfer, and merge pipelines.
//!
//! Every public SDK method creates an [`Operation`] record that captures:
//! - A unique [`OperationId`] for log correlation
//! - The [`OperationKind`]
//! - A sequence of [`StepRecord`]s with timestamps, durations, and outcomes
//! - Final [`OperationStatus`]
//!
//! The [`OperationStore`] trait provides pluggable persistence. The default
//! [`NoopOperationStore`] discards everything; [`InMemoryOperationStore`]
//! keeps a bounded history of recent operations and answers which of them
//! left a commit on-chain without its reveal.
//!
//! There is no internal retry. A failed pipeline completes its operation as
//! `Failed` (or `PartiallyCompleted` when a commit landed without its
//! reveal) and the caller decides whether to run it again.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bitcoin::Txid;
use config::constants::OPERATION_HISTORY;

use crate::SdkError;

// ---------------------------------------------------------------------------
// OperationId
// ---------------------------------------------------------------------------

/// Unique identifier for an in-flight operation.
///
/// Monotonically increasing u64, displayed as `op-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId(u64);

impl OperationId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// The type of SDK operation being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationKind {
    Deploy,
    Mint,
    Transfer,
    Merge,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy => write!(f, "deploy"),
            Self::Mint => write!(f, "mint"),
            Self::Transfer => write!(f, "transfer"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

// ---------------------------------------------------------------------------
// OperationStatus
// ---------------------------------------------------------------------------

/// Final status of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// The operation is still running.
    InProgress,
    /// All steps succeeded.
    Succeeded,
    /// The operation failed with no side effects past the last recorded step.
    Failed,
    /// A commit transaction landed but its reveal did not.
    PartiallyCompleted,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::PartiallyCompleted => write!(f, "partially_completed"),
        }
    }
}

// ---------------------------------------------------------------------------
// OperationStep
// ---------------------------------------------------------------------------

/// A logical step within an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationStep {
    /// Receiver, amount, or token metadata validation.
    Validation,
    /// Token metadata lookup in the registry.
    MetadataLookup,
    /// Fetching and filtering fee-paying outputs.
    FeeSelection,
    /// Fetching and selecting token outputs.
    TokenSelection,
    /// Minter count lookup and shard pick.
    MinterSelection,
    /// Premine and limit enforcement.
    Quota,
    /// Consolidating fragmented token outputs.
    Merge,
    /// Transaction construction and signing.
    Build,
    /// Commit (or genesis) transaction broadcast.
    CommitBroadcast,
    /// Reveal transaction broadcast.
    RevealBroadcast,
    /// Persisting token metadata.
    Registry,
    /// Chained premine mint after a deploy.
    Premine,
}

impl fmt::Display for OperationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::MetadataLookup => write!(f, "metadata_lookup"),
            Self::FeeSelection => write!(f, "fee_selection"),
            Self::TokenSelection => write!(f, "token_selection"),
            Self::MinterSelection => write!(f, "minter_selection"),
            Self::Quota => write!(f, "quota"),
            Self::Merge => write!(f, "merge"),
            Self::Build => write!(f, "build"),
            Self::CommitBroadcast => write!(f, "commit_broadcast"),
            Self::RevealBroadcast => write!(f, "reveal_broadcast"),
            Self::Registry => write!(f, "registry"),
            Self::Premine => write!(f, "premine"),
        }
    }
}

// ---------------------------------------------------------------------------
// StepOutcome / StepRecord
// ---------------------------------------------------------------------------

/// Outcome of a single step execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Ok,
    Failed(SdkError),
    /// Step was skipped (e.g. merge not needed, premine shape mismatch).
    Skipped,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Failed(e) => write!(f, "failed({e})"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// A timestamped record of a step execution.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: OperationStep,
    pub outcome: StepOutcome,
    pub timestamp: Instant,
    /// How long it took (`None` for skipped steps).
    pub duration: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Full record of an SDK operation.
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: OperationId,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub steps: Vec<StepRecord>,
    pub created_at: Instant,
    pub completed_at: Option<Instant>,
}

impl Operation {
    pub(crate) fn new(kind: OperationKind) -> Self {
        Self {
            id: OperationId::next(),
            kind,
            status: OperationStatus::InProgress,
            steps: Vec::new(),
            created_at: Instant::now(),
            completed_at: None,
        }
    }

    fn push(&mut self, step: OperationStep, outcome: StepOutcome, duration: Option<Duration>) {
        self.steps.push(StepRecord {
            step,
            outcome,
            timestamp: Instant::now(),
            duration,
        });
    }

    pub(crate) fn complete(&mut self, status: OperationStatus) {
        self.status = status;
        self.completed_at = Some(Instant::now());
    }

    /// The commit whose reveal never went out, if the operation stopped
    /// there.
    pub fn stranded_commit(&self) -> Option<Txid> {
        self.steps.iter().rev().find_map(|s| match s.outcome {
            StepOutcome::Failed(SdkError::RevealBroadcastFailed { commit_txid }) => {
                Some(commit_txid)
            }
            _ => None,
        })
    }

    /// Returns `true` if `step` was recorded as successful.
    pub fn completed(&self, step: OperationStep) -> bool {
        self.steps
            .iter()
            .any(|s| s.step == step && s.outcome == StepOutcome::Ok)
    }
}

// ---------------------------------------------------------------------------
// OperationError
// ---------------------------------------------------------------------------

/// Rich error returned by tracked SDK operations.
///
/// Wraps the base [`SdkError`] with the operation context: which operation
/// failed, at which step, and what had already completed.
#[derive(Debug, Clone)]
pub struct OperationError {
    pub operation_id: OperationId,
    pub kind: OperationKind,
    pub error: SdkError,
    pub failed_step: OperationStep,
    pub completed_steps: Vec<StepRecord>,
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} failed at {}: {}",
            self.operation_id, self.kind, self.failed_step, self.error
        )
    }
}

impl std::error::Error for OperationError {}

impl From<OperationError> for SdkError {
    fn from(e: OperationError) -> Self {
        e.error
    }
}

// ---------------------------------------------------------------------------
// OperationStore trait
// ---------------------------------------------------------------------------

/// Pluggable storage for operation tracking records.
pub trait OperationStore: Send + Sync {
    /// Record a new operation (status = InProgress).
    fn record(&self, op: &Operation);

    fn get(&self, id: OperationId) -> Option<Operation>;

    /// Append a step record to an existing operation.
    fn update_step(&self, id: OperationId, step: StepRecord);

    /// Mark an operation as complete with the given status.
    fn complete(&self, id: OperationId, status: OperationStatus);
}

/// Discards all records.
pub struct NoopOperationStore;

impl OperationStore for NoopOperationStore {
    fn record(&self, _op: &Operation) {}

    fn get(&self, _id: OperationId) -> Option<Operation> {
        None
    }

    fn update_step(&self, _id: OperationId, _step: StepRecord) {}

    fn complete(&self, _id: OperationId, _status: OperationStatus) {}
}

/// Bounded in-memory history of recent operations.
///
/// Holds at most `capacity` records; recording one more evicts the oldest.
/// Records are lost on restart.
pub struct InMemoryOperationStore {
    history: Mutex<History>,
}

struct History {
    capacity: usize,
    ops: HashMap<OperationId, Operation>,
    /// Ids in recording order, oldest first.
    order: VecDeque<OperationId>,
}

impl InMemoryOperationStore {
    /// A store keeping the last [`OPERATION_HISTORY`] operations.
    pub fn new() -> Self {
        Self::with_capacity(OPERATION_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: Mutex::new(History {
                capacity: capacity.max(1),
                ops: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Number of operations held.
    pub fn len(&self) -> usize {
        self.history.lock().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operations that broadcast a commit but not its reveal, oldest first.
    ///
    /// These need an operator: the commit's fee output is spent and the
    /// reveal has to be rebuilt or abandoned by hand.
    pub fn partially_completed(&self) -> Vec<Operation> {
        let history = self.history.lock().unwrap();
        history
            .order
            .iter()
            .filter_map(|id| history.ops.get(id))
            .filter(|op| op.status == OperationStatus::PartiallyCompleted)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryOperationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationStore for InMemoryOperationStore {
    fn record(&self, op: &Operation) {
        let mut history = self.history.lock().unwrap();
        if history.ops.insert(op.id, op.clone()).is_none() {
            history.order.push_back(op.id);
        }
        while history.order.len() > history.capacity {
            if let Some(evicted) = history.order.pop_front() {
                history.ops.remove(&evicted);
            }
        }
    }

    fn get(&self, id: OperationId) -> Option<Operation> {
        self.history.lock().unwrap().ops.get(&id).cloned()
    }

    fn update_step(&self, id: OperationId, step: StepRecord) {
        if let Some(op) = self.history.lock().unwrap().ops.get_mut(&id) {
            op.steps.push(step);
        }
    }

    fn complete(&self, id: OperationId, status: OperationStatus) {
        if let Some(op) = self.history.lock().unwrap().ops.get_mut(&id) {
            op.status = status;
            op.completed_at = Some(Instant::now());
        }
    }
}

// ---------------------------------------------------------------------------
// OperationTracker
// ---------------------------------------------------------------------------

/// Convenience wrapper around a store reference and a live operation.
pub(crate) struct OperationTracker {
    store: Arc<dyn OperationStore>,
    pub op: Operation,
}

impl OperationTracker {
    pub fn start(store: Arc<dyn OperationStore>, kind: OperationKind) -> Self {
        let op = Operation::new(kind);
        store.record(&op);
        Self { store, op }
    }

    pub fn id(&self) -> OperationId {
        self.op.id
    }

    fn push(&mut self, step: OperationStep, outcome: StepOutcome, duration: Option<Duration>) {
        self.op.push(step, outcome, duration);
        if let Some(last) = self.op.steps.last() {
            self.store.update_step(self.op.id, last.clone());
        }
    }

    /// Record a successful step.
    pub fn step_ok(&mut self, step: OperationStep, duration: Duration) {
        self.push(step, StepOutcome::Ok, Some(duration));
    }

    /// Record a failed step that does not end the operation.
    pub fn step_failed(&mut self, step: OperationStep, error: SdkError, duration: Duration) {
        self.push(step, StepOutcome::Failed(error), Some(duration));
    }

    pub fn step_skipped(&mut self, step: OperationStep) {
        self.push(step, StepOutcome::Skipped, None);
    }

    /// Mark the operation as succeeded and persist.
    pub fn succeed(mut self) {
        self.op.complete(OperationStatus::Succeeded);
        self.store.complete(self.op.id, OperationStatus::Succeeded);
    }

    /// Mark as failed, returning an [`OperationError`].
    ///
    /// A [`SdkError::RevealBroadcastFailed`] completes the operation as
    /// partially completed instead.
    pub fn fail(self, failed_step: OperationStep, error: SdkError) -> OperationError {
        let status = match error {
            SdkError::RevealBroadcastFailed { .. } => OperationStatus::PartiallyCompleted,
            _ => OperationStatus::Failed,
        };
        self.finish(status, failed_step, error)
    }

    fn finish(
        mut self,
        status: OperationStatus,
        failed_step: OperationStep,
        error: SdkError,
    ) -> OperationError {
        self.push(failed_step, StepOutcome::Failed(error), None);
        self.op.complete(status);
        self.store.complete(self.op.id, status);
        OperationError {
            operation_id: self.op.id,
            kind: self.op.kind,
            error,
            failed_step,
            completed_steps: self.op.steps,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
