//! Commit/reveal broadcast.
//!
//! The reveal spends an output of the commit, so it is only sent after the
//! commit broadcast succeeds. A failed reveal never rolls back the commit;
//! it surfaces as [`SdkError::RevealBroadcastFailed`].

use std::time::Instant;

use bitcoin::{Transaction, Txid};
use tracing::{error, info};

use crate::SdkError;
use crate::chain::ChainClient;
use crate::operations::tracking::{OperationStep, OperationTracker};
use crate::spend::{SpendStore, record_transaction};

/// Transaction ids of a broadcast pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PairTxids {
    pub commit: Txid,
    pub reveal: Txid,
}

/// Broadcast `commit` then `reveal`, recording each one's inputs as spent
/// right after it is accepted.
///
/// On failure returns the step that failed with its error: the transport
/// error for the commit, [`SdkError::RevealBroadcastFailed`] for the reveal.
pub(crate) async fn broadcast_pair<C: ChainClient, S: SpendStore>(
    chain: &C,
    spends: &S,
    commit: &Transaction,
    reveal: &Transaction,
    tracker: &mut OperationTracker,
) -> Result<PairTxids, (OperationStep, SdkError)> {
    let op_id = tracker.id();

    let t = Instant::now();
    let commit_txid = match chain.broadcast(commit).await {
        Ok(txid) => txid,
        Err(e) => {
            error!(op_id = %op_id, txid = %commit.compute_txid(), error = %e, "commit broadcast failed");
            return Err((OperationStep::CommitBroadcast, e));
        }
    };
    record_transaction(spends, commit);
    tracker.step_ok(OperationStep::CommitBroadcast, t.elapsed());
    info!(op_id = %op_id, txid = %commit_txid, "commit broadcast");

    let t = Instant::now();
    let reveal_txid = match chain.broadcast(reveal).await {
        Ok(txid) => txid,
        Err(e) => {
            error!(
                op_id = %op_id,
                commit_txid = %commit_txid,
                txid = %reveal.compute_txid(),
                error = %e,
                "reveal broadcast failed after commit landed"
            );
            return Err((
                OperationStep::RevealBroadcast,
                SdkError::RevealBroadcastFailed { commit_txid },
            ));
        }
    };
    record_transaction(spends, reveal);
    tracker.step_ok(OperationStep::RevealBroadcast, t.elapsed());
    info!(op_id = %op_id, txid = %reveal_txid, "reveal broadcast");

    Ok(PairTxids {
        commit: commit_txid,
        reveal: reveal_txid,
    })
}
