//! Consolidation of fragmented token holdings.
//!
//! # Merge Flow
//!
//! While more token outputs are held than the fragmentation threshold:
//!
//! 1. Split the outputs into groups of at most four (the covenant's input limit).
//! 2. For each group with more than one output, pick the largest fee output
//!    and build a self-transfer of the group's full amount.
//! 3. Broadcast its commit and reveal, recording spends after each.
//! 4. Carry the merged output and the fee change into the next round.
//!
//! Any failure aborts with [`SdkError::MergeFailed`]. Pairs already
//! broadcast stay on-chain and stay recorded in the spend store; nothing is
//! rolled back. Retrying is the caller's decision.

use std::time::Instant;

use bitcoin::Txid;
use config::constants::MAX_TOKEN_INPUTS;
use sdk_core::utxo::total_amount;
use sdk_core::{TokenMetadata, TokenUtxo, Utxo};
use tracing::{error, info, warn};

use crate::builder::{TransferPlan, TxBuilder};
use crate::chain::ChainClient;
use crate::operations::broadcast::broadcast_pair;
use crate::operations::helpers::extend_missing;
use crate::operations::tracking::{OperationError, OperationKind, OperationStep, OperationTracker};
use crate::registry::TokenRegistry;
use crate::selection::{select_fee_output, unspent};
use crate::spend::SpendStore;
use crate::{Sdk, SdkError, Session};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Response from a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Reveal transaction ids of every merge pair, in broadcast order.
    /// Empty when the holdings were already under the threshold.
    pub reveal_txids: Vec<Txid>,

    /// Number of token outputs held afterwards.
    pub outputs: usize,
}

/// Outcome of the optional merge that can follow a mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The mint request did not ask for a merge.
    NotRequested,
    /// Holdings were already under the threshold.
    NotNeeded,
    Merged(MergeResult),
    /// The merge failed after the mint succeeded.
    Failed(SdkError),
}

/// Token outputs and fee pool after a merge.
pub(crate) struct Merged {
    pub tokens: Vec<TokenUtxo>,
    pub fee_utxos: Vec<Utxo>,
    pub reveal_txids: Vec<Txid>,
}

// ---------------------------------------------------------------------------
// Sdk::merge
// ---------------------------------------------------------------------------

impl<C, B, R> Sdk<C, B, R>
where
    C: ChainClient,
    B: TxBuilder,
    R: TokenRegistry,
{
    /// Merge the session wallet's holdings of `token_id` until no more than
    /// the fragmentation threshold remain.
    pub async fn merge<S: SpendStore>(
        &self,
        session: &Session<S>,
        token_id: &str,
        fee_rate: u64,
    ) -> Result<MergeResult, OperationError> {
        let mut tracker = self.tracker(OperationKind::Merge);

        let t = Instant::now();
        let token = match self.lookup_token(token_id) {
            Ok(token) => token,
            Err(e) => return Err(tracker.fail(OperationStep::MetadataLookup, e)),
        };
        tracker.step_ok(OperationStep::MetadataLookup, t.elapsed());

        match self
            .consolidate(session, &token, fee_rate, Vec::new(), Vec::new(), &mut tracker)
            .await
        {
            Ok(result) => {
                tracker.succeed();
                Ok(result)
            }
            Err((step, e)) => Err(tracker.fail(step, e)),
        }
    }

    /// Fetch current holdings (plus `fresh` outputs not yet indexed) and
    /// merge them if they exceed the threshold.
    pub(crate) async fn consolidate<S: SpendStore>(
        &self,
        session: &Session<S>,
        token: &TokenMetadata,
        fee_rate: u64,
        fresh_tokens: Vec<TokenUtxo>,
        fresh_fees: Vec<Utxo>,
        tracker: &mut OperationTracker,
    ) -> Result<MergeResult, (OperationStep, SdkError)> {
        let t = Instant::now();
        let tokens = self
            .token_pool(session, token, fresh_tokens)
            .await
            .map_err(|e| (OperationStep::TokenSelection, e))?;
        tracker.step_ok(OperationStep::TokenSelection, t.elapsed());

        if tokens.len() <= self.inner.config.fragmentation_threshold {
            tracker.step_skipped(OperationStep::Merge);
            return Ok(MergeResult {
                reveal_txids: Vec::new(),
                outputs: tokens.len(),
            });
        }

        let t = Instant::now();
        let fee_utxos = self
            .fee_pool(session, fresh_fees)
            .await
            .map_err(|e| (OperationStep::FeeSelection, e))?;
        tracker.step_ok(OperationStep::FeeSelection, t.elapsed());

        let t = Instant::now();
        let merged = self
            .merge_outputs(session, token, fee_rate, tokens, fee_utxos, tracker)
            .await
            .map_err(|e| (OperationStep::Merge, e))?;
        tracker.step_ok(OperationStep::Merge, t.elapsed());

        Ok(MergeResult {
            reveal_txids: merged.reveal_txids,
            outputs: merged.tokens.len(),
        })
    }

    /// Merge `tokens` down to the fragmentation threshold.
    ///
    /// Returns the merged token outputs and the fee pool with spent fee
    /// outputs removed and fee change added.
    pub(crate) async fn merge_outputs<S: SpendStore>(
        &self,
        session: &Session<S>,
        token: &TokenMetadata,
        fee_rate: u64,
        mut tokens: Vec<TokenUtxo>,
        mut fee_utxos: Vec<Utxo>,
        tracker: &mut OperationTracker,
    ) -> Result<Merged, SdkError> {
        let op_id = tracker.id();
        let threshold = self.inner.config.fragmentation_threshold;
        let mut reveal_txids = Vec::new();

        info!(
            op_id = %op_id,
            token_id = %token.token_id,
            outputs = tokens.len(),
            "merging token outputs"
        );

        while tokens.len() > threshold {
            let before = tokens.len();
            let mut next = Vec::with_capacity(before / MAX_TOKEN_INPUTS + 1);

            for group in tokens.chunks(MAX_TOKEN_INPUTS) {
                if let [single] = group {
                    next.push(single.clone());
                    continue;
                }

                let fee_utxo = match select_fee_output(&fee_utxos) {
                    Ok(u) => u.clone(),
                    Err(e) => {
                        warn!(op_id = %op_id, error = %e, "merge ran out of fee outputs");
                        return Err(SdkError::MergeFailed);
                    }
                };
                let Some(amount) = total_amount(group) else {
                    error!(op_id = %op_id, "merge group amount overflows");
                    return Err(SdkError::MergeFailed);
                };

                let plan = TransferPlan {
                    token: token.clone(),
                    inputs: group.to_vec(),
                    fee_utxo,
                    fee_rate,
                    receiver: session.address().clone(),
                    amount,
                    owner: session.address().clone(),
                };

                let t = Instant::now();
                let built = match self.inner.builder.build_transfer(&plan).await {
                    Ok(b) => b,
                    Err(e) => {
                        error!(op_id = %op_id, error = %e, "building merge transaction failed");
                        tracker.step_failed(OperationStep::Build, e, t.elapsed());
                        return Err(SdkError::MergeFailed);
                    }
                };
                if total_amount(&built.token_outputs) != Some(amount) {
                    error!(
                        op_id = %op_id,
                        expected = amount,
                        "merge transaction does not conserve token amount"
                    );
                    tracker.step_failed(OperationStep::Build, SdkError::BuildFailed, t.elapsed());
                    return Err(SdkError::MergeFailed);
                }
                tracker.step_ok(OperationStep::Build, t.elapsed());

                let t = Instant::now();
                let txids = match broadcast_pair(
                    &self.inner.chain,
                    session.spends(),
                    &built.commit,
                    &built.reveal,
                    tracker,
                )
                .await
                {
                    Ok(txids) => txids,
                    Err((step, e)) => {
                        tracker.step_failed(step, e, t.elapsed());
                        return Err(SdkError::MergeFailed);
                    }
                };

                fee_utxos = unspent(fee_utxos, session.spends());
                extend_missing(&mut fee_utxos, built.fee_change);
                next.extend(built.token_outputs);
                reveal_txids.push(txids.reveal);

                info!(
                    op_id = %op_id,
                    inputs = group.len(),
                    txid = %txids.reveal,
                    "merged token outputs"
                );
            }

            if next.len() >= before {
                error!(op_id = %op_id, outputs = before, "merge round made no progress");
                return Err(SdkError::MergeFailed);
            }
            tokens = next;
        }

        Ok(Merged {
            tokens,
            fee_utxos,
            reveal_txids,
        })
    }
}
