//! Token transfers.
//!
//! # Transfer Flow
//!
//! 1. **Metadata**: resolve the token by id.
//! 2. **Validation**: the receiver must be a taproot address on the
//!    configured network; the human amount is scaled by `10^decimals`
//!    exactly. No network call happens before both pass.
//! 3. **Fee outputs**: fetch, drop local spends, require at least one.
//! 4. **Token outputs**: fetch, drop local spends, order, greedy-select.
//! 5. **Merge**: more selected outputs than the fragmentation threshold are
//!    merged first. On failure the pipeline sleeps `merge_backoff` and
//!    aborts with [`SdkError::MergeFailed`].
//! 6. **Build**: largest fee output, selected token outputs, receiver.
//! 7. **Broadcast**: commit, then reveal, recording spends after each.

use std::time::Instant;

use bitcoin::Txid;
use sdk_core::utxo::total_amount;
use sdk_core::{parse_receiver, scale_by_decimals, unscale_by_decimals};
use tracing::{error, info, warn};

use crate::builder::{TransferPlan, TxBuilder};
use crate::chain::ChainClient;
use crate::operations::broadcast::broadcast_pair;
use crate::operations::tracking::{OperationError, OperationKind, OperationStep};
use crate::registry::TokenRegistry;
use crate::selection::{select_fee_output, select_token_outputs};
use crate::spend::SpendStore;
use crate::{Sdk, SdkError, Session};

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// A token transfer request.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub token_id: String,
    /// Receiver address; must be taproot.
    pub receiver: String,
    /// Amount in human units (e.g. `"2.5"`).
    pub amount: String,
    /// Fee rate in sat/vB.
    pub fee_rate: u64,
}

/// Response from a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub receiver: String,
    /// Amount in human units, in minimal form.
    pub amount: String,
    /// Amount in base units.
    pub amount_base: u128,
    pub commit_txid: Txid,
    pub reveal_txid: Txid,
    /// Reveal ids of merge pairs broadcast before the transfer.
    pub merge_txids: Vec<Txid>,
}

// ---------------------------------------------------------------------------
// Sdk::transfer
// ---------------------------------------------------------------------------

impl<C, B, R> Sdk<C, B, R>
where
    C: ChainClient,
    B: TxBuilder,
    R: TokenRegistry,
{
    /// Transfer tokens from the session wallet to `request.receiver`.
    ///
    /// # Errors
    ///
    /// [`SdkError::MergeFailed`] is the only retryable failure. A
    /// [`SdkError::RevealBroadcastFailed`] means the commit is already on
    /// the network and the operation is recorded as partially completed.
    pub async fn transfer<S: SpendStore>(
        &self,
        session: &Session<S>,
        request: TransferRequest,
    ) -> Result<TransferResult, OperationError> {
        let mut tracker = self.tracker(OperationKind::Transfer);
        let op_id = tracker.id();

        info!(
            op_id = %op_id,
            token_id = %request.token_id,
            receiver = %request.receiver,
            amount = %request.amount,
            "transferring tokens"
        );

        // Metadata.
        let t = Instant::now();
        let token = match self.lookup_token(&request.token_id) {
            Ok(token) => token,
            Err(e) => return Err(tracker.fail(OperationStep::MetadataLookup, e)),
        };
        tracker.step_ok(OperationStep::MetadataLookup, t.elapsed());

        // Receiver and amount.
        let t = Instant::now();
        let network = self.inner.config.network.network;
        let receiver = match parse_receiver(&request.receiver, network) {
            Ok(address) => address,
            Err(e) => {
                warn!(op_id = %op_id, receiver = %request.receiver, error = %e, "invalid receiver");
                return Err(tracker.fail(OperationStep::Validation, SdkError::InvalidReceiver));
            }
        };
        let decimals = token.info.decimals;
        let amount = match scale_by_decimals(&request.amount, decimals) {
            Ok(0) => {
                warn!(op_id = %op_id, "transfer amount is zero");
                return Err(tracker.fail(OperationStep::Validation, SdkError::InvalidAmount));
            }
            Ok(amount) => amount,
            Err(e) => {
                warn!(op_id = %op_id, amount = %request.amount, error = %e, "invalid amount");
                return Err(tracker.fail(OperationStep::Validation, SdkError::InvalidAmount));
            }
        };
        tracker.step_ok(OperationStep::Validation, t.elapsed());

        // Fee outputs.
        let t = Instant::now();
        let mut fee_utxos = match self.fee_pool(session, Vec::new()).await {
            Ok(pool) => pool,
            Err(e) => return Err(tracker.fail(OperationStep::FeeSelection, e)),
        };
        tracker.step_ok(OperationStep::FeeSelection, t.elapsed());

        // Token outputs.
        let t = Instant::now();
        let pool = match self.token_pool(session, &token, Vec::new()).await {
            Ok(pool) => pool,
            Err(e) => return Err(tracker.fail(OperationStep::TokenSelection, e)),
        };
        let mut selected = select_token_outputs(&pool, amount);
        if selected.is_empty() {
            warn!(
                op_id = %op_id,
                token_id = %token.token_id,
                held = total_amount(&pool).unwrap_or(u128::MAX),
                requested = amount,
                "insufficient token balance"
            );
            return Err(tracker.fail(
                OperationStep::TokenSelection,
                SdkError::InsufficientTokenBalance,
            ));
        }
        tracker.step_ok(OperationStep::TokenSelection, t.elapsed());

        // Merge.
        let mut merge_txids = Vec::new();
        if selected.len() > self.inner.config.fragmentation_threshold {
            let t = Instant::now();
            let merged = self
                .merge_outputs(
                    session,
                    &token,
                    request.fee_rate,
                    selected,
                    fee_utxos,
                    &mut tracker,
                )
                .await;
            match merged {
                Ok(merged) => {
                    selected = merged.tokens;
                    fee_utxos = merged.fee_utxos;
                    merge_txids = merged.reveal_txids;
                }
                Err(e) => {
                    error!(
                        op_id = %op_id,
                        token_id = %token.token_id,
                        error = %e,
                        backoff = ?self.inner.config.merge_backoff,
                        "merging token outputs failed"
                    );
                    tokio::time::sleep(self.inner.config.merge_backoff).await;
                    return Err(tracker.fail(OperationStep::Merge, e));
                }
            }
            tracker.step_ok(OperationStep::Merge, t.elapsed());
        } else {
            tracker.step_skipped(OperationStep::Merge);
        }

        // Fee output.
        let fee_utxo = match select_fee_output(&fee_utxos) {
            Ok(u) => u.clone(),
            Err(e) => {
                warn!(op_id = %op_id, "no fee output left after merge");
                return Err(tracker.fail(OperationStep::FeeSelection, e));
            }
        };

        // Build.
        let Some(input_total) = total_amount(&selected) else {
            error!(op_id = %op_id, "selected token amount overflows");
            return Err(tracker.fail(OperationStep::Build, SdkError::InvalidAmount));
        };
        let plan = TransferPlan {
            token: token.clone(),
            inputs: selected,
            fee_utxo,
            fee_rate: request.fee_rate,
            receiver: receiver.clone(),
            amount,
            owner: session.address().clone(),
        };
        let t = Instant::now();
        let built = match self.inner.builder.build_transfer(&plan).await {
            Ok(b) => b,
            Err(e) => {
                error!(op_id = %op_id, error = %e, "building transfer failed");
                return Err(tracker.fail(OperationStep::Build, e));
            }
        };
        let expected = if &receiver == session.address() {
            input_total
        } else {
            input_total - amount
        };
        if total_amount(&built.token_outputs) != Some(expected) {
            error!(
                op_id = %op_id,
                inputs = input_total,
                amount,
                "transfer change does not conserve token amount"
            );
            return Err(tracker.fail(OperationStep::Build, SdkError::BuildFailed));
        }
        tracker.step_ok(OperationStep::Build, t.elapsed());

        // Broadcast.
        let txids = match broadcast_pair(
            &self.inner.chain,
            session.spends(),
            &built.commit,
            &built.reveal,
            &mut tracker,
        )
        .await
        {
            Ok(txids) => txids,
            Err((step, e)) => return Err(tracker.fail(step, e)),
        };

        let display_amount = unscale_by_decimals(amount, decimals);
        info!(
            op_id = %op_id,
            token_id = %token.token_id,
            symbol = %token.info.symbol,
            amount = %display_amount,
            receiver = %receiver,
            txid = %txids.reveal,
            "tokens sent"
        );
        tracker.succeed();

        Ok(TransferResult {
            receiver: receiver.to_string(),
            amount: display_amount,
            amount_base: amount,
            commit_txid: txids.commit,
            reveal_txid: txids.reveal,
            merge_txids,
        })
    }
}
