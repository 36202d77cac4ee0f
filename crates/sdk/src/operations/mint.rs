//! Token mints against open minter contracts.
//!
//! # Mint Flow
//!
//! 1. Resolve the token and its minter policy from the artifact hash.
//! 2. Fetch fee outputs, dropping local spends.
//! 3. Count minter instances and pick a shard offset.
//! 4. Resolve the mint amount through the quota engine
//!    ([`resolve_mint_amount`]). Violations fail before anything is built.
//! 5. Build, then broadcast commit and reveal.
//! 6. Optionally merge the wallet's holdings of the token.

use std::time::Instant;

use bitcoin::Txid;
use sdk_core::utxo::total_amount;
use sdk_core::{
    MinterState, MinterUtxo, ScaledTokenInfo, TokenMetadata, Utxo, scale_by_decimals,
};
use tracing::{error, info, warn};

use crate::builder::{BuiltPair, MintPlan, TxBuilder};
use crate::chain::ChainClient;
use crate::minter::{MintQuota, MinterPolicy, classify_minter, resolve_mint_amount};
use crate::operations::broadcast::{PairTxids, broadcast_pair};
use crate::operations::merge::MergeOutcome;
use crate::operations::tracking::{OperationError, OperationKind, OperationStep, OperationTracker};
use crate::registry::TokenRegistry;
use crate::selection::select_fee_output;
use crate::spend::SpendStore;
use crate::{Sdk, SdkError, Session};

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// A mint request.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub token_id: String,
    /// Amount in human units. `None` mints the default (premine for an
    /// unprimed minter, otherwise `limit`).
    pub amount: Option<String>,
    /// Merge the wallet's holdings of the token after minting.
    pub merge: bool,
    /// Fee rate in sat/vB.
    pub fee_rate: u64,
}

/// Response from a mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintResult {
    pub commit_txid: Txid,
    pub reveal_txid: Txid,
    /// Base units released.
    pub amount: u128,
    /// Whether this mint was the premine.
    pub is_premine: bool,
    /// Shard offset of the minter used.
    pub minter_offset: usize,
    /// Minter state after the mint.
    pub minter_state: MinterState,
    pub merge: MergeOutcome,
}

/// A mint that has been broadcast.
pub(crate) struct Minted {
    pub txids: PairTxids,
    pub quota: MintQuota,
    pub state: MinterState,
    pub built: BuiltPair,
}

// ---------------------------------------------------------------------------
// Sdk::mint
// ---------------------------------------------------------------------------

impl<C, B, R> Sdk<C, B, R>
where
    C: ChainClient,
    B: TxBuilder,
    R: TokenRegistry,
{
    /// Mint tokens to the session wallet.
    pub async fn mint<S: SpendStore>(
        &self,
        session: &Session<S>,
        request: MintRequest,
    ) -> Result<MintResult, OperationError> {
        let mut tracker = self.tracker(OperationKind::Mint);
        let op_id = tracker.id();

        info!(
            op_id = %op_id,
            token_id = %request.token_id,
            amount = ?request.amount,
            merge = request.merge,
            "minting tokens"
        );

        let t = Instant::now();
        let token = match self.lookup_token(&request.token_id) {
            Ok(token) => token,
            Err(e) => return Err(tracker.fail(OperationStep::MetadataLookup, e)),
        };
        tracker.step_ok(OperationStep::MetadataLookup, t.elapsed());

        // Minter policy, quota parameters, requested amount.
        let t = Instant::now();
        let policy = match classify_minter(&token.info.minter_md5) {
            Ok(policy) => policy,
            Err(e) => return Err(tracker.fail(OperationStep::Validation, e)),
        };
        let scaled = match token.info.scaled() {
            Ok(scaled) => scaled,
            Err(e) => {
                error!(op_id = %op_id, error = %e, "registered token info does not scale");
                return Err(tracker.fail(OperationStep::Validation, SdkError::InvalidTokenMetadata));
            }
        };
        let requested = match request.amount.as_deref() {
            None => None,
            Some(amount) => match scale_by_decimals(amount, scaled.decimals) {
                Ok(amount) => Some(amount),
                Err(e) => {
                    warn!(op_id = %op_id, amount, error = %e, "invalid mint amount");
                    return Err(tracker.fail(OperationStep::Validation, SdkError::InvalidAmount));
                }
            },
        };
        tracker.step_ok(OperationStep::Validation, t.elapsed());

        let t = Instant::now();
        let fee_utxos = match self.fee_pool(session, Vec::new()).await {
            Ok(pool) => pool,
            Err(e) => return Err(tracker.fail(OperationStep::FeeSelection, e)),
        };
        tracker.step_ok(OperationStep::FeeSelection, t.elapsed());

        // Minter shard.
        let t = Instant::now();
        let (offset, minter) = match self.select_minter(&token).await {
            Ok(m) => m,
            Err(e) => return Err(tracker.fail(OperationStep::MinterSelection, e)),
        };
        tracker.step_ok(OperationStep::MinterSelection, t.elapsed());

        let minted = match self
            .mint_from(
                session,
                &token,
                policy,
                &scaled,
                minter,
                requested,
                &fee_utxos,
                request.fee_rate,
                &mut tracker,
            )
            .await
        {
            Ok(minted) => minted,
            Err((step, e)) => return Err(tracker.fail(step, e)),
        };

        let merge = if request.merge {
            let t = Instant::now();
            match self
                .consolidate(
                    session,
                    &token,
                    request.fee_rate,
                    minted.built.token_outputs.clone(),
                    minted.built.fee_change.clone(),
                    &mut tracker,
                )
                .await
            {
                Ok(result) if result.reveal_txids.is_empty() => MergeOutcome::NotNeeded,
                Ok(result) => MergeOutcome::Merged(result),
                Err((step, e)) => {
                    warn!(op_id = %op_id, step = %step, error = %e, "post-mint merge failed");
                    tracker.step_failed(step, e, t.elapsed());
                    MergeOutcome::Failed(e)
                }
            }
        } else {
            MergeOutcome::NotRequested
        };

        tracker.succeed();

        Ok(MintResult {
            commit_txid: minted.txids.commit,
            reveal_txid: minted.txids.reveal,
            amount: minted.quota.amount,
            is_premine: minted.quota.is_premine,
            minter_offset: offset,
            minter_state: minted.state,
            merge,
        })
    }

    /// Pick a minter shard and fetch it.
    async fn select_minter(&self, token: &TokenMetadata) -> Result<(usize, MinterUtxo), SdkError> {
        let count = self
            .inner
            .chain
            .minter_count(token)
            .await
            .inspect_err(|e| {
                warn!(token_id = %token.token_id, error = %e, "minter count lookup failed")
            })?;
        if count == 0 {
            warn!(token_id = %token.token_id, "token has no live minters");
            return Err(SdkError::MinterNotFound);
        }

        let offset = self.shard_picker().pick(count);
        match self.inner.chain.fetch_minter(token, offset).await {
            Ok(Some(minter)) => Ok((offset, minter)),
            Ok(None) => {
                warn!(token_id = %token.token_id, offset, count, "no minter at offset");
                Err(SdkError::MinterNotFound)
            }
            Err(e) => {
                warn!(token_id = %token.token_id, offset, error = %e, "minter lookup failed");
                Err(e)
            }
        }
    }

    /// Enforce the quota on `minter`, then build and broadcast the mint.
    ///
    /// Shared by [`Sdk::mint`] and the premine chained onto a deploy.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn mint_from<S: SpendStore>(
        &self,
        session: &Session<S>,
        token: &TokenMetadata,
        policy: &'static dyn MinterPolicy,
        scaled: &ScaledTokenInfo,
        minter: MinterUtxo,
        requested: Option<u128>,
        fee_utxos: &[Utxo],
        fee_rate: u64,
        tracker: &mut OperationTracker,
    ) -> Result<Minted, (OperationStep, SdkError)> {
        let op_id = tracker.id();

        let t = Instant::now();
        let quota = resolve_mint_amount(policy, scaled, &minter.state, requested)
            .map_err(|e| (OperationStep::Quota, e))?;
        tracker.step_ok(OperationStep::Quota, t.elapsed());

        let fee_utxo = select_fee_output(fee_utxos)
            .map_err(|e| {
                warn!(op_id = %op_id, "no fee output for mint");
                (OperationStep::FeeSelection, e)
            })?
            .clone();

        let plan = MintPlan {
            token: token.clone(),
            minter: minter.clone(),
            amount: quota.amount,
            fee_utxo,
            fee_rate,
            owner: session.address().clone(),
        };
        let t = Instant::now();
        let built = self.inner.builder.build_mint(&plan).await.map_err(|e| {
            error!(op_id = %op_id, error = %e, "building mint failed");
            (OperationStep::Build, e)
        })?;
        if total_amount(&built.token_outputs) != Some(quota.amount) {
            error!(op_id = %op_id, amount = quota.amount, "mint outputs do not match the quota");
            return Err((OperationStep::Build, SdkError::BuildFailed));
        }
        tracker.step_ok(OperationStep::Build, t.elapsed());

        let txids = broadcast_pair(
            &self.inner.chain,
            session.spends(),
            &built.commit,
            &built.reveal,
            tracker,
        )
        .await?;

        let state = policy.advance(&minter.state, quota.amount, scaled);
        info!(
            op_id = %op_id,
            token_id = %token.token_id,
            variant = %policy.variant(),
            amount = quota.amount,
            premine = quota.is_premine,
            txid = %txids.reveal,
            "tokens minted"
        );

        Ok(Minted {
            txids,
            quota,
            state,
            built,
        })
    }
}
