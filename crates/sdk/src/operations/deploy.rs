//! Token deploys with an optional chained premine.
//!
//! # Deploy Flow
//!
//! 1. **Validation**: token metadata is checked before any network call.
//! 2. **Fee outputs**: fetch, drop local spends.
//! 3. **Build**: genesis (token identity) and reveal (first minter), always
//!    against the open minter V2 contract.
//! 4. **Broadcast**: genesis, then reveal, recording spends after each.
//! 5. **Registry**: persist the new token's metadata.
//! 6. **Premine**: when the token has a premine and genesis has the expected
//!    three outputs, mint exactly the premine from the new minter, funded by
//!    genesis output 2. An unexpected shape skips the premine with a warning;
//!    a failed premine is reported in the result. Neither fails the deploy.

use std::time::Instant;

use bitcoin::Txid;
use config::constants::{
    GENESIS_OUTPUTS_WITH_PREMINE, MAX_DECIMALS, MINTER_OUTPUT_INDEX, PREMINE_FEE_OUTPUT_INDEX,
};
use sdk_core::{MinterUtxo, MinterVariant, ScaledTokenInfo, TokenInfo, TokenMetadata, Utxo};
use tracing::{error, info, warn};

use crate::builder::{BuiltDeploy, DeployPlan, TxBuilder};
use crate::chain::ChainClient;
use crate::minter::policy_for;
use crate::operations::broadcast::broadcast_pair;
use crate::operations::tracking::{OperationError, OperationKind, OperationStep, OperationTracker};
use crate::registry::TokenRegistry;
use crate::spend::SpendStore;
use crate::{Sdk, SdkError, Session};

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// A deploy request.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub info: TokenInfo,
    /// Fee rate in sat/vB.
    pub fee_rate: u64,
}

/// What happened to the premine after a deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PremineOutcome {
    /// The token has no premine.
    NotRequested,
    /// Genesis did not have the expected shape.
    Skipped,
    /// The premine was minted in this reveal transaction.
    Minted(Txid),
    Failed(SdkError),
}

/// Response from a deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    pub token_id: String,
    pub genesis_txid: Txid,
    pub reveal_txid: Txid,
    pub token_address: String,
    pub minter_address: String,
    pub premine: PremineOutcome,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check deploy metadata and scale it into base units.
///
/// # Errors
///
/// [`SdkError::InvalidTokenMetadata`] if the name or symbol is blank,
/// `decimals` exceeds 18, `max` is zero, `limit` is zero or above `max`,
/// `premine` is above `max`, or any value overflows when scaled.
pub fn validate_token_info(info: &TokenInfo) -> Result<ScaledTokenInfo, SdkError> {
    let reason = if info.name.trim().is_empty() {
        Some("name is empty")
    } else if info.symbol.trim().is_empty() {
        Some("symbol is empty")
    } else if info.decimals > MAX_DECIMALS {
        Some("too many decimals")
    } else if info.max_supply == 0 {
        Some("max supply is zero")
    } else if info.limit == 0 || info.limit > info.max_supply {
        Some("limit out of range")
    } else if info.premine > info.max_supply {
        Some("premine exceeds max supply")
    } else {
        None
    };
    if let Some(reason) = reason {
        warn!(symbol = %info.symbol, reason, "invalid token metadata");
        return Err(SdkError::InvalidTokenMetadata);
    }

    info.scaled().map_err(|e| {
        warn!(symbol = %info.symbol, error = %e, "token metadata does not scale");
        SdkError::InvalidTokenMetadata
    })
}

// ---------------------------------------------------------------------------
// Sdk::deploy
// ---------------------------------------------------------------------------

impl<C, B, R> Sdk<C, B, R>
where
    C: ChainClient,
    B: TxBuilder,
    R: TokenRegistry,
{
    /// Deploy a new token from the session wallet.
    pub async fn deploy<S: SpendStore>(
        &self,
        session: &Session<S>,
        request: DeployRequest,
    ) -> Result<DeployResult, OperationError> {
        let mut tracker = self.tracker(OperationKind::Deploy);
        let op_id = tracker.id();

        info!(op_id = %op_id, symbol = %request.info.symbol, "deploying token");

        let t = Instant::now();
        let scaled = match validate_token_info(&request.info) {
            Ok(scaled) => scaled,
            Err(e) => return Err(tracker.fail(OperationStep::Validation, e)),
        };
        tracker.step_ok(OperationStep::Validation, t.elapsed());

        let t = Instant::now();
        let fee_utxos = match self.fee_pool(session, Vec::new()).await {
            Ok(pool) => pool,
            Err(e) => return Err(tracker.fail(OperationStep::FeeSelection, e)),
        };
        tracker.step_ok(OperationStep::FeeSelection, t.elapsed());

        let mut info = request.info;
        info.minter_md5 = MinterVariant::OpenMinterV2.md5().to_owned();
        let plan = DeployPlan {
            info,
            fee_utxos,
            fee_rate: request.fee_rate,
            owner: session.address().clone(),
        };

        let t = Instant::now();
        let built = match self.inner.builder.build_deploy(&plan).await {
            Ok(b) => b,
            Err(e) => {
                error!(op_id = %op_id, error = %e, "building deploy failed");
                return Err(tracker.fail(OperationStep::Build, e));
            }
        };
        tracker.step_ok(OperationStep::Build, t.elapsed());

        let txids = match broadcast_pair(
            &self.inner.chain,
            session.spends(),
            &built.genesis,
            &built.reveal,
            &mut tracker,
        )
        .await
        {
            Ok(txids) => txids,
            Err((step, e)) => return Err(tracker.fail(step, e)),
        };

        let metadata = TokenMetadata {
            token_id: built.token_id.clone(),
            info: plan.info,
            token_address: built.token_address.clone(),
            minter_address: built.minter_address.clone(),
            genesis_txid: txids.commit,
            reveal_txid: txids.reveal,
        };

        let t = Instant::now();
        if let Err(e) = self.inner.registry.insert(&metadata) {
            error!(
                op_id = %op_id,
                token_id = %metadata.token_id,
                genesis_txid = %txids.commit,
                error = %e,
                "token deployed on-chain but metadata was not stored"
            );
            return Err(tracker.fail(OperationStep::Registry, e));
        }
        tracker.step_ok(OperationStep::Registry, t.elapsed());

        info!(
            op_id = %op_id,
            token_id = %metadata.token_id,
            genesis_txid = %txids.commit,
            reveal_txid = %txids.reveal,
            "token deployed"
        );

        let premine = self
            .premine(session, &metadata, &scaled, &built, request.fee_rate, &mut tracker)
            .await;

        tracker.succeed();

        Ok(DeployResult {
            token_id: metadata.token_id,
            genesis_txid: txids.commit,
            reveal_txid: txids.reveal,
            token_address: metadata.token_address,
            minter_address: metadata.minter_address,
            premine,
        })
    }

    /// Mint the premine from the minter the deploy reveal created.
    async fn premine<S: SpendStore>(
        &self,
        session: &Session<S>,
        token: &TokenMetadata,
        scaled: &ScaledTokenInfo,
        built: &BuiltDeploy,
        fee_rate: u64,
        tracker: &mut OperationTracker,
    ) -> PremineOutcome {
        let op_id = tracker.id();
        if scaled.premine == 0 {
            return PremineOutcome::NotRequested;
        }

        let shape = (built.genesis.output.len() == GENESIS_OUTPUTS_WITH_PREMINE)
            .then(|| {
                let minter = Utxo::from_tx_output(&built.reveal, MINTER_OUTPUT_INDEX)?;
                let fee = Utxo::from_tx_output(&built.genesis, PREMINE_FEE_OUTPUT_INDEX)?;
                Some((minter, fee))
            })
            .flatten();
        let Some((minter_utxo, fee_utxo)) = shape else {
            warn!(
                op_id = %op_id,
                token_id = %token.token_id,
                genesis_outputs = built.genesis.output.len(),
                "unexpected genesis shape, skipping premine"
            );
            tracker.step_skipped(OperationStep::Premine);
            return PremineOutcome::Skipped;
        };

        let policy = policy_for(MinterVariant::OpenMinterV2);
        let minter = MinterUtxo {
            utxo: minter_utxo,
            state: policy.initial_state(scaled),
        };

        let t = Instant::now();
        match self
            .mint_from(
                session,
                token,
                policy,
                scaled,
                minter,
                Some(scaled.premine),
                &[fee_utxo],
                fee_rate,
                tracker,
            )
            .await
        {
            Ok(minted) => {
                tracker.step_ok(OperationStep::Premine, t.elapsed());
                PremineOutcome::Minted(minted.txids.reveal)
            }
            Err((step, e)) => {
                error!(
                    op_id = %op_id,
                    token_id = %token.token_id,
                    step = %step,
                    error = %e,
                    "minting premine failed"
                );
                tracker.step_failed(OperationStep::Premine, e, t.elapsed());
                PremineOutcome::Failed(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> TokenInfo {
        TokenInfo {
            name: "cat".to_owned(),
            symbol: "CAT".to_owned(),
            decimals: 2,
            max_supply: 21_000_000,
            limit: 5,
            premine: 0,
            minter_md5: String::new(),
        }
    }

    #[test]
    fn valid_info_scales() {
        let scaled = validate_token_info(&info()).unwrap();
        assert_eq!(scaled.limit, 500);
        assert_eq!(scaled.max_supply, 2_100_000_000);
    }

    #[test]
    fn rejects_malformed_info() {
        let cases: [fn(&mut TokenInfo); 8] = [
            |i| i.symbol = "  ".to_owned(),
            |i| i.name = String::new(),
            |i| i.decimals = 19,
            |i| i.max_supply = 0,
            |i| i.limit = 0,
            |i| i.limit = 21_000_001,
            |i| i.premine = 21_000_001,
            |i| {
                i.decimals = 18;
                i.max_supply = u128::MAX / 10;
            },
        ];
        for (n, mutate) in cases.iter().enumerate() {
            let mut info = info();
            mutate(&mut info);
            assert_eq!(
                validate_token_info(&info),
                Err(SdkError::InvalidTokenMetadata),
                "case {n}"
            );
        }
    }

    #[test]
    fn premine_equal_to_max_is_allowed() {
        let mut info = info();
        info.premine = info.max_supply;
        assert!(validate_token_info(&info).is_ok());
    }
}
