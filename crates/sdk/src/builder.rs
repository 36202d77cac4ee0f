//! Covenant transaction construction and signing collaborator.
//!
//! Script construction and signing are opaque to the orchestration layer.
//! A [`TxBuilder`] turns a plan (inputs plus policy) into signed
//! transactions and reports the outputs it created, so later steps can
//! spend them without waiting for the tracker to index them.

use bitcoin::{Address, Transaction};
use sdk_core::{MinterUtxo, TokenInfo, TokenMetadata, TokenUtxo, Utxo};

use crate::SdkError;

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// Inputs for a token deploy.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    /// Token description, with the minter hash already set.
    pub info: TokenInfo,
    /// Unspent fee outputs available to fund genesis.
    pub fee_utxos: Vec<Utxo>,
    /// Fee rate in sat/vB.
    pub fee_rate: u64,
    /// Deployer address; receives change and, later, the premine.
    pub owner: Address,
}

/// Inputs for a single mint.
#[derive(Debug, Clone)]
pub struct MintPlan {
    pub token: TokenMetadata,
    pub minter: MinterUtxo,
    /// Base units to release.
    pub amount: u128,
    pub fee_utxo: Utxo,
    pub fee_rate: u64,
    /// Receives the minted tokens and fee change.
    pub owner: Address,
}

/// Inputs for a token transfer (also used for merges, with `receiver`
/// set to the owner).
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub token: TokenMetadata,
    /// Token outputs to spend. At most four per transaction.
    pub inputs: Vec<TokenUtxo>,
    pub fee_utxo: Utxo,
    pub fee_rate: u64,
    pub receiver: Address,
    /// Base units sent to `receiver`. The remainder goes back to `owner`.
    pub amount: u128,
    pub owner: Address,
}

// ---------------------------------------------------------------------------
// Built transactions
// ---------------------------------------------------------------------------

/// A signed commit/reveal pair. The reveal spends an output of the commit.
#[derive(Debug, Clone)]
pub struct BuiltPair {
    pub commit: Transaction,
    pub reveal: Transaction,
    /// Token outputs the owner can spend next: change, the minted output,
    /// or the merged output.
    pub token_outputs: Vec<TokenUtxo>,
    /// Fee change outputs created for the owner.
    pub fee_change: Vec<Utxo>,
}

/// A signed genesis/reveal pair establishing a new token.
#[derive(Debug, Clone)]
pub struct BuiltDeploy {
    pub genesis: Transaction,
    pub reveal: Transaction,
    pub token_id: String,
    pub token_address: String,
    pub minter_address: String,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Builds and signs covenant transactions.
///
/// Implementations log the builder's failure detail and return
/// [`SdkError::BuildFailed`] (or [`SdkError::TransportFailed`] when the
/// builder is remote and unreachable).
pub trait TxBuilder: Send + Sync {
    fn build_deploy(
        &self,
        plan: &DeployPlan,
    ) -> impl std::future::Future<Output = Result<BuiltDeploy, SdkError>> + Send;

    fn build_mint(
        &self,
        plan: &MintPlan,
    ) -> impl std::future::Future<Output = Result<BuiltPair, SdkError>> + Send;

    fn build_transfer(
        &self,
        plan: &TransferPlan,
    ) -> impl std::future::Future<Output = Result<BuiltPair, SdkError>> + Send;
}
