//! Chain data and broadcast collaborator.
//!
//! [`ChainClient`] is a trait so the orchestration layer can be driven by an
//! in-process fake in tests. The HTTP implementation lives in the
//! `transport` crate.

use bitcoin::{Address, Transaction, Txid};
use sdk_core::{MinterUtxo, TokenMetadata, TokenUtxo, Utxo};

use crate::SdkError;

/// Read access to the ledger and the token tracker, plus broadcast.
///
/// Implementations log transport details and map failures to
/// [`SdkError::TransportFailed`].
pub trait ChainClient: Send + Sync {
    /// Plain outputs owned by `address`. Empty when the wallet has no funds.
    ///
    /// Returns confirmed and unconfirmed outputs alike; the caller filters
    /// its own unconfirmed spends.
    fn fetch_spendable_outputs(
        &self,
        address: &Address,
    ) -> impl std::future::Future<Output = Result<Vec<Utxo>, SdkError>> + Send;

    /// Token outputs of `token` owned by `address`.
    ///
    /// Returns `None` when the tracker knows of no holdings.
    fn fetch_token_outputs(
        &self,
        token: &TokenMetadata,
        address: &Address,
    ) -> impl std::future::Future<Output = Result<Option<Vec<TokenUtxo>>, SdkError>> + Send;

    /// Number of live minter instances for `token`.
    fn minter_count(
        &self,
        token: &TokenMetadata,
    ) -> impl std::future::Future<Output = Result<usize, SdkError>> + Send;

    /// The minter instance at `offset`, or `None` if the tracker has none there.
    fn fetch_minter(
        &self,
        token: &TokenMetadata,
        offset: usize,
    ) -> impl std::future::Future<Output = Result<Option<MinterUtxo>, SdkError>> + Send;

    /// Broadcast a signed transaction and return its id.
    fn broadcast(
        &self,
        tx: &Transaction,
    ) -> impl std::future::Future<Output = Result<Txid, SdkError>> + Send;
}
