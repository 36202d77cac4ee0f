//! Shared lookups for token operations.
//!
//! Every helper logs its own failure before returning it, so callers only
//! map the error onto their tracker.

use sdk_core::{TokenMetadata, TokenUtxo, Utxo};
use tracing::{debug, warn};

use crate::builder::TxBuilder;
use crate::chain::ChainClient;
use crate::registry::TokenRegistry;
use crate::selection::unspent;
use crate::spend::SpendStore;
use crate::{Sdk, SdkError, Session};

impl<C, B, R> Sdk<C, B, R>
where
    C: ChainClient,
    B: TxBuilder,
    R: TokenRegistry,
{
    /// Resolve registered metadata for `token_id`.
    pub(crate) fn lookup_token(&self, token_id: &str) -> Result<TokenMetadata, SdkError> {
        match self.inner.registry.find(token_id) {
            Ok(Some(token)) => Ok(token),
            Ok(None) => {
                warn!(token_id, "no token metadata registered");
                Err(SdkError::TokenNotFound)
            }
            Err(e) => {
                warn!(token_id, error = %e, "token registry lookup failed");
                Err(e)
            }
        }
    }

    /// Fee-paying outputs of the session wallet not yet spent locally.
    ///
    /// `fresh` outputs (change a builder just created) are folded in when
    /// the chain does not report them yet.
    ///
    /// # Errors
    ///
    /// [`SdkError::InsufficientSatoshiBalance`] if none remain.
    pub(crate) async fn fee_pool<S: SpendStore>(
        &self,
        session: &Session<S>,
        fresh: Vec<Utxo>,
    ) -> Result<Vec<Utxo>, SdkError> {
        let fetched = self
            .inner
            .chain
            .fetch_spendable_outputs(session.address())
            .await
            .inspect_err(|e| {
                warn!(address = %session.address(), error = %e, "fetching fee outputs failed")
            })?;
        let fetched_count = fetched.len();

        let mut pool = unspent(fetched, session.spends());
        extend_missing(&mut pool, unspent(fresh, session.spends()));
        debug!(fetched = fetched_count, unspent = pool.len(), "fee outputs");
        if pool.is_empty() {
            warn!(address = %session.address(), "insufficient satoshi balance");
            return Err(SdkError::InsufficientSatoshiBalance);
        }
        Ok(pool)
    }

    /// Token outputs of `token` held by the session wallet, not yet spent
    /// locally, in the configured selection order.
    ///
    /// Returns an empty vector when the tracker reports no holdings and
    /// `fresh` is empty.
    pub(crate) async fn token_pool<S: SpendStore>(
        &self,
        session: &Session<S>,
        token: &TokenMetadata,
        fresh: Vec<TokenUtxo>,
    ) -> Result<Vec<TokenUtxo>, SdkError> {
        let fetched = self
            .inner
            .chain
            .fetch_token_outputs(token, session.address())
            .await
            .inspect_err(|e| {
                warn!(token_id = %token.token_id, error = %e, "fetching token outputs failed")
            })?;

        let fetched = fetched.unwrap_or_else(|| {
            debug!(token_id = %token.token_id, "tracker reports no holdings");
            Vec::new()
        });

        let mut pool = unspent(fetched, session.spends());
        extend_missing(&mut pool, unspent(fresh, session.spends()));
        self.selection_strategy().apply(&mut pool);
        Ok(pool)
    }
}

/// Append `extra` outputs whose outpoints are not already in `pool`.
///
/// Used to fold in outputs a builder just created, which the tracker may
/// not have indexed yet.
pub(crate) fn extend_missing<T: crate::selection::Spendable>(pool: &mut Vec<T>, extra: Vec<T>) {
    for item in extra {
        let outpoint = item.outpoint();
        if !pool.iter().any(|p| p.outpoint() == outpoint) {
            pool.push(item);
        }
    }
}
