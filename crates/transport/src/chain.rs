//! [`ChainClient`] over the CAT tracker and a mempool-style REST API.
//!
//! | Call | Endpoint |
//! |------|----------|
//! | fee outputs | `GET {mempool}/api/address/{addr}/utxo` |
//! | token outputs | `GET {tracker}/api/tokens/{id}/addresses/{addr}/utxos` |
//! | minter count | `GET {tracker}/api/minters/{id}/utxoCount` |
//! | minter at offset | `GET {tracker}/api/minters/{id}/utxos?offset={n}&limit=1` |
//! | broadcast | `POST {mempool}/api/tx` (raw hex body, txid text answer) |

use std::str::FromStr;

use bitcoin::{Address, Transaction, Txid};
use config::NetworkConfig;
use sdk::SdkError;
use sdk::chain::ChainClient;
use sdk_core::{MinterUtxo, TokenMetadata, TokenUtxo, Utxo};
use tracing::{debug, error, warn};

use crate::TransportError;
use crate::dto::{
    MempoolUtxoDto, MinterCountData, MinterOutputsData, TokenOutputsData, TrackerEnvelope, tx_hex,
};
use crate::http::{HttpClient, join};

/// Tracker + mempool chain client.
#[derive(Debug, Clone)]
pub struct HttpChainClient {
    http: HttpClient,
    tracker_url: String,
    mempool_url: String,
}

impl HttpChainClient {
    /// Client for the built-in endpoints of `network`.
    pub fn new(http: HttpClient, network: &NetworkConfig) -> Self {
        Self::with_urls(http, network.tracker_url, network.mempool_url)
    }

    /// Client for custom endpoints.
    pub fn with_urls(
        http: HttpClient,
        tracker_url: impl Into<String>,
        mempool_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tracker_url: tracker_url.into(),
            mempool_url: mempool_url.into(),
        }
    }

    pub fn tracker_url(&self) -> &str {
        &self.tracker_url
    }

    pub fn mempool_url(&self) -> &str {
        &self.mempool_url
    }

    async fn tracker_get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, TransportError> {
        let url = join(&self.tracker_url, path);
        let envelope: TrackerEnvelope<T> = self.http.get_json(&url).await?;
        envelope.into_data(&url)
    }
}

/// Log a transport failure and map it for the SDK.
fn chain_error(call: &'static str, e: TransportError) -> SdkError {
    warn!(call, error = %e, "chain call failed");
    e.for_chain()
}

impl ChainClient for HttpChainClient {
    async fn fetch_spendable_outputs(&self, address: &Address) -> Result<Vec<Utxo>, SdkError> {
        let url = join(&self.mempool_url, &format!("api/address/{address}/utxo"));
        let listed: Vec<MempoolUtxoDto> = self
            .http
            .get_json(&url)
            .await
            .map_err(|e| chain_error("fetch_spendable_outputs", e))?;

        let script = address.script_pubkey();
        let utxos = listed
            .iter()
            .map(|dto| dto.to_utxo(&script))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| chain_error("fetch_spendable_outputs", e))?;
        debug!(address = %address, count = utxos.len(), "fetched fee outputs");
        Ok(utxos)
    }

    async fn fetch_token_outputs(
        &self,
        token: &TokenMetadata,
        address: &Address,
    ) -> Result<Option<Vec<TokenUtxo>>, SdkError> {
        let path = format!("api/tokens/{}/addresses/{address}/utxos", token.token_id);
        let Some(data) = holdings(self.tracker_get(&path).await)? else {
            debug!(token_id = %token.token_id, address = %address, "tracker reports no holdings");
            return Ok(None);
        };

        let tokens = data
            .utxos
            .iter()
            .map(|dto| dto.to_token_utxo(&token.token_id))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| chain_error("fetch_token_outputs", e))?;
        debug!(
            token_id = %token.token_id,
            count = tokens.len(),
            height = ?data.tracker_block_height,
            "fetched token outputs"
        );
        Ok(Some(tokens))
    }

    async fn minter_count(&self, token: &TokenMetadata) -> Result<usize, SdkError> {
        let path = format!("api/minters/{}/utxoCount", token.token_id);
        let data: Option<MinterCountData> = self
            .tracker_get(&path)
            .await
            .map_err(|e| chain_error("minter_count", e))?;
        Ok(data.map_or(0, |d| d.count))
    }

    async fn fetch_minter(
        &self,
        token: &TokenMetadata,
        offset: usize,
    ) -> Result<Option<MinterUtxo>, SdkError> {
        let path = format!("api/minters/{}/utxos?offset={offset}&limit=1", token.token_id);
        let data: Option<MinterOutputsData> = self
            .tracker_get(&path)
            .await
            .map_err(|e| chain_error("fetch_minter", e))?;

        match data.and_then(|d| d.utxos.into_iter().next()) {
            Some(dto) => dto
                .to_minter()
                .map(Some)
                .map_err(|e| chain_error("fetch_minter", e)),
            None => Ok(None),
        }
    }

    async fn broadcast(&self, tx: &Transaction) -> Result<Txid, SdkError> {
        let url = join(&self.mempool_url, "api/tx");
        let expected = tx.compute_txid();
        let answer = self
            .http
            .post_text(&url, tx_hex(tx))
            .await
            .map_err(|e| {
                error!(txid = %expected, error = %e, "broadcast failed");
                e.for_chain()
            })?;

        broadcast_txid(&answer, expected)
    }
}

/// Tracker holdings; a 404 means the address holds none of the token.
fn holdings(
    fetched: Result<Option<TokenOutputsData>, TransportError>,
) -> Result<Option<TokenOutputsData>, SdkError> {
    match fetched {
        Ok(data) => Ok(data),
        Err(TransportError::Status { status: 404, .. }) => Ok(None),
        Err(e) => Err(chain_error("fetch_token_outputs", e)),
    }
}

/// Txid from the mempool's text answer to a broadcast.
fn broadcast_txid(answer: &str, expected: Txid) -> Result<Txid, SdkError> {
    match Txid::from_str(answer) {
        Ok(txid) => {
            if txid != expected {
                warn!(expected = %expected, answered = %txid, "broadcast answered a different txid");
            }
            Ok(txid)
        }
        Err(_) => {
            error!(txid = %expected, answer, "broadcast answer is not a txid");
            Err(SdkError::TransportFailed)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
