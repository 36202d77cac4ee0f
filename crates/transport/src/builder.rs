//! [`TxBuilder`] over an HTTP covenant-builder/signing sidecar.
//!
//! The sidecar holds the wallet keys and contract artifacts. It answers
//! `POST /deploy`, `/mint`, and `/transfer` with raw hex transactions plus
//! the indexes of the outputs it created for the owner.

use sdk::SdkError;
use sdk::builder::{BuiltDeploy, BuiltPair, DeployPlan, MintPlan, TransferPlan, TxBuilder};
use tracing::{debug, error};

use crate::TransportError;
use crate::dto::{
    DeployRequestDto, DeployResponseDto, MintRequestDto, PairResponseDto, TransferRequestDto,
};
use crate::http::{HttpClient, join};

/// Builder sidecar client.
#[derive(Debug, Clone)]
pub struct HttpTxBuilder {
    http: HttpClient,
    base_url: String,
}

impl HttpTxBuilder {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn build_error(call: &'static str, e: TransportError) -> SdkError {
    error!(call, error = %e, "builder call failed");
    e.for_builder()
}

impl TxBuilder for HttpTxBuilder {
    async fn build_deploy(&self, plan: &DeployPlan) -> Result<BuiltDeploy, SdkError> {
        let url = join(&self.base_url, "deploy");
        let response: DeployResponseDto = self
            .http
            .post_json(&url, &DeployRequestDto::from(plan))
            .await
            .map_err(|e| build_error("deploy", e))?;
        let built = response.into_built().map_err(|e| build_error("deploy", e))?;
        debug!(token_id = %built.token_id, "deploy built");
        Ok(built)
    }

    async fn build_mint(&self, plan: &MintPlan) -> Result<BuiltPair, SdkError> {
        let url = join(&self.base_url, "mint");
        let response: PairResponseDto = self
            .http
            .post_json(&url, &MintRequestDto::from(plan))
            .await
            .map_err(|e| build_error("mint", e))?;
        response
            .into_built(&plan.token.token_id, &plan.owner.to_string())
            .map_err(|e| build_error("mint", e))
    }

    async fn build_transfer(&self, plan: &TransferPlan) -> Result<BuiltPair, SdkError> {
        let url = join(&self.base_url, "transfer");
        let response: PairResponseDto = self
            .http
            .post_json(&url, &TransferRequestDto::from(plan))
            .await
            .map_err(|e| build_error("transfer", e))?;
        response
            .into_built(&plan.token.token_id, &plan.owner.to_string())
            .map_err(|e| build_error("transfer", e))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bitcoin::{Address, Amount, Network, OutPoint, ScriptBuf, Txid};
    use sdk_core::{MinterState, MinterUtxo, TokenInfo, TokenMetadata, Utxo};

    use super::*;

    fn owner() -> Address {
        Address::from_str("bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0")
            .unwrap()
            .require_network(Network::Bitcoin)
            .unwrap()
    }

    fn info() -> TokenInfo {
        TokenInfo {
            name: "cat".into(),
            symbol: "CAT".into(),
            decimals: 2,
            max_supply: 21_000_000,
            limit: 5,
            premine: 0,
            minter_md5: sdk_core::token::OPEN_MINTER_V2_MD5.into(),
        }
    }

    fn utxo(n: u8) -> Utxo {
        Utxo {
            outpoint: OutPoint::new(
                <Txid as bitcoin::hashes::Hash>::from_byte_array([n; 32]),
                0,
            ),
            script_pubkey: ScriptBuf::new(),
            value: Amount::from_sat(10_000),
        }
    }

    #[test]
    fn mint_request_shape() {
        let plan = MintPlan {
            token: TokenMetadata {
                token_id: "t_0".into(),
                info: info(),
                token_address: "token".into(),
                minter_address: "minter".into(),
                genesis_txid: utxo(1).outpoint.txid,
                reveal_txid: utxo(2).outpoint.txid,
            },
            minter: MinterUtxo {
                utxo: utxo(3),
                state: MinterState {
                    is_premined: true,
                    remaining: 41,
                },
            },
            amount: 500,
            fee_utxo: utxo(4),
            fee_rate: 12,
            owner: owner(),
        };

        let json = serde_json::to_value(MintRequestDto::from(&plan)).unwrap();
        assert_eq!(json["token"]["tokenId"], "t_0");
        assert_eq!(json["token"]["info"]["max"], 21_000_000);
        assert_eq!(json["minter"]["state"]["isPremined"], true);
        assert_eq!(json["minter"]["state"]["remainingSupply"], "41");
        assert_eq!(json["amount"], "500");
        assert_eq!(json["feeUtxo"]["satoshis"], 10_000);
        assert_eq!(json["feeRate"], 12);
        assert_eq!(json["owner"], owner().to_string());
    }

    #[test]
    fn deploy_request_shape() {
        let plan = DeployPlan {
            info: info(),
            fee_utxos: vec![utxo(1), utxo(2)],
            fee_rate: 3,
            owner: owner(),
        };
        let json = serde_json::to_value(DeployRequestDto::from(&plan)).unwrap();
        assert_eq!(json["feeUtxos"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["info"]["minterMd5"], sdk_core::token::OPEN_MINTER_V2_MD5);
    }

    #[test]
    fn unreachable_sidecar_is_transport_failure() {
        let refused = TransportError::Request {
            url: "http://127.0.0.1:3100/deploy".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(build_error("deploy", refused), SdkError::TransportFailed);

        let malformed = TransportError::Decode {
            url: "http://127.0.0.1:3100/deploy".into(),
            reason: "missing field `genesis`".into(),
        };
        assert_eq!(build_error("deploy", malformed), SdkError::BuildFailed);
    }
}
