//! JSON wire types for the tracker, mempool, and builder APIs.
//!
//! Field names are camelCase on the wire. Token amounts travel as decimal
//! strings (they exceed JSON's safe integer range); plain numbers are
//! accepted on input.

use std::str::FromStr;

use bitcoin::consensus::encode::{deserialize_hex, serialize_hex};
use bitcoin::{Amount, OutPoint, ScriptBuf, Transaction, Txid};
use sdk::builder::{BuiltDeploy, BuiltPair, DeployPlan, MintPlan, TransferPlan};
use sdk_core::{MinterState, MinterUtxo, TokenInfo, TokenMetadata, TokenUtxo, Utxo};
use serde::{Deserialize, Serialize};

use crate::TransportError;

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

/// A token amount: decimal string or JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountDto {
    Text(String),
    Number(u64),
}

impl AmountDto {
    pub fn value(&self) -> Result<u128, TransportError> {
        match self {
            Self::Text(s) => s
                .trim()
                .parse::<u128>()
                .map_err(|_| TransportError::InvalidResponse(format!("bad amount '{s}'"))),
            Self::Number(n) => Ok(u128::from(*n)),
        }
    }
}

impl From<u128> for AmountDto {
    fn from(value: u128) -> Self {
        Self::Text(value.to_string())
    }
}

/// A transaction output as the tracker and builder describe it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDto {
    pub tx_id: String,
    pub output_index: u32,
    /// Hex-encoded locking script.
    pub script: String,
    pub satoshis: u64,
}

impl OutputDto {
    pub fn to_utxo(&self) -> Result<Utxo, TransportError> {
        let txid = parse_txid(&self.tx_id)?;
        let script_pubkey = ScriptBuf::from_hex(&self.script)
            .map_err(|e| TransportError::InvalidResponse(format!("bad script: {e}")))?;
        Ok(Utxo {
            outpoint: OutPoint::new(txid, self.output_index),
            script_pubkey,
            value: Amount::from_sat(self.satoshis),
        })
    }
}

impl From<&Utxo> for OutputDto {
    fn from(utxo: &Utxo) -> Self {
        Self {
            tx_id: utxo.outpoint.txid.to_string(),
            output_index: utxo.outpoint.vout,
            script: utxo.script_pubkey.to_hex_string(),
            satoshis: utxo.value.to_sat(),
        }
    }
}

fn parse_txid(s: &str) -> Result<Txid, TransportError> {
    Txid::from_str(s.trim()).map_err(|_| TransportError::InvalidResponse(format!("bad txid '{s}'")))
}

fn parse_tx(hex: &str) -> Result<Transaction, TransportError> {
    deserialize_hex::<Transaction>(hex.trim())
        .map_err(|e| TransportError::InvalidResponse(format!("bad transaction hex: {e}")))
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Tracker response envelope: `{code, msg, data}`; `code` 0 is success.
#[derive(Debug, Deserialize)]
pub struct TrackerEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> TrackerEnvelope<T> {
    pub fn into_data(self, url: &str) -> Result<Option<T>, TransportError> {
        if self.code != 0 {
            return Err(TransportError::Rejected {
                url: url.to_owned(),
                code: self.code,
                message: self.msg,
            });
        }
        Ok(self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStateDto {
    pub address: String,
    pub amount: AmountDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOutputDto {
    pub utxo: OutputDto,
    pub state: TokenStateDto,
}

impl TokenOutputDto {
    pub fn to_token_utxo(&self, token_id: &str) -> Result<TokenUtxo, TransportError> {
        Ok(TokenUtxo {
            utxo: self.utxo.to_utxo()?,
            token_id: token_id.to_owned(),
            owner: self.state.address.clone(),
            amount: self.state.amount.value()?,
        })
    }
}

impl From<&TokenUtxo> for TokenOutputDto {
    fn from(token: &TokenUtxo) -> Self {
        Self {
            utxo: OutputDto::from(&token.utxo),
            state: TokenStateDto {
                address: token.owner.clone(),
                amount: token.amount.into(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenOutputsData {
    pub utxos: Vec<TokenOutputDto>,
    #[serde(default)]
    pub tracker_block_height: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct MinterCountData {
    pub count: usize,
}

/// Minter state. V1 minters report `remainingSupply` in base units, V2
/// minters report `remainingCount` in slices of `limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinterStateDto {
    pub is_premined: bool,
    #[serde(alias = "remainingCount")]
    pub remaining_supply: AmountDto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinterOutputDto {
    pub utxo: OutputDto,
    pub state: MinterStateDto,
}

impl MinterOutputDto {
    pub fn to_minter(&self) -> Result<MinterUtxo, TransportError> {
        Ok(MinterUtxo {
            utxo: self.utxo.to_utxo()?,
            state: MinterState {
                is_premined: self.state.is_premined,
                remaining: self.state.remaining_supply.value()?,
            },
        })
    }
}

impl From<&MinterUtxo> for MinterOutputDto {
    fn from(minter: &MinterUtxo) -> Self {
        Self {
            utxo: OutputDto::from(&minter.utxo),
            state: MinterStateDto {
                is_premined: minter.state.is_premined,
                remaining_supply: minter.state.remaining.into(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MinterOutputsData {
    pub utxos: Vec<MinterOutputDto>,
}

// ---------------------------------------------------------------------------
// Mempool
// ---------------------------------------------------------------------------

/// An address output as the mempool API lists it. Carries no script; the
/// caller supplies the address's own.
#[derive(Debug, Clone, Deserialize)]
pub struct MempoolUtxoDto {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
}

impl MempoolUtxoDto {
    pub fn to_utxo(&self, script_pubkey: &ScriptBuf) -> Result<Utxo, TransportError> {
        Ok(Utxo {
            outpoint: OutPoint::new(parse_txid(&self.txid)?, self.vout),
            script_pubkey: script_pubkey.clone(),
            value: Amount::from_sat(self.value),
        })
    }
}

// ---------------------------------------------------------------------------
// Builder sidecar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDto {
    pub token_id: String,
    pub info: TokenInfo,
    pub token_address: String,
    pub minter_address: String,
    pub genesis_tx_id: String,
    pub reveal_tx_id: String,
}

impl From<&TokenMetadata> for TokenDto {
    fn from(token: &TokenMetadata) -> Self {
        Self {
            token_id: token.token_id.clone(),
            info: token.info.clone(),
            token_address: token.token_address.clone(),
            minter_address: token.minter_address.clone(),
            genesis_tx_id: token.genesis_txid.to_string(),
            reveal_tx_id: token.reveal_txid.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequestDto {
    pub info: TokenInfo,
    pub fee_utxos: Vec<OutputDto>,
    pub fee_rate: u64,
    pub owner: String,
}

impl From<&DeployPlan> for DeployRequestDto {
    fn from(plan: &DeployPlan) -> Self {
        Self {
            info: plan.info.clone(),
            fee_utxos: plan.fee_utxos.iter().map(OutputDto::from).collect(),
            fee_rate: plan.fee_rate,
            owner: plan.owner.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponseDto {
    /// Raw genesis transaction, hex.
    pub genesis: String,
    /// Raw reveal transaction, hex.
    pub reveal: String,
    pub token_id: String,
    pub token_address: String,
    pub minter_address: String,
}

impl DeployResponseDto {
    pub fn into_built(self) -> Result<BuiltDeploy, TransportError> {
        Ok(BuiltDeploy {
            genesis: parse_tx(&self.genesis)?,
            reveal: parse_tx(&self.reveal)?,
            token_id: self.token_id,
            token_address: self.token_address,
            minter_address: self.minter_address,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequestDto {
    pub token: TokenDto,
    pub minter: MinterOutputDto,
    pub amount: AmountDto,
    pub fee_utxo: OutputDto,
    pub fee_rate: u64,
    pub owner: String,
}

impl From<&MintPlan> for MintRequestDto {
    fn from(plan: &MintPlan) -> Self {
        Self {
            token: TokenDto::from(&plan.token),
            minter: MinterOutputDto::from(&plan.minter),
            amount: plan.amount.into(),
            fee_utxo: OutputDto::from(&plan.fee_utxo),
            fee_rate: plan.fee_rate,
            owner: plan.owner.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequestDto {
    pub token: TokenDto,
    pub inputs: Vec<TokenOutputDto>,
    pub fee_utxo: OutputDto,
    pub fee_rate: u64,
    pub receiver: String,
    pub amount: AmountDto,
    pub owner: String,
}

impl From<&TransferPlan> for TransferRequestDto {
    fn from(plan: &TransferPlan) -> Self {
        Self {
            token: TokenDto::from(&plan.token),
            inputs: plan.inputs.iter().map(TokenOutputDto::from).collect(),
            fee_utxo: OutputDto::from(&plan.fee_utxo),
            fee_rate: plan.fee_rate,
            receiver: plan.receiver.to_string(),
            amount: plan.amount.into(),
            owner: plan.owner.to_string(),
        }
    }
}

/// A token output the builder created for the owner, by reveal output index.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTokenOutputDto {
    pub vout: u32,
    pub amount: AmountDto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairResponseDto {
    /// Raw commit transaction, hex.
    pub commit: String,
    /// Raw reveal transaction, hex.
    pub reveal: String,
    #[serde(default)]
    pub token_outputs: Vec<CreatedTokenOutputDto>,
    /// Commit output indexes holding fee change for the owner.
    #[serde(default)]
    pub fee_change: Vec<u32>,
}

impl PairResponseDto {
    pub fn into_built(self, token_id: &str, owner: &str) -> Result<BuiltPair, TransportError> {
        let commit = parse_tx(&self.commit)?;
        let reveal = parse_tx(&self.reveal)?;

        let token_outputs = self
            .token_outputs
            .iter()
            .map(|out| {
                let utxo = Utxo::from_tx_output(&reveal, out.vout).ok_or_else(|| {
                    TransportError::InvalidResponse(format!("reveal has no output {}", out.vout))
                })?;
                Ok(TokenUtxo {
                    utxo,
                    token_id: token_id.to_owned(),
                    owner: owner.to_owned(),
                    amount: out.amount.value()?,
                })
            })
            .collect::<Result<Vec<_>, TransportError>>()?;

        let fee_change = self
            .fee_change
            .iter()
            .map(|vout| {
                Utxo::from_tx_output(&commit, *vout).ok_or_else(|| {
                    TransportError::InvalidResponse(format!("commit has no output {vout}"))
                })
            })
            .collect::<Result<Vec<_>, TransportError>>()?;

        Ok(BuiltPair {
            commit,
            reveal,
            token_outputs,
            fee_change,
        })
    }
}

/// Hex encoding for broadcast bodies.
pub fn tx_hex(tx: &Transaction) -> String {
    serialize_hex(tx)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bitcoin::absolute::LockTime;
    use bitcoin::transaction::Version;
    use bitcoin::{Sequence, TxIn, TxOut, Witness};

    use super::*;

    const TXID: &str = "45ee725c2c5993b3e4d308842d87e973bf1951f5f7a804b21e4dd964ecd12d6b";

    fn sample_tx(outputs: &[u64]) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::new(Txid::from_str(TXID).unwrap(), 0),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::default(),
            }],
            output: outputs
                .iter()
                .map(|v| TxOut {
                    value: Amount::from_sat(*v),
                    script_pubkey: ScriptBuf::from_hex("5120aa").unwrap(),
                })
                .collect(),
        }
    }

    #[test]
    fn amounts_accept_strings_and_numbers() {
        let text: AmountDto = serde_json::from_str("\"340282366920938463463374607431768211455\"").unwrap();
        assert_eq!(text.value().unwrap(), u128::MAX);
        let number: AmountDto = serde_json::from_str("1500").unwrap();
        assert_eq!(number.value().unwrap(), 1500);
        assert!(AmountDto::Text("1.5".into()).value().is_err());
        assert_eq!(serde_json::to_string(&AmountDto::from(7u128)).unwrap(), "\"7\"");
    }

    #[test]
    fn tracker_token_outputs() {
        let json = format!(
            r#"{{"code":0,"msg":"OK","data":{{"utxos":[{{
                "utxo":{{"txId":"{TXID}","outputIndex":1,"script":"5120aa","satoshis":330}},
                "txoStateHashes":["00"],
                "state":{{"address":"owner","amount":"2500"}}
            }}],"trackerBlockHeight":840000}}}}"#
        );
        let envelope: TrackerEnvelope<TokenOutputsData> = serde_json::from_str(&json).unwrap();
        let data = envelope.into_data("url").unwrap().unwrap();
        assert_eq!(data.tracker_block_height, Some(840000));

        let token = data.utxos[0].to_token_utxo("t_0").unwrap();
        assert_eq!(token.amount, 2500);
        assert_eq!(token.outpoint().vout, 1);
        assert_eq!(token.utxo.value, Amount::from_sat(330));
        assert_eq!(token.owner, "owner");
    }

    #[test]
    fn tracker_envelope_errors_and_nulls() {
        let rejected: TrackerEnvelope<MinterCountData> =
            serde_json::from_str(r#"{"code":100,"msg":"token not found","data":null}"#).unwrap();
        assert!(matches!(
            rejected.into_data("url"),
            Err(TransportError::Rejected { code: 100, .. })
        ));

        let empty: TrackerEnvelope<TokenOutputsData> =
            serde_json::from_str(r#"{"code":0,"msg":"OK","data":null}"#).unwrap();
        assert!(empty.into_data("url").unwrap().is_none());
    }

    #[test]
    fn minter_state_accepts_both_remaining_fields() {
        let v1: MinterStateDto =
            serde_json::from_str(r#"{"isPremined":true,"remainingSupply":"2000000000"}"#).unwrap();
        assert_eq!(v1.remaining_supply.value().unwrap(), 2_000_000_000);

        let v2: MinterStateDto =
            serde_json::from_str(r#"{"isPremined":false,"remainingCount":41}"#).unwrap();
        assert!(!v2.is_premined);
        assert_eq!(v2.remaining_supply.value().unwrap(), 41);
    }

    #[test]
    fn mempool_outputs_take_the_address_script() {
        let dto: MempoolUtxoDto = serde_json::from_str(&format!(
            r#"{{"txid":"{TXID}","vout":3,"value":12000,"status":{{"confirmed":true}}}}"#
        ))
        .unwrap();
        let script = ScriptBuf::from_hex("5120bb").unwrap();
        let utxo = dto.to_utxo(&script).unwrap();
        assert_eq!(utxo.outpoint.vout, 3);
        assert_eq!(utxo.script_pubkey, script);
    }

    #[test]
    fn pair_response_resolves_outputs() {
        let commit = sample_tx(&[1000, 8000]);
        let reveal = sample_tx(&[330, 330, 331]);
        let json = format!(
            r#"{{"commit":"{}","reveal":"{}","tokenOutputs":[{{"vout":1,"amount":"50"}}],"feeChange":[1]}}"#,
            tx_hex(&commit),
            tx_hex(&reveal)
        );
        let dto: PairResponseDto = serde_json::from_str(&json).unwrap();
        let built = dto.into_built("t_0", "owner").unwrap();

        assert_eq!(built.reveal.compute_txid(), reveal.compute_txid());
        assert_eq!(built.token_outputs.len(), 1);
        assert_eq!(built.token_outputs[0].amount, 50);
        assert_eq!(built.token_outputs[0].outpoint(), OutPoint::new(reveal.compute_txid(), 1));
        assert_eq!(built.fee_change[0].value, Amount::from_sat(8000));
    }

    #[test]
    fn pair_response_rejects_missing_output() {
        let tx = sample_tx(&[1000]);
        let dto = PairResponseDto {
            commit: tx_hex(&tx),
            reveal: tx_hex(&tx),
            token_outputs: Vec::new(),
            fee_change: vec![4],
        };
        assert!(matches!(
            dto.into_built("t_0", "owner"),
            Err(TransportError::InvalidResponse(_))
        ));

        let dto = PairResponseDto {
            commit: "zz".into(),
            reveal: tx_hex(&tx),
            token_outputs: Vec::new(),
            fee_change: Vec::new(),
        };
        assert!(dto.into_built("t_0", "owner").is_err());
    }

    #[test]
    fn outputs_round_trip_through_requests() {
        let utxo = sample_tx(&[900]).output[0].clone();
        let utxo = Utxo {
            outpoint: OutPoint::new(Txid::from_str(TXID).unwrap(), 2),
            script_pubkey: utxo.script_pubkey,
            value: utxo.value,
        };
        let dto = OutputDto::from(&utxo);
        assert_eq!(dto.script, "5120aa");
        assert_eq!(dto.to_utxo().unwrap(), utxo);
    }
}
