//! Spendable outputs: plain fee-paying UTXOs and token-bearing UTXOs.

use bitcoin::{Amount, OutPoint, ScriptBuf, Transaction};

/// A spendable unit on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// Transaction id and output index.
    pub outpoint: OutPoint,

    /// Locking script of the output.
    pub script_pubkey: ScriptBuf,

    /// Output value.
    pub value: Amount,
}

impl Utxo {
    /// Build a [`Utxo`] from output `vout` of `tx`.
    ///
    /// Returns `None` if the transaction has no such output.
    pub fn from_tx_output(tx: &Transaction, vout: u32) -> Option<Self> {
        let out = tx.output.get(vout as usize)?;
        Some(Self {
            outpoint: OutPoint::new(tx.compute_txid(), vout),
            script_pubkey: out.script_pubkey.clone(),
            value: out.value,
        })
    }
}

/// A UTXO carrying fungible-token ownership state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUtxo {
    /// The underlying ledger output.
    pub utxo: Utxo,

    /// Token identifier (`<genesis txid>_<vout>`).
    pub token_id: String,

    /// Owner address (as reported by the tracker).
    pub owner: String,

    /// Amount in base units.
    pub amount: u128,
}

impl TokenUtxo {
    /// The outpoint of the token output.
    pub fn outpoint(&self) -> OutPoint {
        self.utxo.outpoint
    }
}

/// Total base-unit amount held by `outputs`, or `None` on overflow.
pub fn total_amount<'a>(outputs: impl IntoIterator<Item = &'a TokenUtxo>) -> Option<u128> {
    outputs
        .into_iter()
        .try_fold(0u128, |acc, o| acc.checked_add(o.amount))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
