//! Fee and token output selection.
//!
//! Both selectors are pure. Outputs already recorded in the session's
//! [`SpendStore`] are removed by [`unspent`] before either selector runs.

use sdk_core::{TokenUtxo, Utxo};

use crate::SdkError;
use crate::spend::SpendStore;

// ---------------------------------------------------------------------------
// Spend filtering
// ---------------------------------------------------------------------------

/// Outputs carrying an [`OutPoint`](bitcoin::OutPoint) that can be filtered
/// against a spend store.
pub trait Spendable {
    fn outpoint(&self) -> bitcoin::OutPoint;
}

impl Spendable for Utxo {
    fn outpoint(&self) -> bitcoin::OutPoint {
        self.outpoint
    }
}

impl Spendable for TokenUtxo {
    fn outpoint(&self) -> bitcoin::OutPoint {
        self.utxo.outpoint
    }
}

/// Drop every output the store has recorded as spent.
pub fn unspent<T: Spendable>(outputs: Vec<T>, spends: &impl SpendStore) -> Vec<T> {
    outputs
        .into_iter()
        .filter(|o| spends.is_unspent(&o.outpoint()))
        .collect()
}

// ---------------------------------------------------------------------------
// Fee output
// ---------------------------------------------------------------------------

/// Pick the fee-paying output with the largest value.
///
/// # Errors
///
/// Returns [`SdkError::InsufficientSatoshiBalance`] if `outputs` is empty.
pub fn select_fee_output(outputs: &[Utxo]) -> Result<&Utxo, SdkError> {
    outputs
        .iter()
        .max_by_key(|u| u.value)
        .ok_or(SdkError::InsufficientSatoshiBalance)
}

// ---------------------------------------------------------------------------
// Token outputs
// ---------------------------------------------------------------------------

/// Order applied to token outputs before the greedy prefix selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Keep the order the tracker returned.
    #[default]
    AsReceived,
    /// Largest amounts first (fewest inputs, least merging).
    LargeFirst,
    /// Smallest amounts first (consolidates dust).
    SmallFirst,
}

impl SelectionStrategy {
    /// Reorder `outputs` in place. Sorting is stable, so equal amounts keep
    /// their received order.
    pub fn apply(&self, outputs: &mut [TokenUtxo]) {
        match self {
            Self::AsReceived => {}
            Self::LargeFirst => outputs.sort_by(|a, b| b.amount.cmp(&a.amount)),
            Self::SmallFirst => outputs.sort_by(|a, b| a.amount.cmp(&b.amount)),
        }
    }
}

/// Accumulate outputs in order until their sum reaches `target`.
///
/// Returns the prefix used, or an empty vector if the whole set is still
/// short of `target`. Any excess above `target` is returned as change by
/// the transaction builder.
pub fn select_token_outputs(outputs: &[TokenUtxo], target: u128) -> Vec<TokenUtxo> {
    let mut total = 0u128;
    for (i, output) in outputs.iter().enumerate() {
        total = total.saturating_add(output.amount);
        if total >= target {
            return outputs[..=i].to_vec();
        }
    }
    Vec::new()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bitcoin::hashes::Hash;
    use bitcoin::{Amount, OutPoint, ScriptBuf, Txid};
    use sdk_core::utxo::total_amount;

    use super::*;
    use crate::spend::InMemorySpendStore;

    fn utxo(n: u8, sats: u64) -> Utxo {
        Utxo {
            outpoint: OutPoint::new(Txid::from_byte_array([n; 32]), 0),
            script_pubkey: ScriptBuf::new(),
            value: Amount::from_sat(sats),
        }
    }

    fn token(n: u8, amount: u128) -> TokenUtxo {
        TokenUtxo {
            utxo: utxo(n, 330),
            token_id: "t_0".to_owned(),
            owner: "owner".to_owned(),
            amount,
        }
    }

    #[test]
    fn fee_picks_largest() {
        let pool = vec![utxo(1, 1_000), utxo(2, 50_000), utxo(3, 20_000)];
        assert_eq!(select_fee_output(&pool).unwrap().value, Amount::from_sat(50_000));
    }

    #[test]
    fn fee_empty_pool_fails() {
        assert_eq!(
            select_fee_output(&[]).unwrap_err(),
            SdkError::InsufficientSatoshiBalance
        );
    }

    #[test]
    fn token_prefix_in_received_order() {
        let outputs = vec![token(1, 10), token(2, 5), token(3, 20)];
        let sel = select_token_outputs(&outputs, 12);
        assert_eq!(sel.len(), 2);
        assert_eq!(total_amount(&sel), Some(15));
    }

    #[test]
    fn token_exact_target_stops() {
        let outputs = vec![token(1, 10), token(2, 5)];
        assert_eq!(select_token_outputs(&outputs, 10).len(), 1);
    }

    #[test]
    fn token_insufficient_returns_empty() {
        let outputs = vec![token(1, 10), token(2, 5)];
        assert!(select_token_outputs(&outputs, 16).is_empty());
        assert!(select_token_outputs(&[], 1).is_empty());
    }

    #[test]
    fn selection_covers_target_or_is_empty() {
        let outputs: Vec<_> = (1..=8).map(|n| token(n, n as u128 * 7)).collect();
        let full = total_amount(&outputs).unwrap();
        for target in 0..=full + 10 {
            let sel = select_token_outputs(&outputs, target);
            if target <= full {
                assert!(total_amount(&sel).unwrap() >= target, "target {target}");
            } else {
                assert!(sel.is_empty(), "target {target}");
            }
        }
    }

    #[test]
    fn strategy_reorders() {
        let mut outputs = vec![token(1, 10), token(2, 5), token(3, 20)];
        SelectionStrategy::LargeFirst.apply(&mut outputs);
        assert_eq!(select_token_outputs(&outputs, 15).len(), 1);

        SelectionStrategy::SmallFirst.apply(&mut outputs);
        assert_eq!(outputs[0].amount, 5);
        assert_eq!(select_token_outputs(&outputs, 15).len(), 2);
    }

    #[test]
    fn spent_outputs_never_selected() {
        let spends = InMemorySpendStore::new();
        spends.mark_spent(utxo(2, 0).outpoint);
        spends.mark_spent(token(5, 0).outpoint());

        let fees = unspent(vec![utxo(1, 1_000), utxo(2, 90_000)], &spends);
        assert_eq!(select_fee_output(&fees).unwrap().outpoint, utxo(1, 0).outpoint);

        let tokens = unspent(vec![token(5, 100), token(6, 40), token(7, 60)], &spends);
        let sel = select_token_outputs(&tokens, 100);
        assert!(sel.iter().all(|t| t.outpoint() != token(5, 0).outpoint()));
        assert_eq!(sel.len(), 2);
    }
}
