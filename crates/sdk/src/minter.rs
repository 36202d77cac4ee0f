//! Minter variants, quota enforcement, and shard selection.
//!
//! Each [`MinterVariant`] owns a [`MinterPolicy`] chosen once when the
//! token's metadata is resolved ([`classify_minter`]). The quota engine
//! ([`resolve_mint_amount`]) then drives the per-instance state machine:
//!
//! - `Unprimed` with a premine: the mint must release exactly the premine.
//! - `Premined` (or no premine): the request defaults to `limit`, is capped
//!   by the variant, must not exceed `limit`, and is finalized by the variant.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sdk_core::{MinterState, MinterVariant, ScaledTokenInfo};
use tracing::warn;

use crate::SdkError;

// ---------------------------------------------------------------------------
// MinterPolicy
// ---------------------------------------------------------------------------

/// Per-variant mint rules.
pub trait MinterPolicy: Send + Sync {
    fn variant(&self) -> MinterVariant;

    /// State of the minter a deploy reveal creates.
    fn initial_state(&self, info: &ScaledTokenInfo) -> MinterState;

    /// Supply the instance can still release, in base units.
    fn remaining_supply(&self, state: &MinterState, info: &ScaledTokenInfo) -> u128;

    /// Clamp a post-premine request before the `limit` ceiling is checked.
    fn cap(&self, requested: u128, state: &MinterState, info: &ScaledTokenInfo) -> u128;

    /// Adjust an accepted post-premine amount to what the contract releases.
    fn finalize(&self, amount: u128, info: &ScaledTokenInfo) -> u128;

    /// State after a successful mint of `amount`.
    fn advance(&self, state: &MinterState, amount: u128, info: &ScaledTokenInfo) -> MinterState;
}

/// Decaying supply: each mint draws its amount from a tracked remainder.
pub struct OpenMinterV1;

impl MinterPolicy for OpenMinterV1 {
    fn variant(&self) -> MinterVariant {
        MinterVariant::OpenMinterV1
    }

    fn initial_state(&self, info: &ScaledTokenInfo) -> MinterState {
        MinterState {
            is_premined: false,
            remaining: info.max_supply.saturating_sub(info.premine),
        }
    }

    fn remaining_supply(&self, state: &MinterState, _info: &ScaledTokenInfo) -> u128 {
        state.remaining
    }

    fn cap(&self, requested: u128, state: &MinterState, info: &ScaledTokenInfo) -> u128 {
        let remaining = self.remaining_supply(state, info);
        if remaining < info.limit {
            warn!(remaining, limit = info.limit, "minter supply below limit, minting the remainder");
        }
        requested.min(remaining)
    }

    fn finalize(&self, amount: u128, _info: &ScaledTokenInfo) -> u128 {
        amount
    }

    fn advance(&self, state: &MinterState, amount: u128, _info: &ScaledTokenInfo) -> MinterState {
        if !state.is_premined {
            return MinterState {
                is_premined: true,
                remaining: state.remaining,
            };
        }
        MinterState {
            is_premined: true,
            remaining: state.remaining.saturating_sub(amount),
        }
    }
}

/// Fixed slice: every mint past the premine releases exactly `limit`.
pub struct OpenMinterV2;

impl MinterPolicy for OpenMinterV2 {
    fn variant(&self) -> MinterVariant {
        MinterVariant::OpenMinterV2
    }

    fn initial_state(&self, info: &ScaledTokenInfo) -> MinterState {
        let remaining = match info.limit {
            0 => 0,
            limit => info.max_supply.saturating_sub(info.premine) / limit,
        };
        MinterState {
            is_premined: false,
            remaining,
        }
    }

    fn remaining_supply(&self, state: &MinterState, info: &ScaledTokenInfo) -> u128 {
        state.remaining.saturating_mul(info.limit)
    }

    fn cap(&self, requested: u128, state: &MinterState, _info: &ScaledTokenInfo) -> u128 {
        if state.remaining == 0 { 0 } else { requested }
    }

    fn finalize(&self, amount: u128, info: &ScaledTokenInfo) -> u128 {
        if amount != info.limit {
            warn!(requested = amount, limit = info.limit, "minter releases exactly limit per mint");
        }
        info.limit
    }

    fn advance(&self, state: &MinterState, _amount: u128, _info: &ScaledTokenInfo) -> MinterState {
        if !state.is_premined {
            return MinterState {
                is_premined: true,
                remaining: state.remaining,
            };
        }
        MinterState {
            is_premined: true,
            remaining: state.remaining.saturating_sub(1),
        }
    }
}

/// Dispatch a variant to its policy.
pub fn policy_for(variant: MinterVariant) -> &'static dyn MinterPolicy {
    match variant {
        MinterVariant::OpenMinterV1 => &OpenMinterV1,
        MinterVariant::OpenMinterV2 => &OpenMinterV2,
    }
}

/// Classify a minter by its artifact hash.
///
/// # Errors
///
/// Returns [`SdkError::UnknownMinter`] for unrecognized hashes.
pub fn classify_minter(md5: &str) -> Result<&'static dyn MinterPolicy, SdkError> {
    match MinterVariant::from_md5(md5) {
        Some(variant) => Ok(policy_for(variant)),
        None => {
            warn!(minter_md5 = md5, "unknown minter");
            Err(SdkError::UnknownMinter)
        }
    }
}

// ---------------------------------------------------------------------------
// Quota engine
// ---------------------------------------------------------------------------

/// Outcome of quota resolution for one mint call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintQuota {
    /// Base units the mint will release.
    pub amount: u128,

    /// Whether this mint is the `Unprimed -> Premined` transition.
    pub is_premine: bool,
}

/// Resolve the amount a mint call releases, or reject it.
///
/// `requested` is in base units; `None` selects the default (premine for an
/// unprimed minter, otherwise `limit`).
///
/// # Errors
///
/// Returns [`SdkError::QuotaViolation`] when an unprimed premine mint asks
/// for anything but the premine, when the capped amount exceeds `limit`, or
/// when nothing is left to mint.
pub fn resolve_mint_amount(
    policy: &dyn MinterPolicy,
    info: &ScaledTokenInfo,
    state: &MinterState,
    requested: Option<u128>,
) -> Result<MintQuota, SdkError> {
    if !state.is_premined && info.premine > 0 {
        let amount = requested.unwrap_or(info.premine);
        if amount != info.premine {
            warn!(amount, premine = info.premine, "first mint must equal the premine");
            return Err(SdkError::QuotaViolation);
        }
        return Ok(MintQuota {
            amount,
            is_premine: true,
        });
    }

    let capped = policy.cap(requested.unwrap_or(info.limit), state, info);
    if capped == 0 {
        warn!(variant = %policy.variant(), "nothing left to mint");
        return Err(SdkError::QuotaViolation);
    }
    if capped > info.limit {
        warn!(amount = capped, limit = info.limit, "mint amount exceeds limit");
        return Err(SdkError::QuotaViolation);
    }

    Ok(MintQuota {
        amount: policy.finalize(capped, info),
        is_premine: false,
    })
}

// ---------------------------------------------------------------------------
// Shard selection
// ---------------------------------------------------------------------------

/// Source of minter shard offsets.
pub trait ShardPicker: Send + Sync {
    /// Pick an offset in `0..shard_bound(count)`. `count` is at least 1.
    fn pick(&self, count: usize) -> usize;
}

/// Exclusive upper bound for the offset among `count` instances.
///
/// The last instance is never picked unless it is the only one.
pub fn shard_bound(count: usize) -> usize {
    count.saturating_sub(1).max(1)
}

/// Uniform offsets from the thread-local RNG.
pub struct RandomShardPicker;

impl ShardPicker for RandomShardPicker {
    fn pick(&self, count: usize) -> usize {
        rand::thread_rng().gen_range(0..shard_bound(count))
    }
}

/// Uniform offsets from a seeded RNG, reproducible across runs.
pub struct SeededShardPicker {
    rng: Mutex<StdRng>,
}

impl SeededShardPicker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ShardPicker for SeededShardPicker {
    fn pick(&self, count: usize) -> usize {
        self.rng.lock().unwrap().gen_range(0..shard_bound(count))
    }
}

/// Always the same offset, clamped into range.
pub struct FixedShardPicker(pub usize);

impl ShardPicker for FixedShardPicker {
    fn pick(&self, count: usize) -> usize {
        self.0.min(shard_bound(count) - 1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: u128 = 100_000_000;

    fn info(premine: u128, limit: u128) -> ScaledTokenInfo {
        ScaledTokenInfo {
            decimals: 8,
            max_supply: 21_000_000 * UNIT,
            limit: limit * UNIT,
            premine: premine * UNIT,
        }
    }

    fn primed(remaining: u128) -> MinterState {
        MinterState {
            is_premined: true,
            remaining,
        }
    }

    #[test]
    fn classify_known_and_unknown() {
        assert_eq!(
            classify_minter(MinterVariant::OpenMinterV1.md5()).unwrap().variant(),
            MinterVariant::OpenMinterV1
        );
        assert_eq!(classify_minter("ffff").err(), Some(SdkError::UnknownMinter));
    }

    #[test]
    fn unprimed_requires_exact_premine() {
        let info = info(1000, 500);
        let state = OpenMinterV2.initial_state(&info);

        for requested in [1, 500 * UNIT, 999 * UNIT, 1001 * UNIT] {
            assert_eq!(
                resolve_mint_amount(&OpenMinterV2, &info, &state, Some(requested)),
                Err(SdkError::QuotaViolation)
            );
        }

        let quota = resolve_mint_amount(&OpenMinterV2, &info, &state, Some(1000 * UNIT)).unwrap();
        assert!(quota.is_premine);
        assert_eq!(quota.amount, 1000 * UNIT);
        assert!(OpenMinterV2.advance(&state, quota.amount, &info).is_premined);
    }

    #[test]
    fn unprimed_defaults_to_premine() {
        let info = info(1000, 500);
        let state = OpenMinterV1.initial_state(&info);
        let quota = resolve_mint_amount(&OpenMinterV1, &info, &state, None).unwrap();
        assert_eq!(quota.amount, info.premine);
    }

    #[test]
    fn primed_rejects_above_limit() {
        let info = info(1000, 500);
        assert_eq!(
            resolve_mint_amount(&OpenMinterV2, &info, &primed(10), Some(501 * UNIT)),
            Err(SdkError::QuotaViolation)
        );
        assert_eq!(
            resolve_mint_amount(&OpenMinterV1, &info, &primed(5000 * UNIT), Some(800 * UNIT)),
            Err(SdkError::QuotaViolation)
        );
    }

    #[test]
    fn v1_clamps_to_remaining_supply() {
        let info = info(1000, 500);
        let quota =
            resolve_mint_amount(&OpenMinterV1, &info, &primed(500 * UNIT), Some(800 * UNIT))
                .unwrap();
        assert_eq!(quota.amount, 500 * UNIT);

        let quota =
            resolve_mint_amount(&OpenMinterV1, &info, &primed(120 * UNIT), None).unwrap();
        assert_eq!(quota.amount, 120 * UNIT);
    }

    #[test]
    fn v2_coerces_to_limit() {
        let info = info(0, 500);
        let quota =
            resolve_mint_amount(&OpenMinterV2, &info, &primed(3), Some(100 * UNIT)).unwrap();
        assert_eq!(quota.amount, 500 * UNIT);
        assert!(!quota.is_premine);
    }

    #[test]
    fn exhausted_supply_rejected() {
        let info = info(0, 500);
        assert_eq!(
            resolve_mint_amount(&OpenMinterV1, &info, &primed(0), None),
            Err(SdkError::QuotaViolation)
        );
        assert_eq!(
            resolve_mint_amount(&OpenMinterV2, &info, &primed(0), None),
            Err(SdkError::QuotaViolation)
        );
    }

    #[test]
    fn no_premine_starts_effectively_primed() {
        let info = info(0, 500);
        let state = OpenMinterV1.initial_state(&info);
        assert_eq!(
            resolve_mint_amount(&OpenMinterV1, &info, &state, Some(600 * UNIT)),
            Err(SdkError::QuotaViolation)
        );
        let quota = resolve_mint_amount(&OpenMinterV1, &info, &state, None).unwrap();
        assert_eq!(quota.amount, info.limit);
    }

    #[test]
    fn supply_accounting_per_variant() {
        let info = info(1000, 500);
        let v1 = OpenMinterV1.initial_state(&info);
        assert_eq!(v1.remaining, info.max_supply - info.premine);

        let v2 = OpenMinterV2.initial_state(&info);
        assert_eq!(v2.remaining, (21_000_000 - 1000) / 500);
        assert_eq!(
            OpenMinterV2.remaining_supply(&v2, &info),
            info.max_supply - info.premine
        );

        let after = OpenMinterV1.advance(&primed(600 * UNIT), 500 * UNIT, &info);
        assert_eq!(after.remaining, 100 * UNIT);
        let after = OpenMinterV2.advance(&primed(3), info.limit, &info);
        assert_eq!(after.remaining, 2);
    }

    #[test]
    fn shard_offsets_stay_in_range() {
        assert_eq!(shard_bound(1), 1);
        assert_eq!(shard_bound(2), 1);
        assert_eq!(shard_bound(5), 4);

        let random = RandomShardPicker;
        for count in 1..20 {
            for _ in 0..20 {
                assert!(random.pick(count) < shard_bound(count));
            }
        }
        assert_eq!(FixedShardPicker(9).pick(3), 1);
        assert_eq!(FixedShardPicker(0).pick(1), 0);
    }

    #[test]
    fn seeded_picker_is_reproducible() {
        let a = SeededShardPicker::new(7);
        let b = SeededShardPicker::new(7);
        let xs: Vec<_> = (0..16).map(|_| a.pick(10)).collect();
        let ys: Vec<_> = (0..16).map(|_| b.pick(10)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| *x < 9));
    }
}
