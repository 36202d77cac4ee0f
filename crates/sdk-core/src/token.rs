//! Token description, identity, and minter state.

use std::fmt;

use bitcoin::Txid;
use serde::{Deserialize, Serialize};

use crate::amount::{AmountError, scale_integer};
use crate::utxo::Utxo;

// ---------------------------------------------------------------------------
// TokenInfo
// ---------------------------------------------------------------------------

/// Deploy-time token description in human units.
///
/// This is the JSON shape accepted by the deploy endpoint and persisted with
/// the token metadata. `max`, `limit`, and `premine` are whole human units;
/// [`TokenInfo::scaled`] converts them to base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// Display name.
    pub name: String,

    /// Ticker symbol.
    pub symbol: String,

    /// Number of decimal places.
    pub decimals: u32,

    /// Maximum supply.
    #[serde(rename = "max")]
    pub max_supply: u128,

    /// Per-mint limit.
    pub limit: u128,

    /// Amount minted to the deployer before open minting begins.
    #[serde(default)]
    pub premine: u128,

    /// Artifact hash of the minter contract this token was deployed with.
    #[serde(default)]
    pub minter_md5: String,
}

impl TokenInfo {
    /// Scale `max`, `limit`, and `premine` into base units.
    pub fn scaled(&self) -> Result<ScaledTokenInfo, AmountError> {
        Ok(ScaledTokenInfo {
            decimals: self.decimals,
            max_supply: scale_integer(self.max_supply, self.decimals)?,
            limit: scale_integer(self.limit, self.decimals)?,
            premine: scale_integer(self.premine, self.decimals)?,
        })
    }
}

/// Token quota parameters in base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledTokenInfo {
    pub decimals: u32,
    pub max_supply: u128,
    pub limit: u128,
    pub premine: u128,
}

// ---------------------------------------------------------------------------
// TokenMetadata
// ---------------------------------------------------------------------------

/// A deployed token's identity.
///
/// Created once at deploy time and read (never structurally mutated) by the
/// mint and transfer paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    /// Token identifier (`<genesis txid>_<vout>`).
    pub token_id: String,

    /// Deploy-time description.
    pub info: TokenInfo,

    /// Address of the token guard script.
    pub token_address: String,

    /// Address of the minter script.
    pub minter_address: String,

    /// Genesis (commit) transaction id.
    pub genesis_txid: Txid,

    /// Reveal transaction id (creates the first minter).
    pub reveal_txid: Txid,
}

// ---------------------------------------------------------------------------
// MinterVariant
// ---------------------------------------------------------------------------

/// Artifact hash of the open minter V1 contract.
pub const OPEN_MINTER_V1_MD5: &str = "21cbd2e538f2b6cc40ee180e174f1e25";

/// Artifact hash of the open minter V2 contract.
pub const OPEN_MINTER_V2_MD5: &str = "a6c2e92d74a23c07bb6220b676c6cb9b";

/// Closed set of supported minter contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinterVariant {
    /// Decaying supply: each mint draws down a tracked remaining supply.
    OpenMinterV1,

    /// Fixed slice: each mint past the premine releases exactly `limit`.
    OpenMinterV2,
}

impl MinterVariant {
    /// Classify a minter by its artifact hash.
    ///
    /// Returns `None` for unknown contracts.
    pub fn from_md5(md5: &str) -> Option<Self> {
        match md5 {
            OPEN_MINTER_V1_MD5 => Some(Self::OpenMinterV1),
            OPEN_MINTER_V2_MD5 => Some(Self::OpenMinterV2),
            _ => None,
        }
    }

    /// The artifact hash identifying this variant.
    pub const fn md5(&self) -> &'static str {
        match self {
            Self::OpenMinterV1 => OPEN_MINTER_V1_MD5,
            Self::OpenMinterV2 => OPEN_MINTER_V2_MD5,
        }
    }
}

impl fmt::Display for MinterVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenMinterV1 => write!(f, "open_minter_v1"),
            Self::OpenMinterV2 => write!(f, "open_minter_v2"),
        }
    }
}

// ---------------------------------------------------------------------------
// MinterState / MinterUtxo
// ---------------------------------------------------------------------------

/// On-chain state of a minter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinterState {
    /// Whether the premine has already been minted from this instance.
    pub is_premined: bool,

    /// Supply counter as tracked by the contract.
    ///
    /// The unit depends on the variant: base units for
    /// [`MinterVariant::OpenMinterV1`], whole `limit` slices for
    /// [`MinterVariant::OpenMinterV2`].
    pub remaining: u128,
}

/// A minter contract instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinterUtxo {
    /// The output holding the minter contract.
    pub utxo: Utxo,

    /// Current minter state.
    pub state: MinterState,
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
            decimals: 8,
            max_supply: 21_000_000,
            limit: 500,
            premine: 1000,
            minter_md5: OPEN_MINTER_V2_MD5.to_owned(),
        }
    }

    #[test]
    fn scaled_multiplies_by_decimals() {
        let scaled = info().scaled().unwrap();
        assert_eq!(scaled.limit, 50_000_000_000);
        assert_eq!(scaled.premine, 100_000_000_000);
        assert_eq!(scaled.max_supply, 2_100_000_000_000_000);
    }

    #[test]
    fn scaled_rejects_overflow() {
        let mut info = info();
        info.max_supply = u128::MAX;
        assert_eq!(info.scaled(), Err(AmountError::Overflow));
    }

    #[test]
    fn json_shape_uses_max_and_camel_case() {
        let json = serde_json::to_value(info()).unwrap();
        assert_eq!(json["max"], 21_000_000);
        assert_eq!(json["minterMd5"], OPEN_MINTER_V2_MD5);

        let parsed: TokenInfo = serde_json::from_str(
            r#"{"name":"cat","symbol":"CAT","decimals":2,"max":100,"limit":5}"#,
        )
        .unwrap();
        assert_eq!(parsed.premine, 0);
        assert!(parsed.minter_md5.is_empty());
    }

    #[test]
    fn classifies_known_minters() {
        assert_eq!(
            MinterVariant::from_md5(OPEN_MINTER_V1_MD5),
            Some(MinterVariant::OpenMinterV1)
        );
        assert_eq!(
            MinterVariant::from_md5(MinterVariant::OpenMinterV2.md5()),
            Some(MinterVariant::OpenMinterV2)
        );
        assert_eq!(MinterVariant::from_md5("deadbeef"), None);
    }
}
