//! Receiver address validation.
//!
//! Token outputs can only be locked to single-key-spend (P2TR) owners, so a
//! receiver must decode as a bitcoin address on the configured network and
//! be of the taproot class.

use std::fmt;
use std::str::FromStr;

use bitcoin::{Address, AddressType, Network};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors that can occur when validating a receiver address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    /// The string is not a decodable bitcoin address.
    Malformed,

    /// The address belongs to a different network.
    WrongNetwork,

    /// The address decodes but is not a taproot address.
    NotTaproot(Option<AddressType>),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed address"),
            Self::WrongNetwork => write!(f, "address is for a different network"),
            Self::NotTaproot(Some(ty)) => write!(f, "address type {ty} is not taproot"),
            Self::NotTaproot(None) => write!(f, "non-standard address is not taproot"),
        }
    }
}

impl std::error::Error for AddressError {}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Parse a receiver address and require it to be P2TR on `network`.
pub fn parse_receiver(s: &str, network: Network) -> Result<Address, AddressError> {
    let unchecked = Address::from_str(s.trim()).map_err(|_| AddressError::Malformed)?;
    let address = unchecked
        .require_network(network)
        .map_err(|_| AddressError::WrongNetwork)?;

    match address.address_type() {
        Some(AddressType::P2tr) => Ok(address),
        other => Err(AddressError::NotTaproot(other)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TAPROOT_MAINNET: &str = "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0";
    const SEGWIT_V0_MAINNET: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
    const LEGACY_MAINNET: &str = "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2";

    #[test]
    fn accepts_taproot() {
        let address = parse_receiver(TAPROOT_MAINNET, Network::Bitcoin).unwrap();
        assert_eq!(address.address_type(), Some(AddressType::P2tr));
    }

    #[test]
    fn rejects_segwit_v0() {
        assert_eq!(
            parse_receiver(SEGWIT_V0_MAINNET, Network::Bitcoin),
            Err(AddressError::NotTaproot(Some(AddressType::P2wpkh)))
        );
    }

    #[test]
    fn rejects_legacy() {
        assert_eq!(
            parse_receiver(LEGACY_MAINNET, Network::Bitcoin),
            Err(AddressError::NotTaproot(Some(AddressType::P2pkh)))
        );
    }

    #[test]
    fn rejects_wrong_network() {
        assert_eq!(
            parse_receiver(TAPROOT_MAINNET, Network::Testnet),
            Err(AddressError::WrongNetwork)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_receiver("not-an-address", Network::Bitcoin), Err(AddressError::Malformed));
        assert_eq!(parse_receiver("", Network::Bitcoin), Err(AddressError::Malformed));
    }
}
