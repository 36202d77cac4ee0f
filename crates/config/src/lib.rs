//! CAT20 network configuration.
//!
//! This crate provides static, per-network configuration for the token
//! service:
//!
//! - [`NetworkConfig`] -- tracker and mempool endpoints for a given network
//! - [`constants`] -- protocol-level parameters (merge threshold, backoff, ports)
//!
//! All data is compile-time constant (`&'static str`). Types are `Copy`.
//!
//! `config` depends only on [`bitcoin::Network`]. It does **not** depend on
//! transport or any runtime crate, so it can be used freely as a leaf
//! dependency.

pub mod constants;

use bitcoin::Network;

// ---------------------------------------------------------------------------
// NetworkConfig
// ---------------------------------------------------------------------------

/// Network-specific endpoints.
///
/// This is `Copy` -- just pointers to static data. Operators needing custom
/// endpoints override the URLs on the transport side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    /// The bitcoin network addresses are validated against.
    pub network: Network,

    /// Human-readable name used in env configuration.
    pub name: &'static str,

    /// CAT tracker base URL (token outputs and minter state).
    pub tracker_url: &'static str,

    /// Mempool-style REST base URL (fee outputs and broadcast).
    pub mempool_url: &'static str,
}

impl NetworkConfig {
    /// Get the configuration for a specific network.
    ///
    /// Networks without a built-in configuration fall back to testnet.
    pub const fn for_network(network: Network) -> Self {
        match network {
            Network::Bitcoin => Self::MAINNET,
            Network::Regtest => Self::REGTEST,
            _ => Self::TESTNET,
        }
    }

    /// Look up a configuration by its env name (`mainnet`, `testnet`, `regtest`).
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::MAINNET, Self::TESTNET, Self::REGTEST]
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    // -----------------------------------------------------------------------
    // Built-in network configurations
    // -----------------------------------------------------------------------

    /// Production mainnet configuration.
    pub const MAINNET: Self = Self {
        network: Network::Bitcoin,
        name: "mainnet",
        tracker_url: "https://tracker.catprotocol.org",
        mempool_url: "https://mempool.space",
    };

    /// Public testnet configuration.
    pub const TESTNET: Self = Self {
        network: Network::Testnet,
        name: "testnet",
        tracker_url: "https://tracker-testnet.catprotocol.org",
        mempool_url: "https://mempool.space/testnet",
    };

    /// Local regtest configuration.
    pub const REGTEST: Self = Self {
        network: Network::Regtest,
        name: "regtest",
        tracker_url: "http://127.0.0.1:3000",
        mempool_url: "http://127.0.0.1:8080",
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_network_maps_bitcoin_to_mainnet() {
        assert_eq!(NetworkConfig::for_network(Network::Bitcoin), NetworkConfig::MAINNET);
        assert_eq!(NetworkConfig::for_network(Network::Regtest), NetworkConfig::REGTEST);
        assert_eq!(NetworkConfig::for_network(Network::Signet), NetworkConfig::TESTNET);
    }

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(NetworkConfig::from_name("MainNet"), Some(NetworkConfig::MAINNET));
        assert_eq!(NetworkConfig::from_name("regtest"), Some(NetworkConfig::REGTEST));
        assert!(NetworkConfig::from_name("fractal").is_none());
    }

    #[test]
    fn public_endpoints_are_https() {
        for config in [NetworkConfig::MAINNET, NetworkConfig::TESTNET] {
            assert!(config.tracker_url.starts_with("https://"), "{}", config.name);
            assert!(config.mempool_url.starts_with("https://"), "{}", config.name);
        }
    }

    #[test]
    fn configs_are_copy() {
        let a = NetworkConfig::MAINNET;
        let b = a;
        assert_eq!(a.tracker_url, b.tracker_url);
    }

    #[test]
    fn const_fn_works_at_compile_time() {
        const CONFIG: NetworkConfig = NetworkConfig::for_network(Network::Testnet);
        assert_eq!(CONFIG.name, "testnet");
    }
}
