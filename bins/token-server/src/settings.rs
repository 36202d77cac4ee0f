//! Environment configuration.
//!
//! | Variable | Default | |
//! |----------|---------|---|
//! | `CAT_NETWORK` | `testnet` | `mainnet`, `testnet`, or `regtest` |
//! | `CAT_WALLET_ADDRESS` | required | Taproot address that pays fees and holds tokens |
//! | `CAT_BUILDER_URL` | required | Builder/signing sidecar base URL |
//! | `CAT_TRACKER_URL` | network default | |
//! | `CAT_MEMPOOL_URL` | network default | |
//! | `CAT_DATA_DIR` | `./data` | LMDB directory for the token registry |
//! | `CAT_PORT` | `3000` | |

use std::fmt;
use std::path::PathBuf;

use bitcoin::Address;
use config::NetworkConfig;
use config::constants::DEFAULT_HTTP_PORT;
use sdk_core::parse_receiver;

#[derive(Debug)]
pub enum SettingsError {
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "{key} is not set"),
            Self::Invalid { key, reason } => write!(f, "{key} is invalid: {reason}"),
        }
    }
}

impl std::error::Error for SettingsError {}

/// Resolved server settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub network: NetworkConfig,
    pub wallet: Address,
    pub builder_url: String,
    pub tracker_url: String,
    pub mempool_url: String,
    pub data_dir: PathBuf,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let network = match get("CAT_NETWORK") {
            None => NetworkConfig::TESTNET,
            Some(name) => NetworkConfig::from_name(name.trim()).ok_or_else(|| {
                SettingsError::Invalid {
                    key: "CAT_NETWORK",
                    reason: format!("unknown network '{name}'"),
                }
            })?,
        };

        let wallet = get("CAT_WALLET_ADDRESS").ok_or(SettingsError::Missing("CAT_WALLET_ADDRESS"))?;
        let wallet = parse_receiver(&wallet, network.network).map_err(|e| SettingsError::Invalid {
            key: "CAT_WALLET_ADDRESS",
            reason: e.to_string(),
        })?;

        let builder_url = get("CAT_BUILDER_URL").ok_or(SettingsError::Missing("CAT_BUILDER_URL"))?;

        let port = match get("CAT_PORT") {
            None => DEFAULT_HTTP_PORT,
            Some(port) => port.trim().parse().map_err(|_| SettingsError::Invalid {
                key: "CAT_PORT",
                reason: format!("'{port}' is not a port number"),
            })?,
        };

        Ok(Self {
            network,
            wallet,
            builder_url,
            tracker_url: get("CAT_TRACKER_URL").unwrap_or_else(|| network.tracker_url.to_owned()),
            mempool_url: get("CAT_MEMPOOL_URL").unwrap_or_else(|| network.mempool_url.to_owned()),
            data_dir: get("CAT_DATA_DIR").map_or_else(|| PathBuf::from("./data"), PathBuf::from),
            port,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const MAINNET_TAPROOT: &str = "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0";

    fn resolve(vars: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_fill_optional_values() {
        let settings = resolve(&[
            ("CAT_NETWORK", "mainnet"),
            ("CAT_WALLET_ADDRESS", MAINNET_TAPROOT),
            ("CAT_BUILDER_URL", "http://127.0.0.1:3100"),
        ])
        .unwrap();
        assert_eq!(settings.network, NetworkConfig::MAINNET);
        assert_eq!(settings.tracker_url, NetworkConfig::MAINNET.tracker_url);
        assert_eq!(settings.port, DEFAULT_HTTP_PORT);
        assert_eq!(settings.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn overrides_apply() {
        let settings = resolve(&[
            ("CAT_NETWORK", "MAINNET"),
            ("CAT_WALLET_ADDRESS", MAINNET_TAPROOT),
            ("CAT_BUILDER_URL", "http://builder"),
            ("CAT_TRACKER_URL", "http://tracker"),
            ("CAT_PORT", "8080"),
            ("CAT_DATA_DIR", "/var/lib/cat"),
        ])
        .unwrap();
        assert_eq!(settings.tracker_url, "http://tracker");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.data_dir, PathBuf::from("/var/lib/cat"));
    }

    #[test]
    fn required_and_invalid_values_fail() {
        assert!(matches!(
            resolve(&[("CAT_NETWORK", "mainnet"), ("CAT_BUILDER_URL", "http://b")]),
            Err(SettingsError::Missing("CAT_WALLET_ADDRESS"))
        ));
        // A mainnet address is rejected on the default testnet.
        assert!(matches!(
            resolve(&[("CAT_WALLET_ADDRESS", MAINNET_TAPROOT), ("CAT_BUILDER_URL", "http://b")]),
            Err(SettingsError::Invalid { key: "CAT_WALLET_ADDRESS", .. })
        ));
        assert!(matches!(
            resolve(&[
                ("CAT_NETWORK", "signet-ish"),
                ("CAT_WALLET_ADDRESS", MAINNET_TAPROOT),
                ("CAT_BUILDER_URL", "http://b"),
            ]),
            Err(SettingsError::Invalid { key: "CAT_NETWORK", .. })
        ));
        assert!(matches!(
            resolve(&[
                ("CAT_NETWORK", "mainnet"),
                ("CAT_WALLET_ADDRESS", MAINNET_TAPROOT),
                ("CAT_BUILDER_URL", "http://b"),
                ("CAT_PORT", "http"),
            ]),
            Err(SettingsError::Invalid { key: "CAT_PORT", .. })
        ));
    }
}
