//! LMDB-backed [`TokenRegistry`] implementation using heed.
//!
//! Keys: token id (UTF-8)
//! Values: JSON-serialized [`TokenRecordDto`]

use std::fs;
use std::path::Path;
use std::str::FromStr;

use bitcoin::Txid;
use heed::types::{Bytes as HeedBytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use serde::{Deserialize, Serialize};
use tracing::warn;

use sdk::SdkError;
use sdk::registry::TokenRegistry;
use sdk_core::{TokenInfo, TokenMetadata};

// ---------------------------------------------------------------------------
// Serde mirror type
//
// TokenMetadata in sdk-core carries bitcoin types without serde; the
// on-disk format is owned here.
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenRecordDto {
    token_id: String,
    info: TokenInfo,
    token_address: String,
    minter_address: String,
    genesis_tx_id: String,
    reveal_tx_id: String,
}

impl From<&TokenMetadata> for TokenRecordDto {
    fn from(m: &TokenMetadata) -> Self {
        Self {
            token_id: m.token_id.clone(),
            info: m.info.clone(),
            token_address: m.token_address.clone(),
            minter_address: m.minter_address.clone(),
            genesis_tx_id: m.genesis_txid.to_string(),
            reveal_tx_id: m.reveal_txid.to_string(),
        }
    }
}

impl TokenRecordDto {
    fn into_metadata(self) -> Option<TokenMetadata> {
        Some(TokenMetadata {
            genesis_txid: Txid::from_str(&self.genesis_tx_id).ok()?,
            reveal_txid: Txid::from_str(&self.reveal_tx_id).ok()?,
            token_id: self.token_id,
            info: self.info,
            token_address: self.token_address,
            minter_address: self.minter_address,
        })
    }
}

fn store_failed(what: &'static str, e: impl std::fmt::Display) -> SdkError {
    warn!(what, error = %e, "token registry failure");
    SdkError::StoreFailed
}

// ---------------------------------------------------------------------------
// HeedTokenRegistry
// ---------------------------------------------------------------------------

/// LMDB-backed token registry using heed.
pub struct HeedTokenRegistry {
    env: Env,
    db: Database<Str, HeedBytes>,
}

impl HeedTokenRegistry {
    /// Open or create the LMDB environment at the given directory.
    pub fn open(path: &Path) -> Result<Self, SdkError> {
        fs::create_dir_all(path).map_err(|e| store_failed("create dir", e))?;

        // SAFETY: the environment is opened once per process and the
        // directory is not shared with another writer.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(64 * 1024 * 1024)
                .max_dbs(1)
                .open(path)
                .map_err(|e| store_failed("open env", e))?
        };

        let mut wtxn = env.write_txn().map_err(|e| store_failed("write txn", e))?;
        let db: Database<Str, HeedBytes> = env
            .create_database(&mut wtxn, Some("tokens"))
            .map_err(|e| store_failed("create db", e))?;
        wtxn.commit().map_err(|e| store_failed("commit", e))?;

        Ok(Self { env, db })
    }
}

impl TokenRegistry for HeedTokenRegistry {
    fn find(&self, token_id: &str) -> Result<Option<TokenMetadata>, SdkError> {
        let rtxn = self.env.read_txn().map_err(|e| store_failed("read txn", e))?;
        let Some(bytes) = self
            .db
            .get(&rtxn, token_id)
            .map_err(|e| store_failed("get", e))?
        else {
            return Ok(None);
        };
        let dto: TokenRecordDto =
            serde_json::from_slice(bytes).map_err(|e| store_failed("decode", e))?;
        dto.into_metadata()
            .map(Some)
            .ok_or_else(|| store_failed("decode", "stored txid is malformed"))
    }

    fn insert(&self, metadata: &TokenMetadata) -> Result<(), SdkError> {
        let bytes = serde_json::to_vec(&TokenRecordDto::from(metadata))
            .map_err(|e| store_failed("encode", e))?;
        let mut wtxn = self.env.write_txn().map_err(|e| store_failed("write txn", e))?;
        self.db
            .put(&mut wtxn, &metadata.token_id, &bytes)
            .map_err(|e| store_failed("put", e))?;
        wtxn.commit().map_err(|e| store_failed("commit", e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bitcoin::hashes::Hash;

    use super::*;

    fn metadata(id: &str) -> TokenMetadata {
        TokenMetadata {
            token_id: id.to_owned(),
            info: TokenInfo {
                name: "cat".to_owned(),
                symbol: "CAT".to_owned(),
                decimals: 2,
                max_supply: 21_000_000,
                limit: 5,
                premine: 1_000,
                minter_md5: sdk_core::token::OPEN_MINTER_V2_MD5.to_owned(),
            },
            token_address: "token".to_owned(),
            minter_address: "minter".to_owned(),
            genesis_txid: Txid::from_byte_array([1; 32]),
            reveal_txid: Txid::from_byte_array([2; 32]),
        }
    }

    #[test]
    fn insert_then_find() {
        let dir = tempfile::tempdir().unwrap();
        let registry = HeedTokenRegistry::open(dir.path()).unwrap();

        assert_eq!(registry.find("a_0").unwrap(), None);
        registry.insert(&metadata("a_0")).unwrap();
        assert_eq!(registry.find("a_0").unwrap(), Some(metadata("a_0")));
        assert_eq!(registry.find("b_0").unwrap(), None);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let registry = HeedTokenRegistry::open(dir.path()).unwrap();
            registry.insert(&metadata("a_0")).unwrap();
        }
        let registry = HeedTokenRegistry::open(dir.path()).unwrap();
        let found = registry.find("a_0").unwrap().unwrap();
        assert_eq!(found.info.premine, 1_000);
        assert_eq!(found.genesis_txid, Txid::from_byte_array([1; 32]));
    }
}
