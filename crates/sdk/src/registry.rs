//! Token metadata registry.

use std::collections::HashMap;
use std::sync::RwLock;

use sdk_core::TokenMetadata;

use crate::SdkError;

/// Lookup and persistence of deployed token metadata, keyed by token id.
///
/// Metadata is written once at deploy time and never mutated.
pub trait TokenRegistry: Send + Sync {
    /// Returns `None` if `token_id` is unknown.
    fn find(&self, token_id: &str) -> Result<Option<TokenMetadata>, SdkError>;

    /// Store metadata for a newly deployed token.
    fn insert(&self, metadata: &TokenMetadata) -> Result<(), SdkError>;
}

/// In-memory registry backed by `RwLock<HashMap>`.
pub struct InMemoryTokenRegistry {
    tokens: RwLock<HashMap<String, TokenMetadata>>,
}

impl InMemoryTokenRegistry {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryTokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenRegistry for InMemoryTokenRegistry {
    fn find(&self, token_id: &str) -> Result<Option<TokenMetadata>, SdkError> {
        Ok(self.tokens.read().unwrap().get(token_id).cloned())
    }

    fn insert(&self, metadata: &TokenMetadata) -> Result<(), SdkError> {
        self.tokens
            .write()
            .unwrap()
            .insert(metadata.token_id.clone(), metadata.clone());
        Ok(())
    }
}
