//! CAT20 SDK: token deploy, mint, and transfer orchestration.
//!
//! The SDK drives the deploy -> mint -> transfer lifecycle of fungible
//! tokens on a UTXO ledger by combining:
//! - **Chain client** (`ChainClient`) for output lookup and broadcast
//! - **Transaction builder** (`TxBuilder`) for covenant construction and signing
//! - **Token registry** (`TokenRegistry`) for deployed token metadata
//! - **Spend store** (`SpendStore`, held by a [`Session`]) for outputs
//!   consumed by transactions that are not yet confirmed
//!
//! # Architecture
//!
//! Every operation is a sequential pipeline. Each commit/reveal pair is
//! broadcast strictly in order and its inputs are recorded in the session's
//! spend store right after each broadcast succeeds, so the next selection
//! never picks them again. Callers must not run two mutating operations on
//! the same session concurrently.
//!
//! # Usage
//!
//! ```ignore
//! use sdk::{Sdk, SdkConfig, Session};
//! use sdk::registry::InMemoryTokenRegistry;
//! use config::NetworkConfig;
//!
//! let sdk = Sdk::new(
//!     SdkConfig::new(NetworkConfig::TESTNET),
//!     chain,
//!     builder,
//!     InMemoryTokenRegistry::new(),
//! );
//! let session = Session::new(wallet_address);
//!
//! let result = sdk.transfer(&session, request).await?;
//! ```

pub mod builder;
pub mod chain;
pub mod error;
pub mod minter;
pub mod operations;
pub mod registry;
pub mod selection;
pub mod spend;

pub use error::{ErrorKind, SdkError};
pub use operations::tracking;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use bitcoin::Address;
use config::NetworkConfig;
use config::constants::{MERGE_BACKOFF_SECS, MERGE_THRESHOLD};

use crate::builder::TxBuilder;
use crate::chain::ChainClient;
use crate::minter::{RandomShardPicker, ShardPicker};
use crate::operations::tracking::{NoopOperationStore, OperationStore, OperationTracker};
use crate::registry::TokenRegistry;
use crate::selection::SelectionStrategy;
use crate::spend::{InMemorySpendStore, SpendStore};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// SDK configuration.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Network endpoints and the bitcoin network receivers must belong to.
    pub network: NetworkConfig,
    /// Pause after a failed merge before the transfer attempt is abandoned.
    pub merge_backoff: Duration,
    /// Token input count above which holdings are merged before a spend.
    pub fragmentation_threshold: usize,
}

impl SdkConfig {
    /// Configuration with the protocol defaults for `network`.
    pub fn new(network: NetworkConfig) -> Self {
        Self {
            network,
            merge_backoff: Duration::from_secs(MERGE_BACKOFF_SECS),
            fragmentation_threshold: MERGE_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A wallet's address together with its spend store.
///
/// Construct one per wallet and pass it to every operation. Nothing about
/// spend tracking is global.
pub struct Session<S = InMemorySpendStore> {
    address: Address,
    spends: S,
}

impl Session {
    /// A session with a fresh in-memory spend store.
    pub fn new(address: Address) -> Self {
        Self::with_store(address, InMemorySpendStore::new())
    }
}

impl<S: SpendStore> Session<S> {
    pub fn with_store(address: Address, spends: S) -> Self {
        Self { address, spends }
    }

    /// The wallet address (sender, fee payer, change receiver).
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn spends(&self) -> &S {
        &self.spends
    }
}

// ---------------------------------------------------------------------------
// Sdk
// ---------------------------------------------------------------------------

/// Shared state across all SDK operations.
pub(crate) struct SdkInner<C, B, R> {
    pub config: SdkConfig,
    pub chain: C,
    pub builder: B,
    pub registry: R,
    pub shard_picker: RwLock<Arc<dyn ShardPicker>>,
    pub selection_strategy: RwLock<SelectionStrategy>,
    pub operation_store: RwLock<Arc<dyn OperationStore>>,
}

/// The CAT20 SDK entry point.
///
/// `Clone`-able (wraps an `Arc<SdkInner>`).
///
/// # Type Parameters
///
/// - `C`: Chain client (fetch outputs, minters, broadcast)
/// - `B`: Transaction builder (construct and sign covenant transactions)
/// - `R`: Token registry (deployed token metadata)
pub struct Sdk<C, B, R> {
    pub(crate) inner: Arc<SdkInner<C, B, R>>,
}

// Manual Clone: C, B, R need not be Clone.
impl<C, B, R> Clone for Sdk<C, B, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, B, R> std::fmt::Debug for Sdk<C, B, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sdk")
            .field("network", &self.inner.config.network.name)
            .finish()
    }
}

impl<C, B, R> Sdk<C, B, R>
where
    C: ChainClient,
    B: TxBuilder,
    R: TokenRegistry,
{
    /// Creates a new SDK instance. No I/O happens during construction.
    pub fn new(config: SdkConfig, chain: C, builder: B, registry: R) -> Self {
        Self {
            inner: Arc::new(SdkInner {
                config,
                chain,
                builder,
                registry,
                shard_picker: RwLock::new(Arc::new(RandomShardPicker)),
                selection_strategy: RwLock::new(SelectionStrategy::default()),
                operation_store: RwLock::new(Arc::new(NoopOperationStore)),
            }),
        }
    }

    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    pub fn chain(&self) -> &C {
        &self.inner.chain
    }

    pub fn registry(&self) -> &R {
        &self.inner.registry
    }

    // -----------------------------------------------------------------------
    // Operation tracking
    // -----------------------------------------------------------------------

    /// Replace the operation store at runtime.
    pub fn set_operation_store(&self, store: Arc<dyn OperationStore>) {
        *self.inner.operation_store.write().unwrap() = store;
    }

    /// Get the current operation store (cheap `Arc` clone).
    pub fn operation_store(&self) -> Arc<dyn OperationStore> {
        self.inner.operation_store.read().unwrap().clone()
    }

    pub(crate) fn tracker(&self, kind: tracking::OperationKind) -> OperationTracker {
        OperationTracker::start(self.operation_store(), kind)
    }

    /// Query a tracked operation by ID.
    ///
    /// Returns `None` with the default [`tracking::NoopOperationStore`].
    pub fn query_operation(&self, id: tracking::OperationId) -> Option<tracking::Operation> {
        self.operation_store().get(id)
    }

    // -----------------------------------------------------------------------
    // Strategies
    // -----------------------------------------------------------------------

    /// Replace the minter shard picker at runtime.
    ///
    /// Use [`minter::SeededShardPicker`] or [`minter::FixedShardPicker`]
    /// for reproducible offsets.
    pub fn set_shard_picker(&self, picker: Arc<dyn ShardPicker>) {
        *self.inner.shard_picker.write().unwrap() = picker;
    }

    pub(crate) fn shard_picker(&self) -> Arc<dyn ShardPicker> {
        self.inner.shard_picker.read().unwrap().clone()
    }

    /// Replace the token output ordering applied before selection.
    pub fn set_selection_strategy(&self, strategy: SelectionStrategy) {
        *self.inner.selection_strategy.write().unwrap() = strategy;
    }

    pub(crate) fn selection_strategy(&self) -> SelectionStrategy {
        *self.inner.selection_strategy.read().unwrap()
    }
}
