//! SDK error types.
//!
//! [`SdkError`] is the unified error type for all SDK operations. Variants
//! are `Copy` discriminants -- no string payloads. Details go to the log at
//! the point of failure.

use std::fmt;

use bitcoin::Txid;

// ---------------------------------------------------------------------------
// SdkError
// ---------------------------------------------------------------------------

/// Errors from SDK operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkError {
    /// No metadata is registered for the requested token id.
    TokenNotFound,

    /// Deploy metadata is malformed (symbol, decimals, limit, premine).
    InvalidTokenMetadata,

    /// The receiver address does not decode or is not taproot.
    InvalidReceiver,

    /// The amount does not parse, is too precise, or overflows.
    InvalidAmount,

    /// No unspent fee-paying outputs are available.
    InsufficientSatoshiBalance,

    /// Token holdings cannot cover the requested amount.
    InsufficientTokenBalance,

    /// The mint amount violates the premine or limit rules.
    QuotaViolation,

    /// The minter contract could not be classified by its artifact hash.
    UnknownMinter,

    /// The tracker reported no minter at the selected offset.
    MinterNotFound,

    /// An intermediate merge step failed. Partial progress stays on-chain.
    MergeFailed,

    /// The transaction builder rejected or failed to build a plan.
    BuildFailed,

    /// A fetch or broadcast call failed at the transport level.
    TransportFailed,

    /// The commit transaction was broadcast but the reveal was not.
    ///
    /// The commit's side effect has already happened.
    RevealBroadcastFailed {
        /// The commit transaction that is already on the network.
        commit_txid: Txid,
    },

    /// A registry or spend store operation failed.
    StoreFailed,

    /// The request parameters are invalid.
    InvalidRequest,
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenNotFound => write!(f, "token not found"),
            Self::InvalidTokenMetadata => write!(f, "invalid token metadata"),
            Self::InvalidReceiver => write!(f, "invalid receiver address"),
            Self::InvalidAmount => write!(f, "invalid amount"),
            Self::InsufficientSatoshiBalance => write!(f, "insufficient satoshi balance"),
            Self::InsufficientTokenBalance => write!(f, "insufficient token balance"),
            Self::QuotaViolation => write!(f, "mint quota violation"),
            Self::UnknownMinter => write!(f, "unknown minter"),
            Self::MinterNotFound => write!(f, "minter not found"),
            Self::MergeFailed => write!(f, "merging token outputs failed"),
            Self::BuildFailed => write!(f, "building transaction failed"),
            Self::TransportFailed => write!(f, "transport call failed"),
            Self::RevealBroadcastFailed { commit_txid } => {
                write!(f, "reveal broadcast failed after commit {commit_txid}")
            }
            Self::StoreFailed => write!(f, "store operation failed"),
            Self::InvalidRequest => write!(f, "invalid request"),
        }
    }
}

impl std::error::Error for SdkError {}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Coarse classification used by callers to decide on retry and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad token metadata, receiver, or amount. Not retried.
    Validation,
    /// Satoshi or token balance too low. Not retried.
    InsufficientBalance,
    /// Quota violation or unknown minter. Fatal for the mint call.
    Quota,
    /// Eligible for a single caller-driven retry after backoff.
    Recoverable,
    /// Fetch or broadcast transport failure. Not retried internally.
    Network,
    /// A commit landed but its reveal did not. Needs operator attention.
    PartialSuccess,
    /// Store or builder failure.
    Internal,
}

impl SdkError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TokenNotFound
            | Self::InvalidTokenMetadata
            | Self::InvalidReceiver
            | Self::InvalidAmount
            | Self::InvalidRequest => ErrorKind::Validation,
            Self::InsufficientSatoshiBalance | Self::InsufficientTokenBalance => {
                ErrorKind::InsufficientBalance
            }
            Self::QuotaViolation | Self::UnknownMinter => ErrorKind::Quota,
            Self::MergeFailed => ErrorKind::Recoverable,
            Self::TransportFailed | Self::MinterNotFound => ErrorKind::Network,
            Self::RevealBroadcastFailed { .. } => ErrorKind::PartialSuccess,
            Self::BuildFailed | Self::StoreFailed => ErrorKind::Internal,
        }
    }

    /// Returns `true` if the caller may retry the whole operation once.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Recoverable
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
