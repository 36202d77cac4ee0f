//! CAT20 protocol and service constants.
//!
//! These constants define the fragmentation policy, minter sharding, and
//! service-level defaults shared by the SDK and the server.

/// Number of selected token outputs above which holdings are merged before
/// a transfer is built.
pub const MERGE_THRESHOLD: usize = 4;

/// Maximum token inputs a single guard transaction can consume.
///
/// Merge batches are cut to this size.
pub const MAX_TOKEN_INPUTS: usize = 4;

/// Fixed backoff after a failed merge, before the attempt is abandoned.
pub const MERGE_BACKOFF_SECS: u64 = 6;

/// Largest supported number of token decimals.
pub const MAX_DECIMALS: u32 = 18;

/// Output index of the minter in a deploy reveal transaction.
pub const MINTER_OUTPUT_INDEX: u32 = 1;

/// Output index of the premine fee change in a genesis transaction.
pub const PREMINE_FEE_OUTPUT_INDEX: u32 = 2;

/// Genesis output count that signals enough value was left to fund the
/// automatic premine.
pub const GENESIS_OUTPUTS_WITH_PREMINE: usize = 3;

/// Default REST listening port.
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default connection timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Default request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Operations kept by the in-memory operation store before the oldest is
/// evicted.
pub const OPERATION_HISTORY: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_batches_fit_threshold() {
        // A fully merged batch must never re-trigger a merge on its own.
        assert!(MAX_TOKEN_INPUTS <= MERGE_THRESHOLD);
    }

    #[test]
    fn premine_outputs_are_inside_genesis_shape() {
        assert!((PREMINE_FEE_OUTPUT_INDEX as usize) < GENESIS_OUTPUTS_WITH_PREMINE);
    }
}
