//! SDK operations: deploy, mint, transfer, and merge.
//!
//! All operations follow the pattern:
//!
//! 1. Validate inputs and resolve token metadata
//! 2. Fetch outputs and drop those already spent in this session
//! 3. Select inputs, merging fragmented token holdings when needed
//! 4. Build, then broadcast commit and reveal in order, recording spends
//!    after each broadcast

pub(crate) mod broadcast;
pub mod deploy;
pub(crate) mod helpers;
pub mod merge;
pub mod mint;
pub mod tracking;
pub mod transfer;
