//! Core types and utilities for the CAT20 token SDK.
//!
//! This crate provides foundational types used across the token service:
//!
//! - [`Utxo`] / [`TokenUtxo`] -- plain fee-paying outputs and token-bearing outputs
//! - [`TokenInfo`] / [`TokenMetadata`] -- deploy-time token description and identity
//! - [`MinterUtxo`] / [`MinterState`] / [`MinterVariant`] -- minter contract instances
//! - [`scale_by_decimals`] / [`unscale_by_decimals`] -- exact human <-> base unit conversion
//! - [`parse_receiver`] -- taproot-only receiver address validation
//!
//! Nothing here performs I/O.

pub mod address;
pub mod amount;
pub mod token;
pub mod utxo;

pub use address::{AddressError, parse_receiver};
pub use amount::{AmountError, scale_by_decimals, unscale_by_decimals};
pub use token::{
    MinterState, MinterUtxo, MinterVariant, ScaledTokenInfo, TokenInfo, TokenMetadata,
};
pub use utxo::{TokenUtxo, Utxo};
