//! HTTP transport for the CAT20 SDK.
//!
//! Implements the SDK's collaborator traits over plain HTTP/JSON:
//!
//! | Type | Trait | Backend |
//! |------|-------|---------|
//! | [`chain::HttpChainClient`] | `sdk::chain::ChainClient` | CAT tracker (token outputs, minters) and a mempool-style REST API (fee outputs, broadcast) |
//! | [`builder::HttpTxBuilder`] | `sdk::builder::TxBuilder` | Covenant builder/signing sidecar |
//!
//! Both share one [`http::HttpClient`] (connection-pooled `reqwest::Client`
//! with connect and request timeouts). Failures are logged with their full
//! detail as [`TransportError`] and surface to the SDK as
//! `SdkError::TransportFailed` or `SdkError::BuildFailed`.
//!
//! # Example
//!
//! ```no_run
//! use config::NetworkConfig;
//! use transport::builder::HttpTxBuilder;
//! use transport::chain::HttpChainClient;
//! use transport::http::{HttpClient, HttpConfig};
//!
//! # fn example() -> Result<(), transport::TransportError> {
//! let http = HttpClient::new(&HttpConfig::default())?;
//! let chain = HttpChainClient::new(http.clone(), &NetworkConfig::TESTNET);
//! let builder = HttpTxBuilder::new(http, "http://127.0.0.1:3100");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod chain;
pub mod dto;
pub mod error;
pub mod http;

pub use error::TransportError;
