//! CAT20 token server.
//!
//! Serves deploy, mint, and transfer for a single wallet over REST. Chain
//! data comes from the CAT tracker and a mempool API; covenant transactions
//! are built and signed by the builder sidecar. Deployed token metadata is
//! kept in LMDB under `CAT_DATA_DIR`.
//!
//! See [`settings`] for the environment variables.
//!
//! ```bash
//! export CAT_WALLET_ADDRESS=tb1p...
//! export CAT_BUILDER_URL=http://127.0.0.1:3100
//! RUST_LOG=info cargo run --release -p token-server
//! ```

mod routes;
mod settings;
mod token_registry;

use std::net::{Ipv4Addr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sdk::tracking::InMemoryOperationStore;
use sdk::{Sdk, SdkConfig, Session};
use transport::builder::HttpTxBuilder;
use transport::chain::HttpChainClient;
use transport::http::{HttpClient, HttpConfig};

use crate::routes::AppState;
use crate::settings::Settings;
use crate::token_registry::HeedTokenRegistry;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("token-server starting");

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    // -----------------------------------------------------------------------
    // SDK init
    // -----------------------------------------------------------------------

    let http = match HttpClient::new(&HttpConfig::default()) {
        Ok(http) => http,
        Err(e) => {
            tracing::error!(error = %e, "http client init failed");
            return ExitCode::FAILURE;
        }
    };
    let chain = HttpChainClient::with_urls(
        http.clone(),
        settings.tracker_url.clone(),
        settings.mempool_url.clone(),
    );
    let builder = HttpTxBuilder::new(http, settings.builder_url.clone());

    let registry = match HeedTokenRegistry::open(&settings.data_dir) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(dir = %settings.data_dir.display(), error = %e, "token registry open failed");
            return ExitCode::FAILURE;
        }
    };

    let sdk = Sdk::new(SdkConfig::new(settings.network), chain, builder, registry);
    let operations = Arc::new(InMemoryOperationStore::new());
    sdk.set_operation_store(operations.clone());
    let state = AppState {
        sdk,
        session: Arc::new(Session::new(settings.wallet.clone())),
        operations,
    };

    tracing::info!(
        network = settings.network.name,
        wallet = %settings.wallet,
        tracker = %settings.tracker_url,
        mempool = %settings.mempool_url,
        builder = %settings.builder_url,
        "SDK initialized"
    );

    // -----------------------------------------------------------------------
    // Serve
    // -----------------------------------------------------------------------

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, settings.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "bind failed");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
        }
        signal_cancel.cancel();
    });

    tracing::info!(%addr, "listening");
    let served = axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await;

    match served {
        Ok(()) => {
            tracing::info!("token-server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}
