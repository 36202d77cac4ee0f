//! REST surface.
//!
//! | Method/Path | Body | Success |
//! |-------------|------|---------|
//! | `GET /v1` | | `"ok"` |
//! | `POST /v1/cat20/deploy` | `{token, feeRate}` | `{genesisTxId, revealTxId, tokenId, tokenAddress, minterAddress, premineTxId?}` |
//! | `POST /v1/cat20/mint` | `{options: {id, amount?, merge, new?}, data: {feeRate}}` | reveal txid |
//! | `POST /v1/cat20/transfer` | `{options: {id}, data: {feeRate, receiver, amount}}` | `{receiver, amount, revealTxId}` |
//! | `GET /v1/operations/partial` | | `[{id, kind, commitTxId?}]` |
//!
//! Every failure answers `500 {message}`, malformed bodies included, and is
//! logged with its operation context.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use sdk::builder::TxBuilder;
use sdk::chain::ChainClient;
use sdk::operations::deploy::{DeployRequest, PremineOutcome};
use sdk::operations::mint::MintRequest;
use sdk::operations::transfer::TransferRequest;
use sdk::registry::TokenRegistry;
use sdk::tracking::{InMemoryOperationStore, OperationError};
use sdk::{Sdk, SdkError, Session};
use sdk_core::TokenInfo;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared handler state: the SDK, the wallet session it operates on, and
/// the operation history the SDK records into.
pub struct AppState<C, B, R> {
    pub sdk: Sdk<C, B, R>,
    pub session: Arc<Session>,
    pub operations: Arc<InMemoryOperationStore>,
}

// Manual Clone: C, B, R need not be Clone.
impl<C, B, R> Clone for AppState<C, B, R> {
    fn clone(&self) -> Self {
        Self {
            sdk: self.sdk.clone(),
            session: Arc::clone(&self.session),
            operations: Arc::clone(&self.operations),
        }
    }
}

pub fn router<C, B, R>(state: AppState<C, B, R>) -> Router
where
    C: ChainClient + 'static,
    B: TxBuilder + 'static,
    R: TokenRegistry + 'static,
{
    Router::new()
        .route("/v1", get(health))
        .route("/v1/cat20/deploy", post(deploy::<C, B, R>))
        .route("/v1/cat20/mint", post(mint::<C, B, R>))
        .route("/v1/cat20/transfer", post(transfer::<C, B, R>))
        .route("/v1/operations/partial", get(partial_operations::<C, B, R>))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// A human amount given as a JSON number or string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HumanAmount {
    Text(String),
    Number(serde_json::Number),
}

impl HumanAmount {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployBody {
    pub token: TokenInfo,
    pub fee_rate: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    pub genesis_tx_id: String,
    pub reveal_tx_id: String,
    pub token_id: String,
    pub token_address: String,
    pub minter_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premine_tx_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MintOptions {
    pub id: String,
    #[serde(default)]
    pub amount: Option<HumanAmount>,
    #[serde(default)]
    pub merge: bool,
    /// Accepted for compatibility; unused.
    #[serde(default, rename = "new")]
    pub _new: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeData {
    pub fee_rate: u64,
}

#[derive(Debug, Deserialize)]
pub struct MintBody {
    pub options: MintOptions,
    pub data: FeeData,
}

#[derive(Debug, Deserialize)]
pub struct TransferOptions {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferData {
    pub fee_rate: u64,
    pub receiver: String,
    pub amount: HumanAmount,
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
    pub options: TransferOptions,
    pub data: TransferData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub receiver: String,
    pub amount: String,
    pub reveal_tx_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialOperation {
    pub id: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_tx_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failed request, answered as `500 {message}`.
pub enum ApiError {
    Operation(OperationError),
    /// The body did not parse; no operation was started.
    Body(JsonRejection),
}

impl From<OperationError> for ApiError {
    fn from(e: OperationError) -> Self {
        Self::Operation(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match self {
            Self::Operation(e) => {
                error!(
                    op_id = %e.operation_id,
                    kind = ?e.error.kind(),
                    step = %e.failed_step,
                    completed = e.completed_steps.len(),
                    error = %e,
                    "request failed"
                );
                e.error.to_string()
            }
            Self::Body(rejection) => {
                error!(
                    status = %rejection.status(),
                    reason = %rejection.body_text(),
                    "request body rejected"
                );
                SdkError::InvalidRequest.to_string()
            }
        };
        let body = serde_json::json!({ "message": message });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> &'static str {
    info!("health check");
    "ok"
}

async fn deploy<C, B, R>(
    State(state): State<AppState<C, B, R>>,
    body: Result<Json<DeployBody>, JsonRejection>,
) -> Result<Json<DeployResponse>, ApiError>
where
    C: ChainClient,
    B: TxBuilder,
    R: TokenRegistry,
{
    let Json(body) = body?;
    info!(symbol = %body.token.symbol, fee_rate = body.fee_rate, "deploy requested");
    let request = DeployRequest {
        info: body.token,
        fee_rate: body.fee_rate,
    };
    let result = state.sdk.deploy(&state.session, request).await?;

    let premine_tx_id = match &result.premine {
        PremineOutcome::Minted(txid) => Some(txid.to_string()),
        _ => None,
    };
    Ok(Json(DeployResponse {
        genesis_tx_id: result.genesis_txid.to_string(),
        reveal_tx_id: result.reveal_txid.to_string(),
        token_id: result.token_id,
        token_address: result.token_address,
        minter_address: result.minter_address,
        premine_tx_id,
    }))
}

async fn mint<C, B, R>(
    State(state): State<AppState<C, B, R>>,
    body: Result<Json<MintBody>, JsonRejection>,
) -> Result<Json<String>, ApiError>
where
    C: ChainClient,
    B: TxBuilder,
    R: TokenRegistry,
{
    let Json(body) = body?;
    info!(token_id = %body.options.id, merge = body.options.merge, "mint requested");
    let request = MintRequest {
        token_id: body.options.id,
        amount: body.options.amount.map(HumanAmount::into_string),
        merge: body.options.merge,
        fee_rate: body.data.fee_rate,
    };
    let result = state.sdk.mint(&state.session, request).await?;
    Ok(Json(result.reveal_txid.to_string()))
}

async fn transfer<C, B, R>(
    State(state): State<AppState<C, B, R>>,
    body: Result<Json<TransferBody>, JsonRejection>,
) -> Result<Json<TransferResponse>, ApiError>
where
    C: ChainClient,
    B: TxBuilder,
    R: TokenRegistry,
{
    let Json(body) = body?;
    info!(token_id = %body.options.id, receiver = %body.data.receiver, "transfer requested");
    let request = TransferRequest {
        token_id: body.options.id,
        receiver: body.data.receiver,
        amount: body.data.amount.into_string(),
        fee_rate: body.data.fee_rate,
    };
    let result = state.sdk.transfer(&state.session, request).await?;
    Ok(Json(TransferResponse {
        receiver: result.receiver,
        amount: result.amount,
        reveal_tx_id: result.reveal_txid.to_string(),
    }))
}

/// Operations whose commit is on-chain but whose reveal never went out.
async fn partial_operations<C, B, R>(
    State(state): State<AppState<C, B, R>>,
) -> Json<Vec<PartialOperation>>
where
    C: ChainClient,
    B: TxBuilder,
    R: TokenRegistry,
{
    let partial: Vec<_> = state
        .operations
        .partially_completed()
        .iter()
        .map(|op| PartialOperation {
            id: op.id.to_string(),
            kind: op.kind.to_string(),
            commit_tx_id: op.stranded_commit().map(|txid| txid.to_string()),
        })
        .collect();
    info!(count = partial.len(), "partial operations listed");
    Json(partial)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use axum::http::Request;
    use bitcoin::hashes::Hash;
    use bitcoin::{Address, Network, Transaction, Txid};
    use config::NetworkConfig;
    use http_body_util::BodyExt;
    use sdk::builder::{BuiltDeploy, BuiltPair, DeployPlan, MintPlan, TransferPlan};
    use sdk::registry::InMemoryTokenRegistry;
    use sdk::SdkConfig;
    use sdk_core::{MinterUtxo, TokenMetadata, TokenUtxo, Utxo};
    use tower::ServiceExt;

    use super::*;

    const WALLET: &str = "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0";

    /// Chain with no funds; counts calls.
    #[derive(Default)]
    struct EmptyChain {
        calls: Arc<AtomicUsize>,
    }

    impl ChainClient for EmptyChain {
        async fn fetch_spendable_outputs(&self, _: &Address) -> Result<Vec<Utxo>, SdkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn fetch_token_outputs(
            &self,
            _: &TokenMetadata,
            _: &Address,
        ) -> Result<Option<Vec<TokenUtxo>>, SdkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn minter_count(&self, _: &TokenMetadata) -> Result<usize, SdkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }

        async fn fetch_minter(
            &self,
            _: &TokenMetadata,
            _: usize,
        ) -> Result<Option<MinterUtxo>, SdkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn broadcast(&self, _: &Transaction) -> Result<Txid, SdkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SdkError::TransportFailed)
        }
    }

    struct NoBuilder;

    impl TxBuilder for NoBuilder {
        async fn build_deploy(&self, _: &DeployPlan) -> Result<BuiltDeploy, SdkError> {
            Err(SdkError::BuildFailed)
        }

        async fn build_mint(&self, _: &MintPlan) -> Result<BuiltPair, SdkError> {
            Err(SdkError::BuildFailed)
        }

        async fn build_transfer(&self, _: &TransferPlan) -> Result<BuiltPair, SdkError> {
            Err(SdkError::BuildFailed)
        }
    }

    fn known_token() -> TokenMetadata {
        TokenMetadata {
            token_id: "t_0".to_owned(),
            info: TokenInfo {
                name: "cat".to_owned(),
                symbol: "CAT".to_owned(),
                decimals: 2,
                max_supply: 21_000_000,
                limit: 5,
                premine: 0,
                minter_md5: sdk_core::token::OPEN_MINTER_V2_MD5.to_owned(),
            },
            token_address: "token".to_owned(),
            minter_address: "minter".to_owned(),
            genesis_txid: Txid::from_byte_array([1; 32]),
            reveal_txid: Txid::from_byte_array([2; 32]),
        }
    }

    fn app() -> (Router, Arc<AtomicUsize>) {
        let chain = EmptyChain::default();
        let calls = Arc::clone(&chain.calls);
        let registry = InMemoryTokenRegistry::new();
        registry.insert(&known_token()).unwrap();
        let sdk = Sdk::new(SdkConfig::new(NetworkConfig::MAINNET), chain, NoBuilder, registry);
        let operations = Arc::new(InMemoryOperationStore::new());
        sdk.set_operation_store(operations.clone());
        let wallet = Address::from_str(WALLET)
            .unwrap()
            .require_network(Network::Bitcoin)
            .unwrap();
        let state = AppState {
            sdk,
            session: Arc::new(Session::new(wallet)),
            operations,
        };
        (router(state), calls)
    }

    async fn post_json(
        app: Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/v1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn invalid_deploy_metadata_is_500_without_network() {
        let (app, calls) = app();
        let body = serde_json::json!({
            "token": { "name": "cat", "symbol": "CAT", "decimals": 2, "max": 0, "limit": 5 },
            "feeRate": 10
        });
        let (status, json) = post_json(app, "/v1/cat20/deploy", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "invalid token metadata");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deploy_without_funds_reports_balance() {
        let (app, _) = app();
        let body = serde_json::json!({
            "token": { "name": "cat", "symbol": "CAT", "decimals": 2, "max": 21000000, "limit": 5 },
            "feeRate": 10
        });
        let (status, json) = post_json(app, "/v1/cat20/deploy", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "insufficient satoshi balance");
    }

    #[tokio::test]
    async fn unknown_token_mint_is_500() {
        let (app, _) = app();
        let body = serde_json::json!({
            "options": { "id": "missing_0", "amount": 5, "merge": false },
            "data": { "feeRate": 10 }
        });
        let (status, json) = post_json(app, "/v1/cat20/mint", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "token not found");
    }

    #[tokio::test]
    async fn transfer_to_segwit_v0_is_rejected() {
        let (app, calls) = app();
        let body = serde_json::json!({
            "options": { "id": "t_0" },
            "data": { "feeRate": 10, "receiver": "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4", "amount": "2.5" }
        });
        let (status, json) = post_json(app, "/v1/cat20/transfer", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "invalid receiver address");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fractional_fee_rate_is_invalid_request() {
        let (app, calls) = app();
        let body = serde_json::json!({
            "options": { "id": "t_0", "amount": 5, "merge": false },
            "data": { "feeRate": 1.5 }
        });
        let (status, json) = post_json(app, "/v1/cat20/mint", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "invalid request");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_token_id_is_invalid_request() {
        let (app, _) = app();
        let body = serde_json::json!({
            "options": {},
            "data": { "feeRate": 10, "receiver": WALLET, "amount": "1" }
        });
        let (status, json) = post_json(app, "/v1/cat20/transfer", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "invalid request");
    }

    #[tokio::test]
    async fn body_without_content_type_is_invalid_request() {
        let (app, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/v1/cat20/deploy")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["message"], "invalid request");
    }

    #[tokio::test]
    async fn failed_operations_are_not_listed_as_partial() {
        let (app, _) = app();
        let body = serde_json::json!({
            "options": { "id": "missing_0", "amount": 5, "merge": false },
            "data": { "feeRate": 10 }
        });
        let (status, _) = post_json(app.clone(), "/v1/cat20/mint", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/operations/partial")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!([]));
    }

    #[test]
    fn amounts_accept_numbers_and_strings() {
        let body: MintBody = serde_json::from_value(serde_json::json!({
            "options": { "id": "t_0", "amount": 2.5, "merge": true, "new": 1 },
            "data": { "feeRate": 3 }
        }))
        .unwrap();
        assert_eq!(body.options.amount.map(HumanAmount::into_string).as_deref(), Some("2.5"));
        assert!(body.options.merge);

        let body: TransferBody = serde_json::from_value(serde_json::json!({
            "options": { "id": "t_0", "amount": 1 },
            "data": { "feeRate": 3, "receiver": WALLET, "amount": "100" }
        }))
        .unwrap();
        assert_eq!(body.data.amount.into_string(), "100");
    }
}
