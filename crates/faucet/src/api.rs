//! HTTP API for faucet service

use crate::captcha::CaptchaVerifier;
use crate::config::ADDRESS_LENGTH;
use crate::error::{FaucetError, FaucetResult};
use crate::gate::rate_limit;
use crate::registry::VisitorRegistry;
use crate::service::{Disbursement, FaucetService};
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FaucetService>,
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub visitors: Arc<VisitorRegistry>,
}

/// `POST /claim` form
#[derive(Debug, Default, Deserialize)]
pub struct ClaimForm {
    #[serde(default)]
    pub address: String,
    /// Captcha response token
    #[serde(default)]
    pub response: String,
}

/// Success envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(message: Option<String>, data: T) -> Self {
        Self {
            status: true,
            message,
            data,
        }
    }
}

/// Failure envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: bool,
    pub message: String,
    pub error: serde_json::Value,
}

impl ErrorResponse {
    pub fn new(message: String, error: serde_json::Value) -> Self {
        Self {
            status: false,
            message,
            error,
        }
    }
}

impl IntoResponse for Disbursement {
    fn into_response(self) -> Response {
        if self.is_error() {
            let error = self
                .last_error()
                .map(|e| serde_json::Value::String(e.to_string()))
                .unwrap_or(serde_json::Value::Null);
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(self.message, error)),
            )
                .into_response()
        } else {
            (
                StatusCode::OK,
                Json(SuccessResponse::new(Some(self.message), self.address)),
            )
                .into_response()
        }
    }
}

/// Reject addresses that are not exactly [`ADDRESS_LENGTH`] bytes long
pub fn validate_address(address: &str) -> FaucetResult<()> {
    let len = address.len();
    if len != ADDRESS_LENGTH {
        return Err(FaucetError::InvalidAddress(format!(
            "expected {} bytes, got {}",
            ADDRESS_LENGTH, len
        )));
    }
    Ok(())
}

/// Client IP as seen through proxies: first `X-Forwarded-For` hop, then `X-Real-Ip`, then the peer
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_default()
}

/// Claim with captcha
pub async fn claim_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Form(form): Form<ClaimForm>,
) -> Response {
    info!("Claim request: address={}", form.address);

    if let Err(e) = validate_address(&form.address) {
        state.service.metrics().record_claim("invalid");
        return e.into_response();
    }

    let ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    match state.captcha.verify(&ip, &form.response).await {
        Ok(true) => {}
        Ok(false) => {
            info!("Captcha rejected for {}", ip);
            state.service.metrics().record_claim("invalid");
            return FaucetError::InvalidCaptcha.into_response();
        }
        Err(e) => {
            error!("Captcha verification failed: {}", e);
            return e.into_response();
        }
    }

    state.service.disburse(&form.address).await.into_response()
}

/// Claim by path, rate limited per IP
pub async fn faucet_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Response {
    info!("Faucet request: address={}", address);
    state.service.disburse(&address).await.into_response()
}

/// Prometheus exposition
pub async fn metrics_handler(State(state): State<AppState>) -> FaucetResult<String> {
    state.service.metrics().render()
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Root handler with info
pub async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let chains: Vec<&str> = state
        .service
        .config()
        .chains
        .iter()
        .map(|c| c.chain_id.as_str())
        .collect();

    Json(serde_json::json!({
        "name": "Cosmos Faucet",
        "version": env!("CARGO_PKG_VERSION"),
        "chains": chains,
        "endpoints": {
            "POST /claim": "Request tokens (form: address, response)",
            "GET /faucet/{address}": "Request tokens, rate limited per IP",
            "GET /health": "Health check",
            "GET /metrics": "Prometheus metrics"
        }
    }))
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors_enabled = state.service.config().cors_enabled;

    let limited = Router::new()
        .route("/faucet/:address", get(faucet_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/claim", post(claim_handler))
        .merge(limited)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        app = app.layer(cors);
    }

    app
}
