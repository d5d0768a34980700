// HTTP API integration tests: the full router with scripted chain CLI and captcha doubles
// Run: cargo test -p cosmos-faucet --test http_api

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use cosmos_faucet::{
    router, AppState, CaptchaVerifier, ChainConfig, CommandOutput, CommandRunner, FaucetConfig,
    FaucetError, FaucetMetrics, FaucetResult, FaucetService, VisitorPolicy, VisitorRegistry,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const ADDRESS: &str = "cosmos1abcdefghijklmnopqrstuvwxyz0123456789a";

/// Reports a fixed balance on chain 1 and an empty one elsewhere; records every invocation
struct FakeCli {
    chain1_balance: &'static str,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeCli {
    fn new(chain1_balance: &'static str) -> Arc<Self> {
        Arc::new(Self {
            chain1_balance,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn sends(&self) -> usize {
        self.calls.lock().unwrap().iter().filter(|a| a[0] == "tx").count()
    }
}

#[async_trait]
impl CommandRunner for FakeCli {
    async fn run(&self, _program: &str, args: &[String]) -> FaucetResult<CommandOutput> {
        self.calls.lock().unwrap().push(args.to_vec());
        let stdout = if args[0] == "query" && args[5] == "tcp://node-1:26657" {
            format!(r#"{{"balances":[{{"denom":"stake","amount":"{}"}}]}}"#, self.chain1_balance)
        } else {
            r#"{"balances":[]}"#.to_string()
        };
        Ok(CommandOutput {
            success: true,
            stdout: stdout.into_bytes(),
            stderr: Vec::new(),
        })
    }
}

enum CaptchaMode {
    Pass,
    Reject,
    Unreachable,
}

struct FakeCaptcha(CaptchaMode);

#[async_trait]
impl CaptchaVerifier for FakeCaptcha {
    async fn verify(&self, _remote_ip: &str, _response: &str) -> FaucetResult<bool> {
        match self.0 {
            CaptchaMode::Pass => Ok(true),
            CaptchaMode::Reject => Ok(false),
            CaptchaMode::Unreachable => Err(FaucetError::CaptchaProvider("connection refused".into())),
        }
    }
}

fn config(chains: usize) -> Arc<FaucetConfig> {
    Arc::new(FaucetConfig {
        server_addr: "127.0.0.1:0".to_string(),
        chains: (1..=chains)
            .map(|i| ChainConfig {
                chain_id: format!("chain-{}", i),
                node: format!("tcp://node-{}:26657", i),
                fees: "500stake".to_string(),
                amount: "10000000stake".to_string(),
            })
            .collect(),
        key: "faucet".to_string(),
        cli_name: "simd".to_string(),
        max_balance: 1000.0,
        captcha_secret: "secret".to_string(),
        cli_timeout_secs: 5,
        cors_enabled: true,
    })
}

fn app(chains: usize, cli: Arc<FakeCli>, captcha: CaptchaMode) -> Router {
    let metrics = Arc::new(FaucetMetrics::new().unwrap());
    router(AppState {
        service: Arc::new(FaucetService::new(config(chains), cli, metrics)),
        captcha: Arc::new(FakeCaptcha(captcha)),
        visitors: Arc::new(VisitorRegistry::new(VisitorPolicy::default()).unwrap()),
    })
}

fn peer() -> ConnectInfo<SocketAddr> {
    ConnectInfo("192.0.2.10:41000".parse().unwrap())
}

fn get_faucet(address: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/faucet/{}", address))
        .extension(peer())
        .body(Body::empty())
        .unwrap()
}

fn post_claim(address: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/claim")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .extension(peer())
        .body(Body::from(format!("address={}&response=captcha-token", address)))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_get_claim_success_envelope() {
    let cli = FakeCli::new("10");
    let app = app(1, cli.clone(), CaptchaMode::Pass);

    let (status, body) = send(&app, get_faucet(ADDRESS)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["data"], ADDRESS);
    assert_eq!(
        body["message"],
        format!("chain-1: Successfully sent tokens to {}", ADDRESS)
    );
    assert_eq!(cli.sends(), 1);
}

#[tokio::test]
async fn test_get_route_rate_limits_after_burst() {
    let app = app(1, FakeCli::new("10"), CaptchaMode::Pass);

    for _ in 0..20 {
        let (status, _) = send(&app, get_faucet(ADDRESS)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, get_faucet(ADDRESS)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["status"], false);
    assert_eq!(body["error"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_concurrent_requests_admit_exactly_capacity() {
    let app = app(1, FakeCli::new("10"), CaptchaMode::Pass);

    let requests = (0..40).map(|_| send(&app, get_faucet(ADDRESS)));
    let results = futures::future::join_all(requests).await;

    let ok = results.iter().filter(|(s, _)| *s == StatusCode::OK).count();
    let limited = results
        .iter()
        .filter(|(s, _)| *s == StatusCode::TOO_MANY_REQUESTS)
        .count();
    assert_eq!(ok, 20);
    assert_eq!(limited, 20);
}

#[tokio::test]
async fn test_get_without_peer_address_is_server_error() {
    let app = app(1, FakeCli::new("10"), CaptchaMode::Pass);
    let request = Request::builder()
        .uri(format!("/faucet/{}", ADDRESS))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], false);
}

#[tokio::test]
async fn test_funded_address_is_refused_without_transfer() {
    let cli = FakeCli::new("1000");
    let app = app(1, cli.clone(), CaptchaMode::Pass);

    let (status, body) = send(&app, get_faucet(ADDRESS)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], false);
    assert_eq!(body["message"], "chain-1: You have enough tokens in your account");
    assert_eq!(body["error"], "You have enough tokens in your account");
    assert_eq!(cli.sends(), 0);
}

#[tokio::test]
async fn test_dual_chain_partial_failure_reports_both() {
    let cli = FakeCli::new("5000");
    let app = app(2, cli.clone(), CaptchaMode::Pass);

    let (status, body) = send(&app, post_claim(ADDRESS)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("chain-1: You have enough tokens in your account"));
    assert!(message.contains(&format!("chain-2: Successfully sent tokens to {}", ADDRESS)));
    assert_eq!(cli.sends(), 1);
}

#[tokio::test]
async fn test_claim_rejects_wrong_length_address() {
    let cli = FakeCli::new("10");
    let app = app(1, cli.clone(), CaptchaMode::Pass);

    let (status, body) = send(&app, post_claim("cosmos1abc")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_ADDRESS");
    assert!(cli.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_fixture_address_is_accepted_and_one_extra_byte_is_not() {
    assert_eq!(ADDRESS.len(), 44);
    let cli = FakeCli::new("10");
    let app = app(1, cli.clone(), CaptchaMode::Pass);

    let (status, _) = send(&app, post_claim(ADDRESS)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, post_claim(&format!("{}b", ADDRESS))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_ADDRESS");
    assert_eq!(cli.sends(), 1);
}

#[tokio::test]
async fn test_claim_rejected_captcha() {
    let cli = FakeCli::new("10");
    let app = app(1, cli.clone(), CaptchaMode::Reject);

    let (status, body) = send(&app, post_claim(ADDRESS)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid captcha");
    assert_eq!(cli.sends(), 0);
}

#[tokio::test]
async fn test_claim_captcha_provider_failure() {
    let app = app(1, FakeCli::new("10"), CaptchaMode::Unreachable);

    let (status, body) = send(&app, post_claim(ADDRESS)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "CAPTCHA_PROVIDER_ERROR");
}

#[tokio::test]
async fn test_claim_route_is_not_rate_limited() {
    let app = app(1, FakeCli::new("10"), CaptchaMode::Pass);

    for _ in 0..25 {
        let (status, body) = send(&app, post_claim(ADDRESS)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], ADDRESS);
    }
}

#[tokio::test]
async fn test_metrics_and_health() {
    let app = app(1, FakeCli::new("10"), CaptchaMode::Pass);
    send(&app, get_faucet(ADDRESS)).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("faucet_claims_total{outcome=\"success\"} 1"));
    assert!(text.contains("faucet_transfers_total{chain=\"chain-1\",outcome=\"ok\"} 1"));

    let (status, body) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
