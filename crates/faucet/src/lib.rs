//! HTTP faucet for Cosmos-SDK chains
//!
//! Dispenses a fixed amount on one or two chains through the chain's CLI:
//! - Balance check refusing already-funded addresses
//! - Captcha-gated claims and per-IP token-bucket rate limiting
//! - Idle visitor reclamation
//! - Prometheus metrics

pub mod api;
pub mod balance;
pub mod captcha;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod service;

pub use api::{router, AppState};
pub use balance::{BalanceChecker, BalanceQueryResponse, Coin};
pub use captcha::{CaptchaVerifier, RecaptchaVerifier};
pub use cli::{ChainCli, CommandOutput, CommandRunner, ProcessRunner};
pub use config::{ChainConfig, FaucetConfig};
pub use error::{FaucetError, FaucetResult};
pub use metrics::FaucetMetrics;
pub use registry::{run_reclamation, VisitorPolicy, VisitorRegistry};
pub use service::{ChainOutcome, Disbursement, FaucetService};
