//! Faucet service core logic

use crate::balance::BalanceChecker;
use crate::cli::{ChainCli, CommandRunner};
use crate::config::FaucetConfig;
use crate::metrics::FaucetMetrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// What happened on one chain during a claim
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainOutcome {
    pub chain_id: String,
    /// `None` when tokens were sent, otherwise the refusal reason
    pub error: Option<String>,
}

/// Aggregated result of a claim across all configured chains
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disbursement {
    pub address: String,
    /// Per-chain outcome text joined with `", "`
    pub message: String,
    pub outcomes: Vec<ChainOutcome>,
}

impl Disbursement {
    /// True when any chain refused the claim
    pub fn is_error(&self) -> bool {
        self.outcomes.iter().any(|o| o.error.is_some())
    }

    /// The latest chain failure, if any
    pub fn last_error(&self) -> Option<&str> {
        self.outcomes.iter().rev().find_map(|o| o.error.as_deref())
    }
}

/// Faucet service
pub struct FaucetService {
    config: Arc<FaucetConfig>,
    cli: ChainCli,
    checker: BalanceChecker,
    metrics: Arc<FaucetMetrics>,
}

impl FaucetService {
    /// Create new faucet service
    pub fn new(
        config: Arc<FaucetConfig>,
        runner: Arc<dyn CommandRunner>,
        metrics: Arc<FaucetMetrics>,
    ) -> Self {
        let cli = ChainCli::new(config.cli_name.clone(), config.key.clone(), runner);
        let checker = BalanceChecker::new(cli.clone(), config.max_balance);

        Self {
            config,
            cli,
            checker,
            metrics,
        }
    }

    pub fn config(&self) -> &FaucetConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<FaucetMetrics> {
        &self.metrics
    }

    /// Check and fund `address` on every configured chain, in order
    pub async fn disburse(&self, address: &str) -> Disbursement {
        let mut segments = Vec::with_capacity(self.config.chains.len());
        let mut outcomes = Vec::with_capacity(self.config.chains.len());

        for chain in &self.config.chains {
            match self.checker.check_balance(address, chain).await {
                Err(e) => {
                    info!("{}: refusing {}: {}", chain.chain_id, address, e);
                    segments.push(format!("{}: {}", chain.chain_id, e));
                    outcomes.push(ChainOutcome {
                        chain_id: chain.chain_id.clone(),
                        error: Some(e.to_string()),
                    });
                }
                Ok(()) => {
                    // Submission is not confirmed on chain; a failed send is only logged
                    let submitted = match self.cli.send(address, chain).await {
                        Ok(output) if output.success => {
                            info!("{}: sent {} to {}", chain.chain_id, chain.amount, address);
                            true
                        }
                        Ok(output) => {
                            warn!(
                                "{}: send to {} exited non-zero: {}",
                                chain.chain_id,
                                address,
                                output.stderr_lossy()
                            );
                            false
                        }
                        Err(e) => {
                            warn!("{}: send to {} failed: {}", chain.chain_id, address, e);
                            false
                        }
                    };
                    self.metrics.record_transfer(&chain.chain_id, submitted);

                    segments.push(format!(
                        "{}: Successfully sent tokens to {}",
                        chain.chain_id, address
                    ));
                    outcomes.push(ChainOutcome {
                        chain_id: chain.chain_id.clone(),
                        error: None,
                    });
                }
            }
        }

        let disbursement = Disbursement {
            address: address.to_string(),
            message: segments.join(", "),
            outcomes,
        };

        self.metrics
            .record_claim(if disbursement.is_error() { "failure" } else { "success" });
        disbursement
    }
}
