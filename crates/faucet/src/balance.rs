//! Recipient balance check
//!
//! Refuses addresses that already hold at least the configured maximum. The
//! check fails open: if the CLI cannot be run or exits non-zero, or the
//! amount is not numeric, the claim is allowed. Output that the CLI reports
//! as successful but that is not a balance payload is an error.
//!
//! Only the first listed denomination is compared against the threshold.

use crate::cli::ChainCli;
use crate::config::ChainConfig;
use crate::error::{FaucetError, FaucetResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// `query bank balances -o json` payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceQueryResponse {
    #[serde(default)]
    pub balances: Vec<Coin>,
    #[serde(default)]
    pub pagination: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

/// Decide from a parsed balance list whether the address may receive funds
pub fn evaluate(balances: &[Coin], max_balance: f64) -> FaucetResult<()> {
    let Some(first) = balances.first() else {
        return Ok(());
    };

    let amount = match first.amount.trim().parse::<f64>() {
        Ok(amount) => amount,
        Err(_) => {
            warn!("Unparseable balance amount {:?}, allowing claim", first.amount);
            return Ok(());
        }
    };

    if amount < max_balance {
        Ok(())
    } else {
        debug!("Balance {}{} at or above limit {}", amount, first.denom, max_balance);
        Err(FaucetError::AlreadyFunded)
    }
}

pub struct BalanceChecker {
    cli: ChainCli,
    max_balance: f64,
}

impl BalanceChecker {
    pub fn new(cli: ChainCli, max_balance: f64) -> Self {
        Self { cli, max_balance }
    }

    pub async fn check_balance(&self, address: &str, chain: &ChainConfig) -> FaucetResult<()> {
        let output = match self.cli.query_balances(address, chain).await {
            Ok(output) if output.success => output,
            Ok(output) => {
                warn!(
                    "Balance query on {} exited non-zero ({}), allowing claim",
                    chain.chain_id,
                    output.stderr_lossy()
                );
                return Ok(());
            }
            Err(e) => {
                warn!("Balance query on {} failed ({}), allowing claim", chain.chain_id, e);
                return Ok(());
            }
        };

        let response: BalanceQueryResponse = serde_json::from_slice(&output.stdout).map_err(|e| {
            warn!("Error unmarshalling command line output: {}", e);
            FaucetError::BalanceQuery(e.to_string())
        })?;

        evaluate(&response.balances, self.max_balance)
    }
}
