//! Faucet configuration

use crate::error::{FaucetError, FaucetResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Length of a valid bech32 account address accepted on the captcha route
pub const ADDRESS_LENGTH: usize = 44;

const DEFAULT_CLI_TIMEOUT_SECS: u64 = 30;

/// One chain the faucet dispenses on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain id passed as `--chain-id`
    pub chain_id: String,

    /// Node endpoint passed as `--node`
    pub node: String,

    /// Fees passed as `--fees`
    pub fees: String,

    /// Amount sent per claim, including denomination (e.g. `10000000stake`)
    pub amount: String,
}

/// Faucet service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetConfig {
    /// Server bind address
    pub server_addr: String,

    /// Chains to dispense on, in order (one or two)
    pub chains: Vec<ChainConfig>,

    /// Keyring name of the faucet account
    pub key: String,

    /// Chain CLI program
    pub cli_name: String,

    /// Addresses holding this much or more are refused
    pub max_balance: f64,

    /// reCAPTCHA secret
    pub captcha_secret: String,

    /// Deadline for a single CLI invocation
    pub cli_timeout_secs: u64,

    /// Enable CORS
    pub cors_enabled: bool,
}

impl FaucetConfig {
    /// Load from environment variables. Missing or malformed required values are an error.
    pub fn from_env() -> FaucetResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> FaucetResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> FaucetResult<String> {
            lookup(key).ok_or_else(|| {
                FaucetError::Config(format!("missing environment variable: {}", key))
            })
        };

        let amount = required("FAUCET_AMOUNT_FAUCET")?;

        let mut chains = vec![ChainConfig {
            chain_id: required("FAUCET_CHAIN")?,
            node: required("FAUCET_NODE")?,
            fees: required("FEES_1")?,
            amount: amount.clone(),
        }];

        // An empty second node disables the second chain
        if let Some(node) = lookup("FAUCET_NODE_2").filter(|n| !n.trim().is_empty()) {
            chains.push(ChainConfig {
                chain_id: required("FAUCET_CHAIN_2")?,
                node,
                fees: required("FEES_2")?,
                amount: lookup("FAUCET_AMOUNT_FAUCET_2")
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or(amount),
            });
        }

        let max_balance = required("MAX_TOKENS_ALLOWED")?
            .trim()
            .parse::<f64>()
            .map_err(|_| FaucetError::Config("MAX_TOKENS_ALLOWED value is invalid".to_string()))?;

        let cli_timeout_secs = match lookup("FAUCET_CLI_TIMEOUT_SECS") {
            Some(value) => value.trim().parse().map_err(|_| {
                FaucetError::Config("FAUCET_CLI_TIMEOUT_SECS value is invalid".to_string())
            })?,
            None => DEFAULT_CLI_TIMEOUT_SECS,
        };

        let cors_enabled = lookup("FAUCET_CORS_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let config = Self {
            server_addr: required("FAUCET_PUBLIC_URL")?,
            chains,
            key: required("FAUCET_KEY")?,
            cli_name: required("CLI_NAME")?,
            max_balance,
            captcha_secret: required("FAUCET_RECAPTCHA_SECRET_KEY")?,
            cli_timeout_secs,
            cors_enabled,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that the environment alone cannot guarantee
    pub fn validate(&self) -> FaucetResult<()> {
        if self.chains.is_empty() || self.chains.len() > 2 {
            return Err(FaucetError::Config(format!(
                "expected one or two chains, got {}",
                self.chains.len()
            )));
        }

        for chain in &self.chains {
            if chain.chain_id.is_empty() || chain.node.is_empty() {
                return Err(FaucetError::Config(
                    "chain id and node must not be empty".to_string(),
                ));
            }
        }

        if self.cli_name.trim().is_empty() {
            return Err(FaucetError::Config("CLI_NAME must not be empty".to_string()));
        }

        if !self.max_balance.is_finite() {
            return Err(FaucetError::Config("MAX_TOKENS_ALLOWED value is invalid".to_string()));
        }

        if self.cli_timeout_secs == 0 {
            return Err(FaucetError::Config(
                "FAUCET_CLI_TIMEOUT_SECS must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Get CLI invocation deadline
    pub fn cli_timeout(&self) -> Duration {
        Duration::from_secs(self.cli_timeout_secs)
    }
}
