//! Chain CLI invocation
//!
//! Balance queries and transfers are delegated to the chain's command-line
//! client. Commands are spawned directly with an argument vector (no shell),
//! and each invocation is bounded by a deadline after which the child is
//! killed.

use crate::config::ChainConfig;
use crate::error::{FaucetError, FaucetResult};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status zero
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Runs an external program to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Errors mean the program could not be run to completion (spawn failure, deadline).
    /// A non-zero exit is reported through [`CommandOutput::success`].
    async fn run(&self, program: &str, args: &[String]) -> FaucetResult<CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> FaucetResult<CommandOutput> {
        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FaucetError::Command(format!("failed to spawn {}: {}", program, e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                FaucetError::Command(format!("{} timed out after {:?}", program, self.timeout))
            })?
            .map_err(|e| FaucetError::Command(format!("{} failed: {}", program, e)))?;

        debug!("{} exited with {}", program, output.status);

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Builds and runs the chain CLI's bank commands
#[derive(Clone)]
pub struct ChainCli {
    program: String,
    key: String,
    runner: Arc<dyn CommandRunner>,
}

impl ChainCli {
    pub fn new(program: impl Into<String>, key: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: program.into(),
            key: key.into(),
            runner,
        }
    }

    /// `query bank balances <address> --node <node> --chain-id <id> -o json`
    pub fn balance_args(address: &str, chain: &ChainConfig) -> Vec<String> {
        [
            "query", "bank", "balances", address,
            "--node", chain.node.as_str(),
            "--chain-id", chain.chain_id.as_str(),
            "-o", "json",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// `tx bank send <key> <address> <amount> --from <key> ... --keyring-backend test -y`
    pub fn send_args(key: &str, address: &str, chain: &ChainConfig) -> Vec<String> {
        [
            "tx", "bank", "send", key, address, chain.amount.as_str(),
            "--from", key,
            "--node", chain.node.as_str(),
            "--chain-id", chain.chain_id.as_str(),
            "--fees", chain.fees.as_str(),
            "--keyring-backend", "test",
            "-y",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    pub async fn query_balances(&self, address: &str, chain: &ChainConfig) -> FaucetResult<CommandOutput> {
        let args = Self::balance_args(address, chain);
        info!("command: {} {}", self.program, args.join(" "));
        self.runner.run(&self.program, &args).await
    }

    pub async fn send(&self, address: &str, chain: &ChainConfig) -> FaucetResult<CommandOutput> {
        let args = Self::send_args(&self.key, address, chain);
        info!("command: {} {}", self.program, args.join(" "));
        self.runner.run(&self.program, &args).await
    }
}
