//! Faucet service binary

use clap::Parser;
use cosmos_faucet::logging::{init_logging, LoggingConfig};
use cosmos_faucet::{
    router, run_reclamation, AppState, FaucetConfig, FaucetMetrics, FaucetService, ProcessRunner,
    RecaptchaVerifier, VisitorPolicy, VisitorRegistry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

/// Faucet service CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address, overrides FAUCET_PUBLIC_URL
    #[arg(long)]
    server_addr: Option<String>,

    /// Deadline for each chain CLI invocation (seconds)
    #[arg(long)]
    cli_timeout: Option<u64>,

    /// Log level
    #[arg(long, env = "FAUCET_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (pretty, compact, json)
    #[arg(long, env = "FAUCET_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Variables already in the environment win over both files
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&LoggingConfig {
        level: if args.debug { "debug".to_string() } else { args.log_level.clone() },
        format: args.log_format.clone(),
        ..Default::default()
    })?;

    info!("Starting Cosmos Faucet v{}", env!("CARGO_PKG_VERSION"));

    let mut config = FaucetConfig::from_env()?;

    // Override with CLI arguments
    if let Some(addr) = args.server_addr {
        config.server_addr = addr;
    }

    if let Some(timeout) = args.cli_timeout {
        config.cli_timeout_secs = timeout;
    }

    config.validate()?;

    info!("Configuration:");
    info!("  Server address: {}", config.server_addr);
    info!("  CLI: {} (timeout {:?})", config.cli_name, config.cli_timeout());
    info!("  Max balance: {}", config.max_balance);
    for chain in &config.chains {
        info!(
            "  Chain {}: node={} amount={} fees={}",
            chain.chain_id, chain.node, chain.amount, chain.fees
        );
    }

    let config = Arc::new(config);
    let metrics = Arc::new(FaucetMetrics::new()?);
    let runner = Arc::new(ProcessRunner::new(config.cli_timeout()));
    let service = Arc::new(FaucetService::new(config.clone(), runner, metrics.clone()));
    let captcha = Arc::new(RecaptchaVerifier::new(config.captcha_secret.clone())?);
    let visitors = Arc::new(VisitorRegistry::new(VisitorPolicy::default())?);

    // Start reclamation task
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reclamation = tokio::spawn(run_reclamation(visitors.clone(), metrics.clone(), shutdown_rx));

    let app = router(AppState {
        service,
        captcha,
        visitors,
    });
    if config.cors_enabled {
        info!("CORS enabled");
    }

    // Start server
    let addr: SocketAddr = config.server_addr.parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tx.send(true).ok();
    if let Err(e) = reclamation.await {
        warn!("Reclamation task ended abnormally: {}", e);
    }

    info!("Shutting down gracefully");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
