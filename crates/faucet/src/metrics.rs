//! Prometheus metrics for the faucet

use crate::error::{FaucetError, FaucetResult};
use prometheus::{opts, Encoder, Gauge, IntCounter, IntCounterVec, Registry, TextEncoder};

#[derive(Debug)]
pub struct FaucetMetrics {
    registry: Registry,

    /// Claims by outcome (`success`, `failure`, `invalid`)
    pub claims_total: IntCounterVec,
    /// Requests refused by the admission gate
    pub rate_limited_total: IntCounter,
    /// Transfer submissions by chain id and CLI result (`ok`, `failed`)
    pub transfers_total: IntCounterVec,
    /// Visitors currently tracked by the rate limiter
    pub active_visitors: Gauge,
}

impl FaucetMetrics {
    pub fn new() -> FaucetResult<Self> {
        let registry = Registry::new();

        let claims_total = IntCounterVec::new(
            opts!("faucet_claims_total", "Claims handled, by outcome"),
            &["outcome"],
        )
        .map_err(metric_error)?;
        let rate_limited_total = IntCounter::with_opts(opts!(
            "faucet_rate_limited_total",
            "Requests rejected by the per-IP rate limiter"
        ))
        .map_err(metric_error)?;
        let transfers_total = IntCounterVec::new(
            opts!("faucet_transfers_total", "Transfer submissions, by chain and result"),
            &["chain", "outcome"],
        )
        .map_err(metric_error)?;
        let active_visitors = Gauge::with_opts(opts!(
            "faucet_active_visitors",
            "Client IPs tracked by the rate limiter"
        ))
        .map_err(metric_error)?;

        registry.register(Box::new(claims_total.clone())).map_err(metric_error)?;
        registry.register(Box::new(rate_limited_total.clone())).map_err(metric_error)?;
        registry.register(Box::new(transfers_total.clone())).map_err(metric_error)?;
        registry.register(Box::new(active_visitors.clone())).map_err(metric_error)?;

        Ok(Self {
            registry,
            claims_total,
            rate_limited_total,
            transfers_total,
            active_visitors,
        })
    }

    pub fn record_claim(&self, outcome: &str) {
        self.claims_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_transfer(&self, chain_id: &str, submitted: bool) {
        let outcome = if submitted { "ok" } else { "failed" };
        self.transfers_total.with_label_values(&[chain_id, outcome]).inc();
    }

    /// Render in the Prometheus text exposition format
    pub fn render(&self) -> FaucetResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metric_error)?;
        String::from_utf8(buffer).map_err(|e| FaucetError::Internal(e.to_string()))
    }
}

fn metric_error(err: prometheus::Error) -> FaucetError {
    FaucetError::Internal(format!("metrics: {}", err))
}
