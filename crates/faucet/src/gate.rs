//! Per-IP admission control for the polling route

use crate::api::AppState;
use crate::error::{FaucetError, FaucetResult};
use crate::registry::VisitorRegistry;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::clock::Clock;
use std::net::SocketAddr;
use tracing::{debug, error};

/// Take one token from the peer's bucket
pub fn admit<C: Clock>(registry: &VisitorRegistry<C>, peer: Option<SocketAddr>) -> FaucetResult<()> {
    let peer = peer.ok_or(FaucetError::MissingPeerAddress)?;
    let ip = peer.ip().to_string();

    registry
        .acquire(&ip)
        .check()
        .map_err(|_| FaucetError::RateLimited)
}

/// Middleware answering 429 once a client's bucket is empty
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let admitted = admit(state.visitors.as_ref(), peer);
    let metrics = state.service.metrics();
    metrics.active_visitors.set(state.visitors.len() as f64);

    match admitted {
        Ok(()) => next.run(request).await,
        Err(FaucetError::RateLimited) => {
            metrics.rate_limited_total.inc();
            debug!("Rate limited {:?}", peer);
            FaucetError::RateLimited.into_response()
        }
        Err(e) => {
            error!("Admission failed: {}", e);
            e.into_response()
        }
    }
}
