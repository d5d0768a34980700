//! Per-IP visitor registry and its reclamation task
//!
//! Every client IP gets its own token bucket (a `governor` direct rate
//! limiter) and a last-seen timestamp. The whole map sits behind a single
//! mutex; the buckets themselves are lock-free, so concurrent checks on the
//! same bucket never lose a token.

use crate::error::{FaucetError, FaucetResult};
use crate::metrics::FaucetMetrics;
use governor::{
    clock::{Clock, DefaultClock, Reference},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Token bucket handed out per visitor
pub type VisitorLimiter<C> =
    RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Rate limiting and reclamation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitorPolicy {
    /// Bucket capacity
    pub burst: u32,
    /// Time to replenish one token
    pub replenish_period: Duration,
    /// Visitors unseen for longer than this are evicted
    pub max_idle: Duration,
    /// How often the reclamation task sweeps the registry
    pub sweep_interval: Duration,
}

impl Default for VisitorPolicy {
    fn default() -> Self {
        Self {
            burst: 20,
            replenish_period: Duration::from_secs(15),
            max_idle: Duration::from_secs(3 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl VisitorPolicy {
    fn quota(&self) -> FaucetResult<Quota> {
        let burst = NonZeroU32::new(self.burst)
            .ok_or_else(|| FaucetError::Config("rate limit burst must be positive".to_string()))?;
        let quota = Quota::with_period(self.replenish_period).ok_or_else(|| {
            FaucetError::Config("rate limit replenish period must be positive".to_string())
        })?;
        Ok(quota.allow_burst(burst))
    }
}

struct Visitor<C: Clock> {
    limiter: Arc<VisitorLimiter<C>>,
    last_seen: C::Instant,
}

/// Map from client identifier to its token bucket
pub struct VisitorRegistry<C: Clock = DefaultClock> {
    visitors: Mutex<HashMap<String, Visitor<C>>>,
    policy: VisitorPolicy,
    quota: Quota,
    clock: C,
}

impl VisitorRegistry<DefaultClock> {
    /// Create a registry driven by the system clock
    pub fn new(policy: VisitorPolicy) -> FaucetResult<Self> {
        Self::with_clock(policy, DefaultClock::default())
    }
}

impl<C: Clock> VisitorRegistry<C> {
    /// Create a registry driven by a custom clock
    pub fn with_clock(policy: VisitorPolicy, clock: C) -> FaucetResult<Self> {
        Ok(Self {
            visitors: Mutex::new(HashMap::new()),
            quota: policy.quota()?,
            policy,
            clock,
        })
    }

    pub fn policy(&self) -> &VisitorPolicy {
        &self.policy
    }

    // Entries are replaced whole, so a poisoned map is still consistent
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Visitor<C>>> {
        self.visitors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the visitor's bucket, creating it on first sight, and mark the visitor as seen now
    pub fn acquire(&self, client_id: &str) -> Arc<VisitorLimiter<C>> {
        let now = self.clock.now();
        let mut visitors = self.lock();

        if let Some(visitor) = visitors.get_mut(client_id) {
            visitor.last_seen = now;
            return visitor.limiter.clone();
        }

        let limiter = Arc::new(RateLimiter::direct_with_clock(self.quota, &self.clock));
        visitors.insert(
            client_id.to_string(),
            Visitor {
                limiter: limiter.clone(),
                last_seen: now,
            },
        );
        debug!("New visitor: {}", client_id);
        limiter
    }

    /// Remove every visitor idle for longer than `max_idle`, returning how many were removed
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let mut visitors = self.lock();
        let before = visitors.len();

        visitors.retain(|_, visitor| {
            let idle: Duration = now.duration_since(visitor.last_seen).into();
            idle <= max_idle
        });

        before - visitors.len()
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.lock().contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Periodically evict idle visitors until `shutdown` flips to `true` or its sender is dropped
pub async fn run_reclamation<C: Clock>(
    registry: Arc<VisitorRegistry<C>>,
    metrics: Arc<FaucetMetrics>,
    mut shutdown: watch::Receiver<bool>,
) {
    let policy = *registry.policy();
    let start = tokio::time::Instant::now() + policy.sweep_interval;
    let mut ticker = tokio::time::interval_at(start, policy.sweep_interval);

    info!(
        "Visitor reclamation started: sweep every {:?}, idle limit {:?}",
        policy.sweep_interval, policy.max_idle
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = registry.evict_idle(policy.max_idle);
                let remaining = registry.len();
                metrics.active_visitors.set(remaining as f64);
                if evicted > 0 {
                    debug!("Evicted {} idle visitors, {} remaining", evicted, remaining);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Visitor reclamation stopped");
}
