//! Background renewal loop: wakes on a fixed interval and calls
//! `obtain_or_renew` for every configured domain. A failure on one domain
//! is logged and does not stop the loop or affect the others.
use std::sync::Arc;

use tokio::time::MissedTickBehavior;

use crate::orchestrator::IssuanceOrchestrator;
use crate::storage::StorageBackend;

pub struct RenewalScheduler<B: StorageBackend> {
    orchestrator: Arc<IssuanceOrchestrator<B>>,
    domains: Vec<String>,
    check_interval: std::time::Duration,
}

impl<B: StorageBackend + 'static> RenewalScheduler<B> {
    pub fn new(
        orchestrator: Arc<IssuanceOrchestrator<B>>,
        domains: Vec<String>,
        check_interval: std::time::Duration,
    ) -> Self {
        Self {
            orchestrator,
            domains,
            check_interval,
        }
    }

    /// Runs forever, ticking every `check_interval`. Intended to be spawned
    /// with `tokio::spawn` alongside the server, not awaited directly.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// One pass over every configured domain. Exposed separately so callers
    /// (and tests) can drive a single cycle without waiting on the ticker.
    pub async fn run_once(&self) {
        for domain in &self.domains {
            match self.orchestrator.obtain_or_renew(domain).await {
                Ok(issued) if issued.cached => {
                    tracing::debug!(domain = %domain, "certificate still valid, skipping renewal");
                }
                Ok(issued) => {
                    tracing::info!(domain = %domain, provider = %issued.provider, "certificate renewed");
                }
                Err(e) => {
                    tracing::error!(domain = %domain, error = %e, "renewal attempt failed");
                }
            }
        }
    }
}
