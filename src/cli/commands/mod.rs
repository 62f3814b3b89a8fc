pub mod account;
pub mod cert;
pub mod obtain;
pub mod renew;
pub mod serve;

pub use account::handle_account_show;
pub use cert::handle_cert_show;
pub use obtain::handle_obtain;
pub use renew::handle_renew;
pub use serve::handle_serve;

use std::sync::Arc;

use crate::config::Config;
use crate::dns;
use crate::error::Result;
use crate::metrics::MetricsRegistry;
use crate::orchestrator::IssuanceOrchestrator;
use crate::storage::{build_backend, CertificateStore};

/// Build the orchestrator every subcommand needs from a loaded `Config`.
/// When `[metrics]` is configured, issuance attempts and cache hits are
/// recorded against a fresh registry, returned alongside for the caller to
/// expose however it sees fit.
pub fn build_orchestrator(
    config: &Config,
) -> Result<(Arc<IssuanceOrchestrator<Arc<dyn crate::storage::StorageBackend>>>, Option<Arc<MetricsRegistry>>)> {
    let backend = build_backend(&config.storage)?;
    let store = CertificateStore::new(backend);
    let dns_provider = dns::build_provider(&config.dns)?;
    let mut orchestrator = IssuanceOrchestrator::new(config, store, dns_provider)?;

    let metrics = config.metrics.as_ref().map(|_| Arc::new(MetricsRegistry::new()));
    if let Some(metrics) = &metrics {
        orchestrator = orchestrator.with_metrics(metrics.clone());
    }

    Ok((Arc::new(orchestrator), metrics))
}
