use crate::config::Config;
use crate::error::Result;

pub async fn handle_renew(config: &Config) -> Result<()> {
    if config.renewal.domains.is_empty() {
        tracing::warn!("renewal.domains is empty, nothing to do");
        return Ok(());
    }

    let (orchestrator, _metrics) = super::build_orchestrator(config)?;

    let mut failures = Vec::new();
    for domain in &config.renewal.domains {
        match orchestrator.obtain_or_renew(domain).await {
            Ok(issued) if issued.cached => {
                tracing::info!(domain = %domain, "already valid, skipped");
            }
            Ok(issued) => {
                tracing::info!(domain = %domain, provider = %issued.provider, "renewed");
            }
            Err(e) => {
                tracing::error!(domain = %domain, error = %e, "renewal failed");
                failures.push(domain.clone());
            }
        }
    }

    if !failures.is_empty() {
        return Err(crate::error::AcmeError::certificate(format!(
            "renewal failed for: {}",
            failures.join(", ")
        )));
    }
    Ok(())
}
