use crate::config::Config;
use crate::error::Result;

pub async fn handle_obtain(config: &Config, domain: &str) -> Result<()> {
    let (orchestrator, _metrics) = super::build_orchestrator(config)?;
    let issued = orchestrator.obtain_or_renew(domain).await?;

    if issued.cached {
        tracing::info!(domain = %issued.domain, not_after = %issued.not_after_iso, "certificate already valid");
    } else {
        tracing::info!(
            domain = %issued.domain,
            provider = %issued.provider,
            not_after = %issued.not_after_iso,
            "certificate obtained"
        );
    }

    println!("{}", issued.cert_pem);
    Ok(())
}
