use crate::config::Config;
use crate::error::Result;
use crate::scheduler::RenewalScheduler;
use crate::server;

pub async fn handle_serve(config: &Config) -> Result<()> {
    let (orchestrator, metrics) = super::build_orchestrator(config)?;

    let addr: std::net::SocketAddr = config
        .server
        .bind_address
        .parse()
        .map_err(|e| crate::error::AcmeError::configuration(format!("invalid server.bind_address: {}", e)))?;

    let scheduler = RenewalScheduler::new(
        orchestrator.clone(),
        config.renewal.domains.clone(),
        config.renewal_check_interval(),
    );

    tokio::spawn(scheduler.run());

    if let (Some(metrics_settings), Some(metrics)) = (&config.metrics, metrics) {
        let metrics_addr: std::net::SocketAddr = metrics_settings
            .bind_address
            .parse()
            .map_err(|e| crate::error::AcmeError::configuration(format!("invalid metrics.bind_address: {}", e)))?;
        tokio::spawn(server::serve_metrics(metrics_addr, metrics));
    }

    server::serve(addr, orchestrator).await
}
