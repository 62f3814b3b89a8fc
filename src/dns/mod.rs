/// DNS-01 challenge support: the provider trait, the Cloudflare-compatible
/// concrete implementation, and the small naming/zone helpers shared by
/// any provider.
pub mod providers;

use async_trait::async_trait;

use crate::error::Result;

pub use providers::cloudflare::{CloudflareConfig, CloudflareDnsProvider};

/// A static suffix -> zone id map, consulted before any API round trip.
/// Longest match wins.
pub type ZoneMap = std::collections::HashMap<String, String>;

/// The record returned by `create_txt_record`: its provider-assigned id,
/// and whether this call actually created it (`false` when an identical
/// record already existed).
#[derive(Debug, Clone)]
pub struct DnsRecord {
    pub id: String,
    pub created: bool,
}

/// DNS-01 support a CA-facing provider must offer. Implemented once for
/// Cloudflare-compatible APIs; additional backends plug in here without
/// touching the orchestrator.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Human-readable name, used in orchestrator logs and fallback error
    /// messages.
    fn name(&self) -> &str;

    /// Resolve the zone id that owns `domain` (already stripped of any
    /// wildcard label).
    async fn resolve_zone_id(&self, domain: &str) -> Result<String>;

    /// Idempotently ensure a TXT record `name=content` exists in `zone_id`.
    async fn create_txt_record(&self, zone_id: &str, name: &str, content: &str) -> Result<DnsRecord>;

    /// Delete a previously created record. Failures here are caught and
    /// logged by the orchestrator rather than failing the issuance.
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()>;
}

/// `_acme-challenge.<domain>`, with any leading wildcard label stripped.
pub fn dns01_record_name(domain: &str) -> String {
    let base = domain.strip_prefix("*.").unwrap_or(domain);
    format!("_acme-challenge.{}", base)
}

/// Build the configured DNS provider. Only Cloudflare-compatible APIs are
/// supported; `dns.api_token` must be set.
pub fn build_provider(settings: &crate::config::DnsSettings) -> Result<std::sync::Arc<dyn DnsProvider>> {
    let api_token = settings
        .api_token
        .clone()
        .ok_or_else(|| crate::error::AcmeError::configuration("dns.api_token is required"))?;

    let config = CloudflareConfig::new(api_token).with_zone_map(settings.zone_map.clone());
    let http_client = crate::transport::HttpClient::with_defaults()?;
    Ok(std::sync::Arc::new(CloudflareDnsProvider::new(config, http_client)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_name_strips_wildcard_label() {
        assert_eq!(dns01_record_name("example.com"), "_acme-challenge.example.com");
        assert_eq!(
            dns01_record_name("*.example.com"),
            "_acme-challenge.example.com"
        );
    }
}
