/// Cloudflare-compatible DNS-01 provider: zone resolution, idempotent TXT
/// record creation, and record deletion over Cloudflare's v4 REST API.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dns::{DnsProvider, DnsRecord, ZoneMap};
use crate::error::{AcmeError, Result};
use crate::transport::http_client::HttpClient;
use crate::transport::retry::RetryPolicy;

/// Cloudflare's error code for "an identical record already exists",
/// returned when `create_txt_record` races another process.
const DUPLICATE_RECORD_ERROR_CODE: i64 = 81058;

#[derive(Debug, Clone)]
pub struct CloudflareConfig {
    pub api_token: String,
    pub base_url: String,
    /// Static suffix -> zone id map, consulted before any API call.
    pub zone_map: ZoneMap,
}

impl CloudflareConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: "https://api.cloudflare.com/client/v4".to_string(),
            zone_map: ZoneMap::new(),
        }
    }

    pub fn with_zone_map(mut self, zone_map: ZoneMap) -> Self {
        self.zone_map = zone_map;
        self
    }
}

pub struct CloudflareDnsProvider {
    config: CloudflareConfig,
    http_client: HttpClient,
}

impl CloudflareDnsProvider {
    pub fn new(config: CloudflareConfig, http_client: HttpClient) -> Self {
        Self { config, http_client }
    }

    /// Longest configured suffix such that `domain` equals it or ends with
    /// `.` + it.
    fn zone_from_map(&self, domain: &str) -> Option<String> {
        self.config
            .zone_map
            .iter()
            .filter(|(suffix, _)| domain == suffix.as_str() || domain.ends_with(&format!(".{}", suffix)))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(_, zone_id)| zone_id.clone())
    }
}

#[derive(Debug, Deserialize)]
struct CfEnvelope<T> {
    success: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    errors: Vec<CfError>,
}

#[derive(Debug, Deserialize, Clone)]
struct CfError {
    code: i64,
}

#[derive(Debug, Deserialize)]
struct CfZone {
    id: String,
}

#[derive(Debug, Deserialize, Clone)]
struct CfDnsRecordResult {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct CfCreateRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
}

#[async_trait]
impl DnsProvider for CloudflareDnsProvider {
    fn name(&self) -> &str {
        "cloudflare"
    }

    async fn resolve_zone_id(&self, domain: &str) -> Result<String> {
        let base = domain.strip_prefix("*.").unwrap_or(domain);

        if let Some(zone_id) = self.zone_from_map(base) {
            return Ok(zone_id);
        }

        let labels: Vec<&str> = base.split('.').collect();
        for start in 0..labels.len().saturating_sub(1) {
            let candidate = labels[start..].join(".");
            let url = format!(
                "{}/zones?name={}&status=active&per_page=1",
                self.config.base_url,
                urlencoding::encode(&candidate)
            );
            let response = self
                .http_client
                .get_bearer_with_retry(&url, &self.config.api_token, RetryPolicy::DEFAULT)
                .await?;
            let envelope: CfEnvelope<Vec<CfZone>> = response.json()?;
            if let Some(zone) = envelope.result.unwrap_or_default().into_iter().next() {
                return Ok(zone.id);
            }
        }

        Err(AcmeError::zone_resolution_failed(format!(
            "no zone resolved for {}: configure `zone_map` or grant the API token read access to the zone",
            domain
        )))
    }

    async fn create_txt_record(&self, zone_id: &str, name: &str, content: &str) -> Result<DnsRecord> {
        let list_url = format!(
            "{}/zones/{}/dns_records?type=TXT&name={}&per_page=100",
            self.config.base_url,
            zone_id,
            urlencoding::encode(name)
        );

        if let Some(found) = self.find_matching_record(&list_url, name, content).await? {
            return Ok(DnsRecord { id: found, created: false });
        }

        let create_url = format!("{}/zones/{}/dns_records", self.config.base_url, zone_id);
        let payload = CfCreateRecordRequest {
            record_type: "TXT",
            name,
            content,
            ttl: 60,
        };
        let response = self
            .http_client
            .post_json_bearer_with_retry(&create_url, &self.config.api_token, &payload)
            .await?;

        let envelope: CfEnvelope<CfDnsRecordResult> = response
            .json()
            .map_err(|e| AcmeError::dns_create_failed(format!("malformed response: {}", e)))?;

        if envelope.success {
            if let Some(result) = envelope.result {
                return Ok(DnsRecord { id: result.id, created: true });
            }
        }

        if envelope.errors.iter().any(|e| e.code == DUPLICATE_RECORD_ERROR_CODE) {
            if let Some(found) = self.find_matching_record(&list_url, name, content).await? {
                return Ok(DnsRecord { id: found, created: false });
            }
        }

        Err(AcmeError::dns_create_failed(format!(
            "status {}: {}",
            response.status,
            response.text().unwrap_or_default().chars().take(2000).collect::<String>()
        )))
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.config.base_url, zone_id, record_id
        );
        let response = self
            .http_client
            .delete_bearer_with_retry(&url, &self.config.api_token, RetryPolicy::DEFAULT)
            .await?;

        if !response.is_success() {
            return Err(AcmeError::dns_delete_failed(format!(
                "status {}: {}",
                response.status,
                response.text().unwrap_or_default().chars().take(2000).collect::<String>()
            )));
        }
        Ok(())
    }
}

impl CloudflareDnsProvider {
    async fn find_matching_record(&self, list_url: &str, name: &str, content: &str) -> Result<Option<String>> {
        let response = self
            .http_client
            .get_bearer_with_retry(list_url, &self.config.api_token, RetryPolicy::DEFAULT)
            .await?;
        let envelope: CfEnvelope<Vec<CfDnsRecordResult>> = response.json()?;
        Ok(envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .find(|r| r.record_type == "TXT" && r.name == name && r.content == content)
            .map(|r| r.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_map_prefers_the_longest_matching_suffix() {
        let mut zone_map = ZoneMap::new();
        zone_map.insert("example.com".to_string(), "zone-root".to_string());
        zone_map.insert("dev.example.com".to_string(), "zone-dev".to_string());

        let config = CloudflareConfig::new("token").with_zone_map(zone_map);
        let provider = CloudflareDnsProvider::new(config, HttpClient::with_defaults().unwrap());

        assert_eq!(
            provider.zone_from_map("app.dev.example.com"),
            Some("zone-dev".to_string())
        );
        assert_eq!(
            provider.zone_from_map("other.example.com"),
            Some("zone-root".to_string())
        );
        assert_eq!(provider.zone_from_map("unrelated.net"), None);
    }
}
