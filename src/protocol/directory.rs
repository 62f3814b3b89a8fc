/// ACME directory discovery, with an optional bounded-TTL cache.
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{AcmeError, Result};
use crate::transport::http_client::HttpClient;
use crate::transport::retry::RetryPolicy;

/// The CA's advertised set of endpoints (RFC 8555 §7.1.1).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Directory {
    #[serde(rename = "newNonce")]
    pub new_nonce: String,

    #[serde(rename = "newAccount")]
    pub new_account: String,

    #[serde(rename = "newOrder")]
    pub new_order: String,

    #[serde(rename = "revokeCert")]
    pub revoke_cert: String,

    #[serde(rename = "keyChange")]
    pub key_change: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<DirectoryMeta>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryMeta {
    #[serde(rename = "termsOfService")]
    pub terms_of_service: Option<String>,
    pub website: Option<String>,
    #[serde(rename = "caaIdentities")]
    pub caa_identities: Option<Vec<String>>,
    #[serde(rename = "externalAccountRequired")]
    pub external_account_required: Option<bool>,
}

const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct CachedDirectory {
    directory: Directory,
    fetched_at: Instant,
}

/// Fetches and optionally caches a CA's directory document. The cache is
/// transparent to callers and purely a latency optimization; it is never
/// required for correctness.
pub struct DirectoryManager {
    url: String,
    http_client: HttpClient,
    cached: Arc<RwLock<Option<CachedDirectory>>>,
}

impl DirectoryManager {
    pub fn new(url: impl Into<String>, http_client: HttpClient) -> Self {
        Self {
            url: url.into(),
            http_client,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Fetch a fresh directory, bypassing and then refreshing the cache.
    pub async fn fetch(&self) -> Result<Directory> {
        let response = self
            .http_client
            .get_with_retry(&self.url, RetryPolicy::DIRECTORY)
            .await?;

        if !response.is_success() {
            return Err(AcmeError::acme_request_failed(
                response.status,
                self.url.clone(),
                response.text().unwrap_or_default(),
            ));
        }

        let directory: Directory = response
            .json()
            .map_err(|e| AcmeError::protocol(format!("failed to parse directory: {}", e)))?;

        let mut cached = self.cached.write().await;
        *cached = Some(CachedDirectory {
            directory: directory.clone(),
            fetched_at: Instant::now(),
        });

        Ok(directory)
    }

    /// Return the cached directory if still within TTL, else fetch fresh.
    pub async fn get(&self) -> Result<Directory> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.fetched_at.elapsed() < CACHE_TTL {
                    return Ok(entry.directory.clone());
                }
            }
        }

        self.fetch().await
    }

    pub async fn clear_cache(&self) {
        let mut cached = self.cached.write().await;
        *cached = None;
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_parses_required_fields() {
        let json = r#"{
            "newNonce": "https://example.com/acme/new-nonce",
            "newAccount": "https://example.com/acme/new-account",
            "newOrder": "https://example.com/acme/new-order",
            "revokeCert": "https://example.com/acme/revoke-cert",
            "keyChange": "https://example.com/acme/key-change"
        }"#;

        let dir: Directory = serde_json::from_str(json).unwrap();
        assert_eq!(dir.new_nonce, "https://example.com/acme/new-nonce");
        assert_eq!(dir.new_account, "https://example.com/acme/new-account");
        assert!(dir.meta.is_none());
    }

    #[test]
    fn directory_parses_optional_meta() {
        let json = r#"{
            "newNonce": "https://example.com/acme/new-nonce",
            "newAccount": "https://example.com/acme/new-account",
            "newOrder": "https://example.com/acme/new-order",
            "revokeCert": "https://example.com/acme/revoke-cert",
            "keyChange": "https://example.com/acme/key-change",
            "meta": {
                "termsOfService": "https://example.com/tos",
                "website": "https://example.com",
                "caaIdentities": ["example.com"],
                "externalAccountRequired": false
            }
        }"#;

        let dir: Directory = serde_json::from_str(json).unwrap();
        let meta = dir.meta.unwrap();
        assert_eq!(meta.terms_of_service, Some("https://example.com/tos".to_string()));
        assert_eq!(meta.external_account_required, Some(false));
    }

    #[tokio::test]
    async fn expired_cache_entry_is_not_returned() {
        let client = HttpClient::with_defaults().unwrap();
        let manager = DirectoryManager::new("https://example.com/directory", client);

        let directory = Directory {
            new_nonce: "https://example.com/acme/new-nonce".to_string(),
            new_account: "https://example.com/acme/new-account".to_string(),
            new_order: "https://example.com/acme/new-order".to_string(),
            revoke_cert: "https://example.com/acme/revoke-cert".to_string(),
            key_change: "https://example.com/acme/key-change".to_string(),
            meta: None,
        };

        {
            let mut cached = manager.cached.write().await;
            *cached = Some(CachedDirectory {
                directory,
                fetched_at: Instant::now() - CACHE_TTL - Duration::from_secs(1),
            });
        }

        let cached = manager.cached.read().await;
        let entry = cached.as_ref().unwrap();
        assert!(entry.fetched_at.elapsed() >= CACHE_TTL);
    }
}
