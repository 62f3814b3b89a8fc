/// Replay-nonce management for ACME signed requests.
///
/// The client caches a single nonce at a time: if none is cached, it HEADs
/// `directory.newNonce`; every signed response's `Replay-Nonce` header
/// updates the cache for the next request. There is no pooling or
/// pre-fetching - `new_nonce` is cheap enough that it isn't worth the
/// coordination.
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{AcmeError, Result};
use crate::transport::http_client::HttpClient;
use crate::transport::retry::RetryPolicy;

pub struct NonceManager {
    new_nonce_url: String,
    http_client: HttpClient,
    cached: Arc<Mutex<Option<String>>>,
}

impl NonceManager {
    pub fn new(new_nonce_url: impl Into<String>, http_client: HttpClient) -> Self {
        Self {
            new_nonce_url: new_nonce_url.into(),
            http_client,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// Return the cached nonce if any, else fetch a fresh one.
    pub async fn get_nonce(&self) -> Result<String> {
        {
            let mut cached = self.cached.lock().await;
            if let Some(nonce) = cached.take() {
                return Ok(nonce);
            }
        }

        self.fetch_nonce().await
    }

    async fn fetch_nonce(&self) -> Result<String> {
        let response = self
            .http_client
            .head_with_retry(&self.new_nonce_url, RetryPolicy::DEFAULT)
            .await?;

        if !response.is_success() {
            return Err(AcmeError::acme_request_failed(
                response.status,
                self.new_nonce_url.clone(),
                response.text().unwrap_or_default(),
            ));
        }

        response
            .header("replay-nonce")
            .map(|s| s.to_string())
            .ok_or_else(|| AcmeError::protocol("newNonce response missing Replay-Nonce header"))
    }

    /// Cache the nonce carried by a signed response, replacing whatever was
    /// cached before.
    pub async fn update_from_header(&self, nonce: Option<&str>) {
        if let Some(nonce) = nonce {
            let mut cached = self.cached.lock().await;
            *cached = Some(nonce.to_string());
        }
    }

    pub async fn clear(&self) {
        let mut cached = self.cached.lock().await;
        *cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_from_header_overwrites_the_cache() {
        let manager = NonceManager::new(
            "https://example.com/acme/new-nonce",
            HttpClient::with_defaults().unwrap(),
        );

        manager.update_from_header(Some("nonce-1")).await;
        assert_eq!(manager.get_nonce().await.unwrap(), "nonce-1");

        manager.update_from_header(Some("nonce-2")).await;
        assert_eq!(manager.get_nonce().await.unwrap(), "nonce-2");
    }

    #[tokio::test]
    async fn update_from_header_ignores_none() {
        let manager = NonceManager::new(
            "https://example.com/acme/new-nonce",
            HttpClient::with_defaults().unwrap(),
        );
        manager.update_from_header(Some("nonce-1")).await;
        manager.update_from_header(None).await;
        assert_eq!(manager.get_nonce().await.unwrap(), "nonce-1");
    }

    #[tokio::test]
    async fn getting_a_nonce_consumes_it() {
        let manager = NonceManager::new(
            "https://example.com/acme/new-nonce",
            HttpClient::with_defaults().unwrap(),
        );
        manager.update_from_header(Some("nonce-1")).await;
        assert_eq!(manager.get_nonce().await.unwrap(), "nonce-1");

        let cached = manager.cached.lock().await;
        assert!(cached.is_none());
    }
}
