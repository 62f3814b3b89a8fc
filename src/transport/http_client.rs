//! HTTP client wrapping reqwest with the retry policy ACME/DNS calls need.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;
use crate::transport::retry::{backoff_delay, RetryPolicy};

/// A normalized HTTP response: status, headers (lower-cased names, last
/// value wins on duplicates), and raw body bytes.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.clone())
            .map_err(|e| crate::error::AcmeError::transport(format!("invalid UTF-8 body: {}", e)))
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(crate::error::AcmeError::from)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("acmex/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Thin wrapper over `reqwest::Client` adding the fixed-table retry policy
/// every ACME and DNS provider call uses.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| crate::error::AcmeError::transport(format!("failed to build client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn get_with_retry(&self, url: &str, policy: RetryPolicy) -> Result<HttpResponse> {
        self.execute_with_retry(policy, || self.client.get(url)).await
    }

    pub async fn head_with_retry(&self, url: &str, policy: RetryPolicy) -> Result<HttpResponse> {
        self.execute_with_retry(policy, || self.client.head(url)).await
    }

    pub async fn post_json_with_retry<T: serde::Serialize>(
        &self,
        url: &str,
        content_type: &str,
        body: &T,
    ) -> Result<HttpResponse> {
        let payload = serde_json::to_vec(body)?;
        self.execute_with_retry(RetryPolicy::DEFAULT, || {
            self.client
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(payload.clone())
        })
        .await
    }

    pub async fn get_bearer_with_retry(
        &self,
        url: &str,
        token: &str,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.execute_with_retry(policy, || self.client.get(url).bearer_auth(token)).await
    }

    pub async fn post_json_bearer_with_retry<T: serde::Serialize>(
        &self,
        url: &str,
        token: &str,
        body: &T,
    ) -> Result<HttpResponse> {
        let payload = serde_json::to_vec(body)?;
        self.execute_with_retry(RetryPolicy::DEFAULT, || {
            self.client
                .post(url)
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload.clone())
        })
        .await
    }

    pub async fn delete_bearer_with_retry(
        &self,
        url: &str,
        token: &str,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.execute_with_retry(policy, || self.client.delete(url).bearer_auth(token)).await
    }

    async fn execute_with_retry(
        &self,
        policy: RetryPolicy,
        build_request: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<HttpResponse> {
        let mut attempt = 0usize;
        loop {
            let outcome = build_request().send().await;

            match outcome {
                Ok(response) => {
                    let normalized = Self::normalize(response).await?;
                    if !policy.should_retry(normalized.status, attempt) {
                        return Ok(normalized);
                    }
                    tracing::warn!(
                        status = normalized.status,
                        attempt,
                        "transient ACME/DNS response, retrying"
                    );
                }
                Err(e) => {
                    if attempt >= policy.max_retries {
                        return Err(crate::error::AcmeError::transport(format!(
                            "request failed after {} attempts: {}",
                            attempt + 1,
                            e
                        )));
                    }
                    tracing::warn!(error = %e, attempt, "transport error, retrying");
                }
            }

            tokio::time::sleep(backoff_delay(attempt)).await;
            attempt += 1;
        }
    }

    async fn normalize(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_ascii_lowercase(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| crate::error::AcmeError::transport(format!("failed to read body: {}", e)))?
            .to_vec();
        Ok(HttpResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_classifies_success() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: vec![],
        };
        assert!(response.is_success());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("replay-nonce".to_string(), "abc".to_string());
        let response = HttpResponse { status: 200, headers, body: vec![] };
        assert_eq!(response.header("Replay-Nonce"), Some("abc"));
    }

    #[tokio::test]
    async fn client_builds_with_defaults() {
        assert!(HttpClient::with_defaults().is_ok());
    }
}
