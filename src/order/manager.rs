/// Order lifecycle: creation, authorization/challenge lookup, polling, and
/// finalization. Borrows the account manager for signing identity rather
/// than duplicating key/nonce/directory plumbing.
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;

use crate::account::AccountManager;
use crate::error::{AcmeError, Result};
use crate::protocol::DirectoryManager;

use super::objects::{Authorization, NewOrderRequest, Order};

const POLL_INITIAL_DELAY: Duration = Duration::from_secs(2);
const POLL_BACKOFF_MULTIPLIER: f64 = 1.7;
const POLL_MAX_DELAY: Duration = Duration::from_secs(10);
const POLL_MAX_ATTEMPTS: usize = 12;
const AUTHORIZATION_POLL_TIMEOUT: Duration = Duration::from_secs(120);
const ORDER_POLL_TIMEOUT: Duration = Duration::from_secs(180);

pub struct OrderManager<'a> {
    account_manager: &'a AccountManager<'a>,
    #[allow(dead_code)]
    directory_manager: &'a DirectoryManager,
    account_id: String,
}

impl<'a> OrderManager<'a> {
    pub fn new(
        account_manager: &'a AccountManager<'a>,
        directory_manager: &'a DirectoryManager,
        account_id: String,
    ) -> Self {
        Self {
            account_manager,
            directory_manager,
            account_id,
        }
    }

    /// Create a new order, returning it alongside its `Location`.
    pub async fn create_order(&self, request: &NewOrderRequest) -> Result<(String, Order)> {
        let directory = self.account_manager.directory_manager.get().await?;
        let payload = serde_json::to_value(request)?;
        let response = self
            .account_manager
            .post_signed_with_kid(&self.account_id, &directory.new_order, &payload)
            .await?;

        if !response.is_success() {
            return Err(AcmeError::acme_request_failed(
                response.status,
                directory.new_order.clone(),
                response.text().unwrap_or_default(),
            ));
        }

        let order_url = response
            .header("location")
            .ok_or_else(|| AcmeError::protocol("new-order response missing Location header"))?
            .to_string();
        let order: Order = response.json()?;
        Ok((order_url, order))
    }

    /// POST-AS-GET the order URL for its current state.
    pub async fn get_order(&self, order_url: &str) -> Result<Order> {
        let response = self.account_manager.post_as_get(&self.account_id, order_url).await?;
        if !response.is_success() {
            return Err(AcmeError::acme_request_failed(
                response.status,
                order_url.to_string(),
                response.text().unwrap_or_default(),
            ));
        }
        Ok(response.json()?)
    }

    /// POST-AS-GET an authorization URL.
    pub async fn get_authorization(&self, authz_url: &str) -> Result<Authorization> {
        let response = self.account_manager.post_as_get(&self.account_id, authz_url).await?;
        if !response.is_success() {
            return Err(AcmeError::acme_request_failed(
                response.status,
                authz_url.to_string(),
                response.text().unwrap_or_default(),
            ));
        }
        Ok(response.json()?)
    }

    /// Select the `dns-01` challenge from an authorization, or fail.
    pub fn select_dns01_challenge<'b>(
        &self,
        authorization: &'b Authorization,
    ) -> Result<&'b super::objects::Challenge> {
        authorization.get_challenge("dns-01").ok_or_else(|| {
            AcmeError::protocol(format!(
                "authorization for {} has no dns-01 challenge",
                authorization.identifier.value
            ))
        })
    }

    /// POST `{}` (not POST-AS-GET) to a challenge URL to tell the CA to
    /// attempt validation.
    pub async fn respond_to_challenge(&self, challenge_url: &str) -> Result<()> {
        let response = self
            .account_manager
            .post_signed_with_kid(&self.account_id, challenge_url, &json!({}))
            .await?;

        if !response.is_success() {
            return Err(AcmeError::acme_request_failed(
                response.status,
                challenge_url.to_string(),
                response.text().unwrap_or_default(),
            ));
        }
        Ok(())
    }

    /// Poll an authorization until it reaches `valid`, fails with
    /// `invalid`, or the attempt/time budget is exhausted.
    pub async fn poll_authorization_valid(&self, authz_url: &str) -> Result<Authorization> {
        let deadline = Instant::now() + AUTHORIZATION_POLL_TIMEOUT;
        let mut delay = POLL_INITIAL_DELAY;

        for attempt in 0..POLL_MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay = next_backoff(delay);
            }

            if Instant::now() >= deadline {
                break;
            }

            let authorization = self.get_authorization(authz_url).await?;
            match authorization.status.as_str() {
                "valid" => return Ok(authorization),
                "invalid" => {
                    return Err(AcmeError::protocol(format!(
                        "authorization for {} became invalid",
                        authorization.identifier.value
                    )))
                }
                _ => continue,
            }
        }

        Err(AcmeError::poll_exceeded(format!(
            "authorization at {} did not become valid within {} attempts / {:?}",
            authz_url, POLL_MAX_ATTEMPTS, AUTHORIZATION_POLL_TIMEOUT
        )))
    }

    /// Poll an order until it reaches `valid`, fails with `invalid`, or the
    /// attempt/time budget is exhausted.
    pub async fn poll_order_valid(&self, order_url: &str) -> Result<Order> {
        let deadline = Instant::now() + ORDER_POLL_TIMEOUT;
        let mut delay = POLL_INITIAL_DELAY;

        for attempt in 0..POLL_MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay = next_backoff(delay);
            }

            if Instant::now() >= deadline {
                break;
            }

            let order = self.get_order(order_url).await?;
            match order.status.as_str() {
                "valid" => return Ok(order),
                "invalid" => {
                    return Err(AcmeError::protocol(format!(
                        "order at {} became invalid",
                        order_url
                    )))
                }
                _ => continue,
            }
        }

        Err(AcmeError::poll_exceeded(format!(
            "order at {} did not become valid within {} attempts / {:?}",
            order_url, POLL_MAX_ATTEMPTS, ORDER_POLL_TIMEOUT
        )))
    }

    /// POST `{csr: base64url(csr_der)}` to the finalize URL.
    pub async fn finalize_order(&self, finalize_url: &str, csr_der: &[u8]) -> Result<Order> {
        let payload = json!({ "csr": URL_SAFE_NO_PAD.encode(csr_der) });
        let response = self
            .account_manager
            .post_signed_with_kid(&self.account_id, finalize_url, &payload)
            .await?;

        if !response.is_success() {
            return Err(AcmeError::acme_request_failed(
                response.status,
                finalize_url.to_string(),
                response.text().unwrap_or_default(),
            ));
        }
        Ok(response.json()?)
    }

    /// POST-AS-GET the certificate URL; the CA returns the PEM chain as
    /// plain text (`application/pem-certificate-chain`).
    pub async fn download_certificate(&self, certificate_url: &str) -> Result<String> {
        let response = self
            .account_manager
            .post_as_get(&self.account_id, certificate_url)
            .await?;

        if !response.is_success() {
            return Err(AcmeError::acme_request_failed(
                response.status,
                certificate_url.to_string(),
                response.text().unwrap_or_default(),
            ));
        }
        response.text()
    }
}

fn next_backoff(current: Duration) -> Duration {
    let scaled = current.mul_f64(POLL_BACKOFF_MULTIPLIER);
    scaled.min(POLL_MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_by_the_spec_multiplier_and_saturates() {
        let mut delay = POLL_INITIAL_DELAY;
        assert_eq!(delay, Duration::from_secs(2));
        delay = next_backoff(delay);
        assert_eq!(delay, Duration::from_millis(3400));
        delay = next_backoff(delay);
        assert_eq!(delay, Duration::from_millis(5780));

        let mut long_running = Duration::from_secs(9);
        for _ in 0..5 {
            long_running = next_backoff(long_running);
        }
        assert_eq!(long_running, POLL_MAX_DELAY);
    }
}
