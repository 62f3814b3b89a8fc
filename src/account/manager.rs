/// ACME account lifecycle: registration (with optional External Account
/// Binding), lookup, contact updates, and deactivation.
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AcmeError, Result};
use crate::protocol::jws::sign_external_account_binding;
use crate::protocol::{DirectoryManager, Jwk, JwsSigner, NonceManager};
use crate::transport::HttpClient;
use crate::types::Contact;

use super::credentials::KeyPair;

/// An ACME account as returned by the CA (RFC 8555 §7.1.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Populated from the `Location` header, not the response body.
    #[serde(default)]
    pub id: String,

    pub status: String,

    #[serde(default)]
    pub contact: Vec<String>,

    #[serde(rename = "termsOfServiceAgreed", default)]
    pub terms_of_service_agreed: bool,

    #[serde(default)]
    pub orders: Option<String>,
}

/// CA-issued credentials used to bind a new ACME account to an existing,
/// out-of-band-authenticated identity (RFC 8555 §7.3.4).
#[derive(Debug, Clone)]
pub struct ExternalAccountBinding {
    pub key_id: String,
    pub hmac_key: Vec<u8>,
}

/// Owns the account key and signs every request on its behalf. Order
/// management, which needs the same signing identity, borrows this rather
/// than duplicating it.
pub struct AccountManager<'a> {
    pub(crate) key_pair: &'a KeyPair,
    pub(crate) signer: JwsSigner<'a>,
    pub(crate) jwk: Jwk,
    pub(crate) nonce_manager: &'a NonceManager,
    pub(crate) directory_manager: &'a DirectoryManager,
    pub(crate) http_client: &'a HttpClient,
}

impl<'a> AccountManager<'a> {
    pub fn new(
        key_pair: &'a KeyPair,
        nonce_manager: &'a NonceManager,
        directory_manager: &'a DirectoryManager,
        http_client: &'a HttpClient,
    ) -> Result<Self> {
        let (x, y) = key_pair.public_coordinates()?;
        let jwk = Jwk::from_p256_coordinates(&x, &y);
        let signer = JwsSigner::new(&key_pair.0);

        Ok(Self {
            key_pair,
            signer,
            jwk,
            nonce_manager,
            directory_manager,
            http_client,
        })
    }

    /// Register a new account, optionally bound to `eab`.
    pub async fn register(
        &self,
        contacts: &[Contact],
        terms_of_service_agreed: bool,
        eab: Option<&ExternalAccountBinding>,
    ) -> Result<Account> {
        let directory = self.directory_manager.get().await?;
        let nonce = self.nonce_manager.get_nonce().await?;

        let header = json!({
            "alg": "ES256",
            "jwk": self.jwk.to_value(),
            "nonce": nonce,
            "url": directory.new_account,
        });

        let mut payload = json!({
            "termsOfServiceAgreed": terms_of_service_agreed,
            "contact": contacts.iter().map(Contact::to_uri).collect::<Vec<_>>(),
        });

        if let Some(eab) = eab {
            let eab_jws = sign_external_account_binding(
                &eab.hmac_key,
                &eab.key_id,
                &directory.new_account,
                &self.jwk,
            )?;
            payload["externalAccountBinding"] = serde_json::to_value(eab_jws)?;
        }

        let response = self.post_signed(&directory.new_account, header, &payload).await?;

        if !response.is_success() {
            return Err(AcmeError::acme_request_failed(
                response.status,
                directory.new_account.clone(),
                response.text().unwrap_or_default(),
            ));
        }

        let account_url = response
            .header("location")
            .ok_or_else(|| AcmeError::protocol("new-account response missing Location header"))?
            .to_string();

        let mut account: Account = response.json()?;
        account.id = account_url;
        Ok(account)
    }

    /// Look up an existing account bound to this key without creating one.
    /// Returns `None` if the CA reports `accountDoesNotExist`.
    pub async fn find_existing(&self) -> Result<Option<Account>> {
        let directory = self.directory_manager.get().await?;
        let nonce = self.nonce_manager.get_nonce().await?;

        let header = json!({
            "alg": "ES256",
            "jwk": self.jwk.to_value(),
            "nonce": nonce,
            "url": directory.new_account,
        });
        let payload = json!({ "onlyReturnExisting": true });

        let response = self.post_signed(&directory.new_account, header, &payload).await?;

        if response.status == 400 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(AcmeError::acme_request_failed(
                response.status,
                directory.new_account.clone(),
                response.text().unwrap_or_default(),
            ));
        }

        let account_url = response
            .header("location")
            .ok_or_else(|| AcmeError::protocol("account lookup response missing Location header"))?
            .to_string();
        let mut account: Account = response.json()?;
        account.id = account_url;
        Ok(Some(account))
    }

    pub async fn update_contacts(&self, account_id: &str, contacts: &[Contact]) -> Result<Account> {
        let payload = json!({
            "contact": contacts.iter().map(Contact::to_uri).collect::<Vec<_>>(),
        });
        let response = self.post_signed_with_kid(account_id, account_id, &payload).await?;
        self.parse_account(response, account_id)
    }

    pub async fn get_account(&self, account_id: &str) -> Result<Account> {
        let response = self
            .post_signed_with_kid(account_id, account_id, &json!({}))
            .await?;
        self.parse_account(response, account_id)
    }

    pub async fn deactivate(&self, account_id: &str) -> Result<Account> {
        let payload = json!({ "status": "deactivated" });
        let response = self.post_signed_with_kid(account_id, account_id, &payload).await?;
        self.parse_account(response, account_id)
    }

    fn parse_account(&self, response: crate::transport::http_client::HttpResponse, account_id: &str) -> Result<Account> {
        if !response.is_success() {
            return Err(AcmeError::acme_request_failed(
                response.status,
                account_id.to_string(),
                response.text().unwrap_or_default(),
            ));
        }
        let mut account: Account = response.json()?;
        account.id = account_id.to_string();
        Ok(account)
    }

    /// `base64url(SHA256(token || '.' || jwk_thumbprint))`, the DNS-01 TXT
    /// record value (RFC 8555 §8.4).
    pub fn compute_key_authorization(&self, token: &str) -> Result<String> {
        let thumbprint = self.jwk.thumbprint_sha256()?;
        Ok(format!("{}.{}", token, thumbprint))
    }

    pub fn jwk_thumbprint(&self) -> Result<String> {
        self.jwk.thumbprint_sha256()
    }

    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }

    pub fn signer(&self) -> &JwsSigner<'a> {
        &self.signer
    }

    /// POST a fresh JWK-authenticated request (only used before an account
    /// id exists), caching the response's replay nonce for the next call.
    async fn post_signed(
        &self,
        url: &str,
        header: Value,
        payload: &Value,
    ) -> Result<crate::transport::http_client::HttpResponse> {
        let jws = self.signer.sign(&header, payload)?;
        let response = self
            .http_client
            .post_json_with_retry(url, "application/jose+json", &jws)
            .await?;
        self.nonce_manager.update_from_header(response.header("replay-nonce")).await;
        Ok(response)
    }

    /// POST a `kid`-authenticated request against an existing account.
    pub(crate) async fn post_signed_with_kid(
        &self,
        kid: &str,
        url: &str,
        payload: &Value,
    ) -> Result<crate::transport::http_client::HttpResponse> {
        let nonce = self.nonce_manager.get_nonce().await?;
        let header = json!({
            "alg": "ES256",
            "kid": kid,
            "nonce": nonce,
            "url": url,
        });
        self.post_signed(url, header, payload).await
    }

    /// POST-as-GET (RFC 8555 §6.3): `kid`-authenticated, empty payload.
    pub(crate) async fn post_as_get(
        &self,
        kid: &str,
        url: &str,
    ) -> Result<crate::transport::http_client::HttpResponse> {
        let nonce = self.nonce_manager.get_nonce().await?;
        let header = json!({
            "alg": "ES256",
            "kid": kid,
            "nonce": nonce,
            "url": url,
        });
        let jws = self.signer.sign_post_as_get(&header)?;
        let response = self
            .http_client
            .post_json_with_retry(url, "application/jose+json", &jws)
            .await?;
        self.nonce_manager.update_from_header(response.header("replay-nonce")).await;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_parses_from_json() {
        let json = r#"{
            "status": "valid",
            "contact": ["mailto:admin@example.com"],
            "termsOfServiceAgreed": true,
            "orders": "https://example.com/acme/acct/123/orders"
        }"#;

        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.status, "valid");
        assert_eq!(account.contact.len(), 1);
        assert!(account.terms_of_service_agreed);
    }

    #[test]
    fn key_authorization_joins_token_and_thumbprint_with_a_dot() {
        let key_pair = KeyPair::generate().unwrap();
        let nonce_manager = NonceManager::new(
            "https://example.com/acme/new-nonce",
            HttpClient::with_defaults().unwrap(),
        );
        let directory_manager =
            DirectoryManager::new("https://example.com/directory", HttpClient::with_defaults().unwrap());
        let http_client = HttpClient::with_defaults().unwrap();

        let manager = AccountManager::new(&key_pair, &nonce_manager, &directory_manager, &http_client).unwrap();
        let key_auth = manager.compute_key_authorization("token123").unwrap();
        let mut parts = key_auth.split('.');
        assert_eq!(parts.next(), Some("token123"));
        assert!(parts.next().is_some());
        assert!(parts.next().is_none());
    }
}
