//! Issuance orchestrator: ties the account, order, and DNS layers together
//! into `obtain_or_renew`, the crate's one load-bearing entry point.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::account::{AccountManager, ExternalAccountBinding, KeyPair, StoredAccount};
use crate::config::{CaProviderConfig, Config};
use crate::crypto::hash::Sha256Hash;
use crate::dns::{dns01_record_name, DnsProvider};
use crate::error::{AcmeError, Result};
use crate::metrics::MetricsRegistry;
use crate::order::{
    certificate_not_after_unix, generate_csr_der, generate_tls_key_pair, key_pair_to_pkcs8_pem,
    parse_certificate_chain, NewOrderRequest, OrderManager,
};
use crate::protocol::{DirectoryManager, NonceManager};
use crate::storage::{CachedCert, CertificateStore, StorageBackend};
use crate::transport::HttpClient;
use crate::types::Contact;

/// The result of `obtain_or_renew`: a certificate ready to serve, plus
/// whether it came from cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCertificate {
    pub domain: String,
    pub cert_pem: String,
    pub key_pem: String,
    pub not_after_iso: String,
    pub provider: String,
    pub cached: bool,
}

/// Owns everything needed to obtain or renew certificates for any number
/// of domains against a declared, ordered list of CA providers.
pub struct IssuanceOrchestrator<B: StorageBackend> {
    providers: Vec<CaProviderConfig>,
    contact: Option<Contact>,
    include_apex_with_wildcard: bool,
    renew_before_days: u32,
    dns_propagation: Duration,
    store: CertificateStore<B>,
    dns_provider: Arc<dyn DnsProvider>,
    http_client: HttpClient,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<B: StorageBackend> IssuanceOrchestrator<B> {
    pub fn new(config: &Config, store: CertificateStore<B>, dns_provider: Arc<dyn DnsProvider>) -> Result<Self> {
        Ok(Self {
            providers: config.acme.providers.clone(),
            contact: config.acme.contact.as_ref().map(|email| Contact::email(email.clone())),
            include_apex_with_wildcard: config.acme.include_apex_with_wildcard,
            renew_before_days: config.renewal.renew_before_days,
            dns_propagation: config.dns_propagation_wait(),
            store,
            dns_provider,
            http_client: HttpClient::with_defaults()?,
            metrics: None,
        })
    }

    /// Attach a metrics registry; issuance attempts and cache hits are
    /// recorded against it from then on.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Return a cached certificate if it still has enough life left,
    /// otherwise obtain a fresh one from the first provider that succeeds.
    pub async fn obtain_or_renew(&self, domain: &str) -> Result<IssuedCertificate> {
        let domain = domain.to_ascii_lowercase();

        if let Some(metrics) = &self.metrics {
            metrics.requests_total.inc();
        }

        if let Some(cached) = self.store.load_cert(&domain).await? {
            if let Ok(not_after) = cached.not_after_iso.parse::<jiff::Timestamp>() {
                let now = jiff::Timestamp::now();
                let days_left = CachedCert::days_until(not_after.as_millisecond(), now.as_millisecond());
                if days_left >= self.renew_before_days as i64 {
                    if let Some(metrics) = &self.metrics {
                        metrics.cache_hits_total.inc();
                    }
                    return Ok(IssuedCertificate {
                        domain,
                        cert_pem: cached.cert_pem,
                        key_pem: cached.key_pem,
                        not_after_iso: cached.not_after_iso,
                        provider: cached.provider,
                        cached: true,
                    });
                }
            }
        }

        if self.providers.is_empty() {
            return Err(AcmeError::configuration("no CA providers configured"));
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            match self.issue_with_provider(provider, &domain).await {
                Ok(issued) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.issuances_total.with_label_values(&[&provider.name, "success"]).inc();
                    }
                    let record = CachedCert {
                        domain: domain.clone(),
                        cert_pem: issued.cert_pem.clone(),
                        key_pem: issued.key_pem.clone(),
                        not_after_iso: issued.not_after_iso.clone(),
                        provider: issued.provider.clone(),
                        updated_at_iso: jiff::Timestamp::now().to_string(),
                    };
                    self.store.save_cert(&record).await?;
                    return Ok(issued);
                }
                Err(e) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.issuances_total.with_label_values(&[&provider.name, "failure"]).inc();
                    }
                    tracing::warn!(provider = %provider.name, domain = %domain, error = %e, "issuance attempt failed");
                    failures.push(format!("{}: {}", provider.name, e));
                }
            }
        }

        Err(AcmeError::all_providers_failed(failures))
    }

    async fn issue_with_provider(&self, provider: &CaProviderConfig, domain: &str) -> Result<IssuedCertificate> {
        let span = tracing::info_span!("issue_with_provider", domain = %domain, provider = %provider.name);
        let _guard = span.enter();

        let directory_manager = DirectoryManager::new(provider.directory_url.clone(), self.http_client.clone());
        let directory = directory_manager.get().await?;
        let nonce_manager = NonceManager::new(directory.new_nonce.clone(), self.http_client.clone());

        let key_pair = self.load_or_generate_account_key(provider).await?;
        let account_manager = AccountManager::new(&key_pair, &nonce_manager, &directory_manager, &self.http_client)?;
        let account_id = self.load_or_register_account(provider, &key_pair, &account_manager).await?;

        let identifiers = build_identifiers(domain, self.include_apex_with_wildcard);
        let order_manager = OrderManager::new(&account_manager, &directory_manager, account_id);
        let (order_url, order) = order_manager.create_order(&NewOrderRequest::new(identifiers.clone())).await?;

        let zone_base = domain.strip_prefix("*.").unwrap_or(domain);
        let zone_id = self.dns_provider.resolve_zone_id(zone_base).await?;

        for authz_url in &order.authorizations {
            self.complete_authorization(&order_manager, &account_manager, &zone_id, authz_url)
                .await?;
        }

        let tls_key_pair = generate_tls_key_pair()?;
        let csr_der = generate_csr_der(&identifiers, &tls_key_pair)?;

        order_manager.finalize_order(&order.finalize, &csr_der).await?;
        let valid_order = order_manager.poll_order_valid(&order_url).await?;

        let certificate_url = valid_order
            .certificate
            .ok_or_else(|| AcmeError::protocol("order reached valid without a certificate URL"))?;
        let cert_pem = order_manager.download_certificate(&certificate_url).await?;
        let key_pem = key_pair_to_pkcs8_pem(&tls_key_pair);

        let chain = parse_certificate_chain(&cert_pem)?;
        let not_after_unix = certificate_not_after_unix(&chain[0])?;
        let not_after_iso = jiff::Timestamp::from_second(not_after_unix)
            .map_err(|e| AcmeError::certificate(format!("certificate notAfter out of range: {}", e)))?
            .to_string();

        Ok(IssuedCertificate {
            domain: domain.to_string(),
            cert_pem,
            key_pem,
            not_after_iso,
            provider: provider.name.clone(),
            cached: false,
        })
    }

    /// Set the TXT record, wait for propagation, respond to the challenge,
    /// and poll to a terminal status - always attempting TXT cleanup, even
    /// when the challenge or poll itself fails.
    async fn complete_authorization(
        &self,
        order_manager: &OrderManager<'_>,
        account_manager: &AccountManager<'_>,
        zone_id: &str,
        authz_url: &str,
    ) -> Result<()> {
        let authorization = order_manager.get_authorization(authz_url).await?;
        let challenge = order_manager.select_dns01_challenge(&authorization)?;
        let challenge_url = challenge.url.clone();

        let key_authorization = account_manager.compute_key_authorization(&challenge.token)?;
        let txt_value = dns01_txt_value(&key_authorization)?;
        let record_name = dns01_record_name(&authorization.identifier.value);

        let record = self.dns_provider.create_txt_record(zone_id, &record_name, &txt_value).await?;

        if !self.dns_propagation.is_zero() {
            tokio::time::sleep(self.dns_propagation).await;
        }

        let outcome = async {
            order_manager.respond_to_challenge(&challenge_url).await?;
            order_manager.poll_authorization_valid(authz_url).await
        }
        .await;

        if record.created {
            if let Err(e) = self.dns_provider.delete_record(zone_id, &record.id).await {
                tracing::warn!(zone_id = %zone_id, record_id = %record.id, error = %e, "failed to delete TXT record");
            }
        }

        outcome.map(|_| ())
    }

    async fn load_or_generate_account_key(&self, provider: &CaProviderConfig) -> Result<KeyPair> {
        if let Some(stored) = self.store.load_account(&provider.directory_url).await? {
            return stored.key_pair();
        }
        KeyPair::generate()
    }

    async fn load_or_register_account(
        &self,
        provider: &CaProviderConfig,
        key_pair: &KeyPair,
        account_manager: &AccountManager<'_>,
    ) -> Result<String> {
        if let Some(stored) = self.store.load_account(&provider.directory_url).await? {
            if !stored.kid.is_empty() {
                return Ok(stored.kid);
            }
        }

        let contacts: Vec<Contact> = self.contact.iter().cloned().collect();
        let eab = match &provider.eab {
            Some(eab_config) => Some(ExternalAccountBinding {
                key_id: eab_config.kid.clone(),
                hmac_key: crate::crypto::encoding::Base64Encoding::decode(&eab_config.hmac_key_base64url)?,
            }),
            None => None,
        };

        let account = account_manager.register(&contacts, true, eab.as_ref()).await?;
        let stored_account = StoredAccount::new(provider.directory_url.clone(), account.id.clone(), key_pair)?;
        self.store.save_account(&stored_account).await?;

        Ok(account.id)
    }
}

/// `[domain]`, or `[domain, apex(domain)]` when `domain` is a wildcard and
/// apex pairing is enabled. `domain` must already be lower-cased.
fn build_identifiers(domain: &str, include_apex_with_wildcard: bool) -> Vec<String> {
    match domain.strip_prefix("*.") {
        Some(apex) if include_apex_with_wildcard => vec![domain.to_string(), apex.to_string()],
        _ => vec![domain.to_string()],
    }
}

/// `base64url(SHA-256(key_authorization))`, the DNS-01 TXT record value.
fn dns01_txt_value(key_authorization: &str) -> Result<String> {
    let digest = Sha256Hash::hash(key_authorization.as_bytes())?;
    Ok(URL_SAFE_NO_PAD.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_identifiers_pairs_apex_with_wildcard_when_enabled() {
        assert_eq!(
            build_identifiers("*.example.com", true),
            vec!["*.example.com".to_string(), "example.com".to_string()]
        );
        assert_eq!(build_identifiers("*.example.com", false), vec!["*.example.com".to_string()]);
        assert_eq!(build_identifiers("example.com", true), vec!["example.com".to_string()]);
    }

    #[test]
    fn dns01_txt_value_is_stable_and_url_safe() {
        let value = dns01_txt_value("token123.thumbprintabc").unwrap();
        assert!(!value.contains('+'));
        assert!(!value.contains('/'));
        assert_eq!(value, dns01_txt_value("token123.thumbprintabc").unwrap());
    }
}
