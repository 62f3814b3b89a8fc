use crate::config::Config;
use crate::error::{AcmeError, Result};
use crate::storage::{build_backend, CertificateStore};

pub async fn handle_cert_show(config: &Config, domain: &str) -> Result<()> {
    let backend = build_backend(&config.storage)?;
    let store = CertificateStore::new(backend);

    let cert = store
        .load_cert(domain)
        .await?
        .ok_or_else(|| AcmeError::not_found(format!("no cached certificate for {}", domain)))?;

    println!("domain:     {}", cert.domain);
    println!("provider:   {}", cert.provider);
    println!("not_after:  {}", cert.not_after_iso);
    println!("updated_at: {}", cert.updated_at_iso);
    println!("{}", cert.cert_pem);
    Ok(())
}
