use crate::config::Config;
use crate::error::Result;
use crate::storage::{build_backend, CertificateStore};

pub async fn handle_account_show(config: &Config) -> Result<()> {
    let backend = build_backend(&config.storage)?;
    let store = CertificateStore::new(backend);

    for provider in &config.acme.providers {
        match store.load_account(&provider.directory_url).await? {
            Some(account) => println!("{}: {} (kid={})", provider.name, provider.directory_url, account.kid),
            None => println!("{}: {} (no account yet)", provider.name, provider.directory_url),
        }
    }
    Ok(())
}
