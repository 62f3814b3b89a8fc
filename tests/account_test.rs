mod common;

use acmex::prelude::*;
use acmex::transport::HttpClient;
use common::MockAcmeServer;

#[tokio::test]
async fn test_full_account_lifecycle() -> Result<()> {
    let mut mock_server = MockAcmeServer::new().await;
    let _m_dir = mock_server.mock_directory().await;
    let _m_nonce = mock_server.mock_new_nonce().await;
    let _m_account = mock_server.mock_new_account().await;

    let http_client = HttpClient::with_defaults()?;
    let directory_manager = DirectoryManager::new(format!("{}/directory", mock_server.url()), http_client.clone());
    let directory = directory_manager.get().await?;
    let nonce_manager = NonceManager::new(directory.new_nonce.clone(), http_client.clone());

    let key_pair = KeyPair::generate()?;
    let account_manager = AccountManager::new(&key_pair, &nonce_manager, &directory_manager, &http_client)?;

    let account = account_manager.register(&[Contact::email("admin@example.com")], true, None).await?;

    assert_eq!(account.status, "valid");
    assert_eq!(account.id, format!("{}/account/1", mock_server.url()));

    Ok(())
}
