/// Account key persistence: the ECDSA P-256 key pair that signs every
/// request to the CA, stored as PKCS#8 so an account can be reloaded across
/// process restarts instead of re-registered.
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::keypair::EcdsaP256KeyPair;
use crate::error::Result;
use crate::protocol::jwk::Jwk;

pub struct KeyPair(pub EcdsaP256KeyPair);

impl KeyPair {
    pub fn generate() -> Result<Self> {
        Ok(Self(EcdsaP256KeyPair::generate()?))
    }

    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        Ok(Self(EcdsaP256KeyPair::from_pkcs8_der(der)?))
    }

    pub fn pkcs8_der(&self) -> &[u8] {
        self.0.pkcs8_der()
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.0.pkcs8_der())?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let der = fs::read(path)?;
        Self::from_pkcs8_der(&der)
    }

    pub fn public_coordinates(&self) -> Result<([u8; 32], [u8; 32])> {
        self.0.public_coordinates()
    }
}

/// The KV record for a registered account: one per `directory_url`, keyed
/// by `storage::keys::account_key`. Created once, reused indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAccount {
    pub directory_url: String,
    /// Account location URL (the "kid" used to sign subsequent requests).
    pub kid: String,
    /// Base64-standard encoded PKCS#8 private key.
    pub jwk_private: String,
    pub jwk_public: Jwk,
}

impl StoredAccount {
    pub fn new(directory_url: impl Into<String>, kid: impl Into<String>, key_pair: &KeyPair) -> Result<Self> {
        let (x, y) = key_pair.public_coordinates()?;
        Ok(Self {
            directory_url: directory_url.into(),
            kid: kid.into(),
            jwk_private: BASE64_STANDARD.encode(key_pair.pkcs8_der()),
            jwk_public: Jwk::from_p256_coordinates(&x, &y),
        })
    }

    pub fn key_pair(&self) -> Result<KeyPair> {
        let der = BASE64_STANDARD
            .decode(&self.jwk_private)
            .map_err(|e| crate::error::AcmeError::storage(format!("malformed stored account key: {}", e)))?;
        KeyPair::from_pkcs8_der(&der)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_a_usable_key() {
        assert!(KeyPair::generate().is_ok());
    }

    #[test]
    fn pkcs8_round_trips_through_a_file() {
        let dir = std::env::temp_dir().join(format!("acmex-test-key-{:x}", std::process::id()));
        let key = KeyPair::generate().unwrap();
        key.save_to_file(&dir).unwrap();

        let reloaded = KeyPair::load_from_file(&dir).unwrap();
        assert_eq!(
            key.public_coordinates().unwrap(),
            reloaded.public_coordinates().unwrap()
        );

        let _ = std::fs::remove_file(&dir);
    }

    #[test]
    fn stored_account_round_trips_through_json() {
        let key_pair = KeyPair::generate().unwrap();
        let stored = StoredAccount::new("https://example.com/directory", "https://example.com/acct/1", &key_pair).unwrap();

        let json = serde_json::to_vec(&stored).unwrap();
        let reloaded: StoredAccount = serde_json::from_slice(&json).unwrap();

        assert_eq!(reloaded.kid, "https://example.com/acct/1");
        let reloaded_key = reloaded.key_pair().unwrap();
        assert_eq!(
            key_pair.public_coordinates().unwrap(),
            reloaded_key.public_coordinates().unwrap()
        );
    }
}
