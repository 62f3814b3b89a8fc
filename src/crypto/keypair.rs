//! ECDSA P-256 key pair generation and JWK export for the ACME account key.
//!
//! The account key signs every request to the CA (JWS ES256) and is
//! persisted as PKCS#8 so the account can be reused across process restarts.
//! The TLS key pair used for the certificate itself is generated separately
//! by [`crate::order::csr`], which needs an `rcgen::KeyPair` rather than this
//! signing-oriented wrapper.

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{self, EcdsaKeyPair, KeyPair as _};

use crate::error::{AcmeError, Result};

/// ECDSA P-256 key type marker, kept for API symmetry with the teacher's
/// original multi-algorithm `KeyType` even though ECDSA P-256 is the only
/// algorithm this crate generates keys for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    EcdsaP256,
}

impl KeyType {
    pub fn jwa_algorithm(&self) -> &'static str {
        "ES256"
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ECDSA-P256")
    }
}

/// An ECDSA P-256 key pair used to sign ACME JWS requests.
///
/// Wraps `aws_lc_rs::signature::EcdsaKeyPair` configured for
/// `ECDSA_P256_SHA256_ASN1_SIGNING`, which produces a DER-encoded signature;
/// the DER->JOSE conversion in [`crate::crypto::signer`] is what turns that
/// into the 64-byte `r||s` form JWS requires.
pub struct EcdsaP256KeyPair {
    pkcs8_der: Vec<u8>,
    inner: EcdsaKeyPair,
}

impl EcdsaP256KeyPair {
    /// Generate a fresh key pair.
    pub fn generate() -> Result<Self> {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&signature::ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
            .map_err(|e| AcmeError::crypto(format!("failed to generate ECDSA P-256 key: {}", e)))?;
        Self::from_pkcs8_der(pkcs8.as_ref())
    }

    /// Load a key pair previously persisted as PKCS#8 DER.
    pub fn from_pkcs8_der(pkcs8_der: &[u8]) -> Result<Self> {
        let rng = SystemRandom::new();
        let inner = EcdsaKeyPair::from_pkcs8(
            &signature::ECDSA_P256_SHA256_ASN1_SIGNING,
            pkcs8_der,
            &rng,
        )
        .map_err(|e| AcmeError::crypto(format!("invalid ECDSA P-256 PKCS#8 key: {}", e)))?;

        Ok(Self {
            pkcs8_der: pkcs8_der.to_vec(),
            inner,
        })
    }

    /// PKCS#8 DER bytes, for persistence in the account store.
    pub fn pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }

    /// Sign `data`, returning a DER-encoded ECDSA signature (two ASN.1
    /// INTEGERs). Callers needing the JOSE `r||s` form must run the result
    /// through [`crate::crypto::signer::der_to_jose_signature`].
    pub fn sign_der(&self, data: &[u8]) -> Result<Vec<u8>> {
        let rng = SystemRandom::new();
        let sig = self
            .inner
            .sign(&rng, data)
            .map_err(|e| AcmeError::crypto(format!("ECDSA signing failed: {}", e)))?;
        Ok(sig.as_ref().to_vec())
    }

    /// The uncompressed SEC1 public key point (0x04 || x(32) || y(32)).
    fn public_key_point(&self) -> Result<[u8; 65]> {
        let raw = self.inner.public_key().as_ref();
        if raw.len() != 65 || raw[0] != 0x04 {
            return Err(AcmeError::crypto(
                "unexpected public key encoding: expected uncompressed P-256 point",
            ));
        }
        let mut out = [0u8; 65];
        out.copy_from_slice(raw);
        Ok(out)
    }

    /// The public key's x and y coordinates, 32 bytes each.
    pub fn public_coordinates(&self) -> Result<([u8; 32], [u8; 32])> {
        let point = self.public_key_point()?;
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&point[1..33]);
        y.copy_from_slice(&point[33..65]);
        Ok((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_reload_roundtrips() {
        let key = EcdsaP256KeyPair::generate().unwrap();
        let reloaded = EcdsaP256KeyPair::from_pkcs8_der(key.pkcs8_der()).unwrap();
        assert_eq!(
            key.public_coordinates().unwrap(),
            reloaded.public_coordinates().unwrap()
        );
    }

    #[test]
    fn sign_produces_der_signature() {
        let key = EcdsaP256KeyPair::generate().unwrap();
        let sig = key.sign_der(b"signing input").unwrap();
        // A DER ECDSA-P256 signature starts with a SEQUENCE tag.
        assert_eq!(sig[0], 0x30);
    }
}
