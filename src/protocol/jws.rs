/// JWS (JSON Web Signature) ES256 signing for ACME requests.
///
/// ACME (RFC 8555 §6.2) uses the JSON serialization of a JWS, not the
/// dot-joined compact form: the wire body is
/// `{"protected": "...", "payload": "...", "signature": "..."}`, each
/// member itself base64url-encoded. [`JwsMessage`] models exactly that.
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use crate::crypto::keypair::EcdsaP256KeyPair;
use crate::crypto::signer::{der_to_jose_signature, HmacSigner, Signer};
use crate::error::Result;
use crate::protocol::jwk::Jwk;

/// A signed ACME request body, ready to POST as
/// `Content-Type: application/jose+json`.
#[derive(Debug, Clone, Serialize)]
pub struct JwsMessage {
    pub protected: String,
    pub payload: String,
    pub signature: String,
}

/// Signs ACME request bodies with a single ECDSA P-256 account key.
pub struct JwsSigner<'a> {
    key_pair: &'a EcdsaP256KeyPair,
}

impl<'a> JwsSigner<'a> {
    pub fn new(key_pair: &'a EcdsaP256KeyPair) -> Self {
        Self { key_pair }
    }

    /// Sign `payload` under `protected_header`. `payload` is JSON-serialised
    /// then base64url-encoded.
    pub fn sign(&self, protected_header: &Value, payload: &Value) -> Result<JwsMessage> {
        let payload_json = serde_json::to_vec(payload)?;
        self.sign_raw_payload(protected_header, &payload_json)
    }

    /// Sign a POST-AS-GET request: the payload is the empty string, per
    /// RFC 8555 §6.3.
    pub fn sign_post_as_get(&self, protected_header: &Value) -> Result<JwsMessage> {
        self.sign_raw_payload(protected_header, b"")
    }

    fn sign_raw_payload(&self, protected_header: &Value, payload: &[u8]) -> Result<JwsMessage> {
        let protected_json = serde_json::to_vec(protected_header)?;
        let protected_b64 = URL_SAFE_NO_PAD.encode(&protected_json);
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);

        let signing_input = format!("{}.{}", protected_b64, payload_b64);
        let der_signature = self.key_pair.sign_der(signing_input.as_bytes())?;
        let jose_signature = der_to_jose_signature(&der_signature)?;

        Ok(JwsMessage {
            protected: protected_b64,
            payload: payload_b64,
            signature: URL_SAFE_NO_PAD.encode(jose_signature),
        })
    }

    pub fn key_pair(&self) -> &EcdsaP256KeyPair {
        self.key_pair
    }
}

/// Sign the External Account Binding inner JWS (RFC 8555 §7.3.4): HS256
/// over the account's public JWK, keyed by the CA-issued HMAC key and
/// identified by the CA-issued key id. Unlike the outer JWS this is never
/// a `Result<EcdsaP256KeyPair>` signature - the MAC key comes straight from
/// configuration.
pub fn sign_external_account_binding(
    hmac_key: &[u8],
    eab_key_id: &str,
    new_account_url: &str,
    account_jwk: &Jwk,
) -> Result<JwsMessage> {
    let protected = serde_json::json!({
        "alg": "HS256",
        "kid": eab_key_id,
        "url": new_account_url,
    });
    let protected_json = serde_json::to_vec(&protected)?;
    let protected_b64 = URL_SAFE_NO_PAD.encode(&protected_json);

    let payload_json = serde_json::to_vec(&account_jwk.to_value())?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(&payload_json);

    let signing_input = format!("{}.{}", protected_b64, payload_b64);
    let tag = HmacSigner::sha256(hmac_key.to_vec()).sign(signing_input.as_bytes())?;

    Ok(JwsMessage {
        protected: protected_b64,
        payload: payload_b64,
        signature: URL_SAFE_NO_PAD.encode(tag.data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keypair::EcdsaP256KeyPair;

    #[test]
    fn sign_produces_three_base64url_members() {
        let key_pair = EcdsaP256KeyPair::generate().unwrap();
        let signer = JwsSigner::new(&key_pair);

        let header = serde_json::json!({
            "alg": "ES256",
            "nonce": "test-nonce",
            "url": "https://example.com/acme/new-account"
        });
        let payload = serde_json::json!({ "termsOfServiceAgreed": true });

        let jws = signer.sign(&header, &payload).unwrap();

        assert!(URL_SAFE_NO_PAD.decode(&jws.protected).is_ok());
        assert!(URL_SAFE_NO_PAD.decode(&jws.payload).is_ok());
        let sig = URL_SAFE_NO_PAD.decode(&jws.signature).unwrap();
        assert_eq!(sig.len(), 64, "JOSE ES256 signature must be exactly 64 bytes");
    }

    #[test]
    fn external_account_binding_is_a_distinct_hs256_jws() {
        let jwk = Jwk::from_p256_coordinates(&[1u8; 32], &[2u8; 32]);
        let jws = sign_external_account_binding(
            b"eab-hmac-key-bytes",
            "kid-0001",
            "https://example.com/acme/new-account",
            &jwk,
        )
        .unwrap();

        let protected_json = URL_SAFE_NO_PAD.decode(&jws.protected).unwrap();
        let protected: Value = serde_json::from_slice(&protected_json).unwrap();
        assert_eq!(protected["alg"], "HS256");
        assert_eq!(protected["kid"], "kid-0001");

        let payload_json = URL_SAFE_NO_PAD.decode(&jws.payload).unwrap();
        let payload: Value = serde_json::from_slice(&payload_json).unwrap();
        assert_eq!(payload["kty"], "EC");
    }

    #[test]
    fn post_as_get_has_empty_payload() {
        let key_pair = EcdsaP256KeyPair::generate().unwrap();
        let signer = JwsSigner::new(&key_pair);

        let header = serde_json::json!({
            "alg": "ES256",
            "kid": "https://example.com/acme/acct/1",
            "nonce": "test-nonce",
            "url": "https://example.com/acme/order/1"
        });

        let jws = signer.sign_post_as_get(&header).unwrap();
        assert_eq!(jws.payload, "");
    }
}
