/// JSON Web Key (JWK) implementation for ACME, restricted to the EC P-256
/// keys this crate generates and signs with.
use crate::error::{AcmeError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// An EC P-256 public key in JWK form, as embedded in a JWS protected
/// header or used to compute a thumbprint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
}

impl Jwk {
    /// Build a JWK from raw P-256 coordinates.
    pub fn from_p256_coordinates(x: &[u8; 32], y: &[u8; 32]) -> Self {
        Self {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
            use_: Some("sig".to_string()),
        }
    }

    /// RFC 7638 JWK thumbprint: SHA-256 of the canonical JSON
    /// `{"crv":"P-256","kty":"EC","x":"…","y":"…"}`, members in that exact
    /// lexicographic order with no whitespace. Built by explicit string
    /// construction rather than a map, so member order cannot drift with a
    /// serde_json implementation detail.
    pub fn thumbprint_sha256(&self) -> Result<String> {
        if self.kty != "EC" || self.crv != "P-256" {
            return Err(AcmeError::malformed_jwk(format!(
                "unsupported key type for thumbprint: kty={} crv={}",
                self.kty, self.crv
            )));
        }

        let canonical = format!(
            r#"{{"crv":"{}","kty":"{}","x":"{}","y":"{}"}}"#,
            self.crv, self.kty, self.x, self.y
        );

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }

    /// Convert to JSON, for embedding in a JWS protected header.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Base64url of the canonical JSON representation, as EAB payloads use.
    pub fn to_base64url_json(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_jwk() -> Jwk {
        Jwk {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: "WKn-ZIGevcwGIyyrzFoZNBdaq9_TsqzGl96oc0CWuis".to_string(),
            y: "y8lrnvOohSs2gksT69r56Fq3MZ_yCjL8MyCvD94PoWU".to_string(),
            use_: Some("sig".to_string()),
        }
    }

    #[test]
    fn thumbprint_is_stable_base64url() {
        let jwk = sample_jwk();
        let thumbprint = jwk.thumbprint_sha256().unwrap();
        assert!(!thumbprint.is_empty());
        assert!(thumbprint
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn thumbprint_is_deterministic_across_field_construction_order() {
        // Two JWKs with identical values but constructed via different
        // struct-literal field order must produce the same thumbprint,
        // since the canonical string is built explicitly rather than
        // derived from struct/derive field order.
        let a = sample_jwk();
        let b = Jwk {
            use_: Some("sig".to_string()),
            y: a.y.clone(),
            x: a.x.clone(),
            crv: a.crv.clone(),
            kty: a.kty.clone(),
        };
        assert_eq!(a.thumbprint_sha256().unwrap(), b.thumbprint_sha256().unwrap());
    }

    #[test]
    fn from_coordinates_roundtrips_into_jwk() {
        let x = [0xAAu8; 32];
        let y = [0xBBu8; 32];
        let jwk = Jwk::from_p256_coordinates(&x, &y);
        assert_eq!(jwk.kty, "EC");
        assert_eq!(jwk.crv, "P-256");
        assert!(!jwk.thumbprint_sha256().unwrap().is_empty());
    }

    #[test]
    fn rejects_thumbprint_for_non_ec_key() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            crv: String::new(),
            x: String::new(),
            y: String::new(),
            use_: None,
        };
        assert!(jwk.thumbprint_sha256().is_err());
    }
}
