//! Signing primitives: HMAC-SHA-256 for External Account Binding, and the
//! DER -> JOSE (r||s) signature conversion JWS ES256 requires.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AcmeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// A signature produced by a [`Signer`], carrying the raw bytes and the
/// algorithm name that produced them.
#[derive(Debug, Clone)]
pub struct Signature {
    pub data: Vec<u8>,
    pub algorithm: String,
}

impl Signature {
    pub fn new(data: Vec<u8>, algorithm: String) -> Self {
        Self { data, algorithm }
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&self.data)
    }
}

/// Common interface over the signers this crate needs (HMAC today; kept as
/// a trait so additional MAC/signature schemes can be added without
/// touching call sites).
pub trait Signer: Send + Sync {
    fn sign(&self, data: &[u8]) -> Result<Signature>;
    fn algorithm(&self) -> &str;
}

/// HMAC-SHA-256 signer, used for the External Account Binding inner JWS.
pub struct HmacSigner {
    key: Vec<u8>,
    algorithm: String,
}

impl HmacSigner {
    pub fn new(key: Vec<u8>, algorithm: String) -> Self {
        Self { key, algorithm }
    }

    pub fn sha256(key: Vec<u8>) -> Self {
        Self::new(key, "HMAC-SHA256".to_string())
    }
}

impl Signer for HmacSigner {
    fn sign(&self, data: &[u8]) -> Result<Signature> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AcmeError::crypto(format!("invalid HMAC key: {}", e)))?;
        mac.update(data);
        let tag = mac.finalize().into_bytes().to_vec();
        Ok(Signature::new(tag, self.algorithm.clone()))
    }

    fn algorithm(&self) -> &str {
        &self.algorithm
    }
}

/// `hmacSha256SignBase64Url`: HMAC-SHA-256 over `data` with `key_b64url`
/// (base64url-decoded), base64url-encoded.
pub fn hmac_sha256_sign_base64url(key_b64url: &str, data: &[u8]) -> Result<String> {
    let key = super::encoding::Base64Encoding::decode(key_b64url)?;
    let signer = HmacSigner::sha256(key);
    Ok(signer.sign(data)?.to_base64())
}

/// Convert a DER-encoded ECDSA signature (`SEQUENCE { INTEGER r, INTEGER s }`)
/// into the 64-byte JOSE form (`r||s`, each left-padded to 32 bytes), as
/// required by JWS ES256. Strips a leading `0x00` sign byte from each
/// INTEGER before padding; fails if either integer is wider than 32 bytes
/// once that byte is stripped.
pub fn der_to_jose_signature(der: &[u8]) -> Result<[u8; 64]> {
    let (r, s) = parse_der_ecdsa_signature(der)?;
    let r = strip_leading_zero(r);
    let s = strip_leading_zero(s);

    if r.len() > 32 || s.len() > 32 {
        return Err(AcmeError::malformed_der_signature(
            "ECDSA signature component wider than 32 bytes",
        ));
    }

    let mut out = [0u8; 64];
    out[32 - r.len()..32].copy_from_slice(r);
    out[64 - s.len()..64].copy_from_slice(s);
    Ok(out)
}

fn strip_leading_zero(bytes: &[u8]) -> &[u8] {
    if bytes.len() > 1 && bytes[0] == 0x00 {
        &bytes[1..]
    } else {
        bytes
    }
}

/// Minimal DER parser for the two-INTEGER ECDSA signature shape. Does not
/// attempt to support general DER; only what `SEQUENCE { INTEGER, INTEGER }`
/// requires.
fn parse_der_ecdsa_signature(der: &[u8]) -> Result<(&[u8], &[u8])> {
    let err = || AcmeError::malformed_der_signature("not a valid DER ECDSA signature");

    if der.is_empty() || der[0] != 0x30 {
        return Err(err());
    }
    let (seq_len, mut pos) = read_der_length(der, 1).ok_or_else(err)?;
    if pos + seq_len != der.len() {
        return Err(err());
    }

    let (r, next) = read_der_integer(der, pos).ok_or_else(err)?;
    pos = next;
    let (s, next) = read_der_integer(der, pos).ok_or_else(err)?;
    pos = next;

    if pos != der.len() {
        return Err(err());
    }

    Ok((r, s))
}

fn read_der_length(der: &[u8], pos: usize) -> Option<(usize, usize)> {
    let first = *der.get(pos)?;
    if first & 0x80 == 0 {
        return Some((first as usize, pos + 1));
    }
    let n_bytes = (first & 0x7f) as usize;
    if n_bytes == 0 || n_bytes > 4 {
        return None;
    }
    let mut len = 0usize;
    for i in 0..n_bytes {
        len = (len << 8) | (*der.get(pos + 1 + i)? as usize);
    }
    Some((len, pos + 1 + n_bytes))
}

fn read_der_integer(der: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    if *der.get(pos)? != 0x02 {
        return None;
    }
    let (len, value_start) = read_der_length(der, pos + 1)?;
    let value_end = value_start + len;
    if value_end > der.len() {
        return None;
    }
    Some((&der[value_start..value_end], value_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_signature_is_deterministic() {
        let signer = HmacSigner::sha256(b"key".to_vec());
        let a = signer.sign(b"message").unwrap();
        let b = signer.sign(b"message").unwrap();
        assert_eq!(a.data, b.data);
        assert_eq!(a.data.len(), 32);
    }

    #[test]
    fn der_to_jose_strips_leading_zero_and_pads() {
        // r = 0x00FF... (33 bytes with sign byte), s = 0x01 (1 byte)
        let mut r = vec![0x00];
        r.extend(vec![0xff; 32]);
        let s = vec![0x01];

        let mut der = vec![0x30];
        let body_len = 2 + r.len() + 2 + s.len();
        der.push(body_len as u8);
        der.push(0x02);
        der.push(r.len() as u8);
        der.extend(&r);
        der.push(0x02);
        der.push(s.len() as u8);
        der.extend(&s);

        let jose = der_to_jose_signature(&der).unwrap();
        assert_eq!(jose.len(), 64);
        assert_eq!(&jose[0..32], &vec![0xff; 32][..]);
        assert_eq!(&jose[32..63], &vec![0u8; 31][..]);
        assert_eq!(jose[63], 0x01);
    }

    #[test]
    fn der_to_jose_rejects_oversized_component() {
        let r = vec![0xff; 40];
        let s = vec![0x01];
        let mut der = vec![0x30];
        let body_len = 2 + r.len() + 2 + s.len();
        der.push(body_len as u8);
        der.push(0x02);
        der.push(r.len() as u8);
        der.extend(&r);
        der.push(0x02);
        der.push(s.len() as u8);
        der.extend(&s);

        assert!(der_to_jose_signature(&der).is_err());
    }
}
