//! Encoding primitives - base64url, PEM/DER conversion, PEM chain parsing

use crate::error::{AcmeError, Result};
use base64::Engine;

/// Base64url encoder/decoder, tolerant of padding on input and unpadded on output
pub struct Base64Encoding;

impl Base64Encoding {
    /// Encode as unpadded URL-safe base64
    pub fn encode(data: &[u8]) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
    }

    /// Decode URL-safe base64, accepting input with or without padding
    pub fn decode(data: &str) -> Result<Vec<u8>> {
        let padded = match data.len() % 4 {
            2 => format!("{}==", data),
            3 => format!("{}=", data),
            _ => data.to_string(),
        };

        base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(&padded)
            .or_else(|_| base64::engine::general_purpose::STANDARD.decode(data))
            .map_err(|e| AcmeError::crypto(format!("base64 decode error: {}", e)))
    }

    /// Standard (padded, `+`/`/`) base64 encoding
    pub fn encode_standard(data: &[u8]) -> String {
        use base64::engine::general_purpose::STANDARD;
        STANDARD.encode(data)
    }

    /// Standard (padded, `+`/`/`) base64 decoding
    pub fn decode_standard(data: &str) -> Result<Vec<u8>> {
        use base64::engine::general_purpose::STANDARD;
        STANDARD
            .decode(data)
            .map_err(|e| AcmeError::crypto(format!("base64 decode error: {}", e)))
    }
}

/// PEM <-> DER conversion, line-wrapped at 64 characters as `pem` does by default
pub struct PemEncoding;

impl PemEncoding {
    /// Encode DER bytes as a PEM block with the given label
    pub fn encode(data: &[u8], label: &str) -> String {
        let pem = pem::Pem::new(label.to_string(), data.to_vec());
        pem::encode(&pem)
    }

    /// Decode a single PEM block, returning its label and DER contents
    pub fn decode(pem_data: &str) -> Result<(String, Vec<u8>)> {
        let pem = pem::parse(pem_data)
            .map_err(|e| AcmeError::malformed_pem(format!("PEM parse error: {}", e)))?;
        Ok((pem.tag().to_string(), pem.contents().to_vec()))
    }

    /// Whether a string parses as a well-formed PEM block
    pub fn is_valid(data: &str) -> bool {
        pem::parse(data).is_ok()
    }

    /// Decode a PEM block and assert its label matches
    pub fn extract_data(pem_data: &str, expected_label: Option<&str>) -> Result<Vec<u8>> {
        let (label, data) = Self::decode(pem_data)?;

        if let Some(expected) = expected_label {
            if label != expected {
                return Err(AcmeError::malformed_pem(format!(
                    "expected PEM label '{}', got '{}'",
                    expected, label
                )));
            }
        }

        Ok(data)
    }

    /// Return the first `-----BEGIN CERTIFICATE-----...-----END CERTIFICATE-----` block
    /// found in a (possibly multi-certificate) PEM chain.
    pub fn extract_first_certificate_pem(chain: &str) -> Result<String> {
        const BEGIN: &str = "-----BEGIN CERTIFICATE-----";
        const END: &str = "-----END CERTIFICATE-----";

        let start = chain
            .find(BEGIN)
            .ok_or_else(|| AcmeError::malformed_pem("no CERTIFICATE block found in chain"))?;
        let end_rel = chain[start..]
            .find(END)
            .ok_or_else(|| AcmeError::malformed_pem("unterminated CERTIFICATE block in chain"))?;
        let end = start + end_rel + END.len();

        Ok(chain[start..end].to_string())
    }
}

/// Hex encoder/decoder, kept alongside base64/PEM as a small ambient utility
pub struct HexEncoding;

impl HexEncoding {
    pub fn encode(data: &[u8]) -> String {
        const HEX_CHARS: &[u8] = b"0123456789abcdef";
        let mut result = String::with_capacity(data.len() * 2);
        for &byte in data {
            result.push(HEX_CHARS[(byte >> 4) as usize] as char);
            result.push(HEX_CHARS[(byte & 0xf) as usize] as char);
        }
        result
    }

    pub fn decode(hex_str: &str) -> Result<Vec<u8>> {
        if hex_str.len() % 2 != 0 {
            return Err(AcmeError::crypto("hex string length must be even"));
        }

        let mut result = Vec::with_capacity(hex_str.len() / 2);
        for chunk in hex_str.as_bytes().chunks(2) {
            let hex = std::str::from_utf8(chunk)
                .map_err(|e| AcmeError::crypto(format!("invalid UTF-8: {}", e)))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|e| AcmeError::crypto(format!("hex decode error: {}", e)))?;
            result.push(byte);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_roundtrip() {
        let data = b"hello world";
        let encoded = Base64Encoding::encode(data);
        let decoded = Base64Encoding::decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn base64_decode_tolerates_padding() {
        let padded = "aGVsbG8=";
        let unpadded = "aGVsbG8";
        assert_eq!(
            Base64Encoding::decode(padded).unwrap(),
            Base64Encoding::decode(unpadded).unwrap()
        );
    }

    #[test]
    fn base64_is_url_safe() {
        let data = b"\xfb\xff\xfe";
        let encoded = Base64Encoding::encode(data);
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
    }

    #[test]
    fn pem_roundtrip() {
        let data = b"test data";
        let pem = PemEncoding::encode(data, "TEST");

        assert!(pem.contains("-----BEGIN TEST-----"));
        assert!(pem.contains("-----END TEST-----"));

        let (label, decoded) = PemEncoding::decode(&pem).unwrap();
        assert_eq!(label, "TEST");
        assert_eq!(decoded, data);
    }

    #[test]
    fn extracts_first_certificate_from_chain() {
        let leaf = PemEncoding::encode(b"leaf-der", "CERTIFICATE");
        let intermediate = PemEncoding::encode(b"intermediate-der", "CERTIFICATE");
        let chain = format!("{}{}", leaf, intermediate);

        let first = PemEncoding::extract_first_certificate_pem(&chain).unwrap();
        assert_eq!(first.trim(), leaf.trim());
    }

    #[test]
    fn extract_first_certificate_fails_without_a_block() {
        assert!(PemEncoding::extract_first_certificate_pem("no certs here").is_err());
    }

    #[test]
    fn hex_roundtrip() {
        let data = b"test";
        let hex = HexEncoding::encode(data);
        let decoded = HexEncoding::decode(&hex).unwrap();
        assert_eq!(decoded, data);
    }
}
