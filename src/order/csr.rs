/// PKCS#10 CSR generation for the TLS certificate being issued.
///
/// Uses a fresh `rcgen::KeyPair` distinct from the account's
/// `crypto::keypair::EcdsaP256KeyPair` - the account key signs ACME
/// requests, this one becomes the certificate's subject key.
use rcgen::{
    CertificateParams, DistinguishedName, DnType, KeyPair, KeyUsagePurpose,
    PKCS_ECDSA_P256_SHA256,
};

use crate::error::{AcmeError, Result};

/// Generate a fresh ECDSA P-256 key pair for the certificate being issued.
pub fn generate_tls_key_pair() -> Result<KeyPair> {
    KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)
        .map_err(|e| AcmeError::crypto(format!("failed to generate TLS key pair: {}", e)))
}

/// Build a PKCS#10 CSR (DER) for `identifiers`, with `CN=identifiers[0]`, a
/// SAN entry per identifier, and a critical `KeyUsage(digitalSignature)`
/// extension.
pub fn generate_csr_der(identifiers: &[String], key_pair: &KeyPair) -> Result<Vec<u8>> {
    if identifiers.is_empty() {
        return Err(AcmeError::certificate("CSR requires at least one identifier"));
    }

    let mut params = CertificateParams::new(identifiers.to_vec())
        .map_err(|e| AcmeError::crypto(format!("invalid CSR subject alt names: {}", e)))?;

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, identifiers[0].clone());
    params.distinguished_name = dn;
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];

    let csr = params
        .serialize_request(key_pair)
        .map_err(|e| AcmeError::crypto(format!("failed to serialize CSR: {}", e)))?;

    Ok(csr.der().to_vec())
}

/// PKCS#8 PEM encoding of a TLS key pair, for returning to the caller
/// alongside the certificate.
pub fn key_pair_to_pkcs8_pem(key_pair: &KeyPair) -> String {
    key_pair.serialize_pem()
}

/// Split a PEM certificate chain into individual DER-encoded certificates.
pub fn parse_certificate_chain(pem: &str) -> Result<Vec<Vec<u8>>> {
    let certs: Vec<Vec<u8>> = pem::parse_many(pem.as_bytes())
        .map_err(|e| AcmeError::certificate(format!("failed to parse PEM chain: {}", e)))?
        .into_iter()
        .filter(|p| p.tag() == "CERTIFICATE")
        .map(|p| p.contents().to_vec())
        .collect();

    if certs.is_empty() {
        return Err(AcmeError::certificate("no certificates found in PEM chain"));
    }

    Ok(certs)
}

/// Parse the leaf certificate's `notAfter` as a Unix timestamp (seconds).
pub fn certificate_not_after_unix(cert_der: &[u8]) -> Result<i64> {
    use x509_parser::prelude::*;

    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| AcmeError::certificate(format!("failed to parse certificate: {}", e)))?;

    Ok(cert.validity().not_after.timestamp())
}

/// Confirm the certificate's SAN list covers every expected domain.
pub fn verify_certificate_domains(cert_der: &[u8], expected_domains: &[String]) -> Result<bool> {
    use x509_parser::prelude::*;

    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| AcmeError::certificate(format!("failed to parse certificate: {}", e)))?;

    let cert_domains: Vec<String> = cert
        .subject_alternative_name()
        .ok()
        .flatten()
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(domain) => Some(domain.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    for expected in expected_domains {
        if !cert_domains.contains(expected) {
            tracing::warn!(domain = %expected, "expected domain missing from certificate SANs");
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_csr_for_single_domain() {
        let key_pair = generate_tls_key_pair().unwrap();
        let der = generate_csr_der(&["example.com".to_string()], &key_pair).unwrap();
        assert!(!der.is_empty());
    }

    #[test]
    fn generates_csr_for_apex_and_wildcard_pair() {
        let key_pair = generate_tls_key_pair().unwrap();
        let identifiers = vec!["example.com".to_string(), "*.example.com".to_string()];
        let der = generate_csr_der(&identifiers, &key_pair).unwrap();
        assert!(!der.is_empty());
    }

    #[test]
    fn rejects_empty_identifier_list() {
        let key_pair = generate_tls_key_pair().unwrap();
        assert!(generate_csr_der(&[], &key_pair).is_err());
    }

    #[test]
    fn exports_pkcs8_pem() {
        let key_pair = generate_tls_key_pair().unwrap();
        let pem = key_pair_to_pkcs8_pem(&key_pair);
        assert!(pem.contains("BEGIN PRIVATE KEY"));
    }
}
