/// KV key derivation for account and certificate records.
///
/// Keys are opaque strings; the hash below only needs to be stable across
/// processes, not cryptographic, so a 32-bit FNV-1a is enough.
const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x01000193;

fn fnv1a32(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in data {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// `acme:account:<fnv1a32_hex(directory_url)>`
pub fn account_key(directory_url: &str) -> String {
    format!("acme:account:{:08x}", fnv1a32(directory_url.as_bytes()))
}

/// `cert:<lower(domain)>`
pub fn cert_key(domain: &str) -> String {
    format!("cert:{}", domain.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_key_is_stable_across_calls() {
        let a = account_key("https://acme-v02.api.letsencrypt.org/directory");
        let b = account_key("https://acme-v02.api.letsencrypt.org/directory");
        assert_eq!(a, b);
        assert!(a.starts_with("acme:account:"));
        assert_eq!(a.len(), "acme:account:".len() + 8);
    }

    #[test]
    fn account_key_differs_for_different_urls() {
        let a = account_key("https://acme-v02.api.letsencrypt.org/directory");
        let b = account_key("https://acme-staging-v02.api.letsencrypt.org/directory");
        assert_ne!(a, b);
    }

    #[test]
    fn cert_key_lower_cases_the_domain() {
        assert_eq!(cert_key("Example.COM"), "cert:example.com");
    }
}
