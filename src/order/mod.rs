/// Order management for ACME client
pub mod csr;
pub mod manager;
pub mod objects;

// `revocation` is intentionally left undeclared: certificate revocation
// is out of scope for this build.

pub use csr::{
    certificate_not_after_unix, generate_csr_der, generate_tls_key_pair, key_pair_to_pkcs8_pem,
    parse_certificate_chain, verify_certificate_domains,
};
pub use manager::OrderManager;
pub use objects::{Authorization, Challenge, FinalizationRequest, NewOrderRequest, Order};
