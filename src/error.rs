/// Error handling for the ACME certificate issuance core
use thiserror::Error;

/// Result type for ACME operations
pub type Result<T> = std::result::Result<T, AcmeError>;

/// Error types surfaced by the ACME client, DNS provider, storage, and orchestrator
#[derive(Error, Debug)]
pub enum AcmeError {
    /// Missing DNS token, empty provider list, or other startup misconfiguration
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A PEM block could not be parsed or extracted
    #[error("malformed PEM: {0}")]
    MalformedPem(String),

    /// A JWK could not be parsed or was missing a required member
    #[error("malformed JWK: {0}")]
    MalformedJwk(String),

    /// A DER-encoded ECDSA signature did not decode into two INTEGERs
    #[error("malformed DER signature: {0}")]
    MalformedDerSignature(String),

    /// Any non-OK response from the ACME server after retries
    #[error("ACME request to {url} failed with status {status}: {body}")]
    AcmeRequestFailed {
        status: u16,
        url: String,
        body: String,
    },

    /// A required header or field was missing from an ACME response
    #[error("ACME protocol error: {0}")]
    AcmeProtocolError(String),

    /// An authorization or order did not become valid within the time/attempt budget
    #[error("ACME poll exceeded: {0}")]
    AcmePollExceeded(String),

    /// A TXT record could not be created
    #[error("DNS create failed: {0}")]
    DnsCreateFailed(String),

    /// A TXT record could not be deleted
    #[error("DNS delete failed: {0}")]
    DnsDeleteFailed(String),

    /// No zone id could be resolved for a domain
    #[error("zone resolution failed: {0}")]
    ZoneResolutionFailed(String),

    /// Every configured provider failed; carries one message per provider
    #[error("all providers failed: {}", .details.join("; "))]
    AllProvidersFailed { details: Vec<String> },

    /// Account-related error outside the specific ACME protocol failures above
    #[error("account error: {0}")]
    Account(String),

    /// Certificate parsing/encoding error
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Cryptographic operation error outside the specific invariant breaches above
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Storage backend I/O failure
    #[error("storage error: {0}")]
    Storage(String),

    /// HTTP transport failure not otherwise classified
    #[error("transport error: {0}")]
    Transport(String),

    /// Operation timeout outside the bounded ACME poll loops
    #[error("timeout: {0}")]
    Timeout(String),

    /// Requested resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Underlying I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AcmeError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        AcmeError::ConfigError(msg.into())
    }

    /// Kept as an alias for the teacher's `configuration()` constructor name.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        AcmeError::ConfigError(msg.into())
    }

    pub fn malformed_pem<S: Into<String>>(msg: S) -> Self {
        AcmeError::MalformedPem(msg.into())
    }

    /// Kept as an alias for the teacher's `pem()` constructor name.
    pub fn pem<S: Into<String>>(msg: S) -> Self {
        AcmeError::MalformedPem(msg.into())
    }

    pub fn malformed_jwk<S: Into<String>>(msg: S) -> Self {
        AcmeError::MalformedJwk(msg.into())
    }

    pub fn malformed_der_signature<S: Into<String>>(msg: S) -> Self {
        AcmeError::MalformedDerSignature(msg.into())
    }

    pub fn acme_request_failed(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let truncated: String = body.chars().take(2000).collect();
        AcmeError::AcmeRequestFailed {
            status,
            url: url.into(),
            body: truncated,
        }
    }

    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        AcmeError::AcmeProtocolError(msg.into())
    }

    pub fn poll_exceeded<S: Into<String>>(msg: S) -> Self {
        AcmeError::AcmePollExceeded(msg.into())
    }

    pub fn dns_create_failed<S: Into<String>>(msg: S) -> Self {
        AcmeError::DnsCreateFailed(msg.into())
    }

    pub fn dns_delete_failed<S: Into<String>>(msg: S) -> Self {
        AcmeError::DnsDeleteFailed(msg.into())
    }

    pub fn zone_resolution_failed<S: Into<String>>(msg: S) -> Self {
        AcmeError::ZoneResolutionFailed(msg.into())
    }

    pub fn all_providers_failed(details: Vec<String>) -> Self {
        AcmeError::AllProvidersFailed { details }
    }

    pub fn account<S: Into<String>>(msg: S) -> Self {
        AcmeError::Account(msg.into())
    }

    pub fn certificate<S: Into<String>>(msg: S) -> Self {
        AcmeError::Certificate(msg.into())
    }

    pub fn crypto<S: Into<String>>(msg: S) -> Self {
        AcmeError::Crypto(msg.into())
    }

    pub fn storage<S: Into<String>>(msg: S) -> Self {
        AcmeError::Storage(msg.into())
    }

    pub fn transport<S: Into<String>>(msg: S) -> Self {
        AcmeError::Transport(msg.into())
    }

    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        AcmeError::Timeout(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        AcmeError::NotFound(msg.into())
    }
}
