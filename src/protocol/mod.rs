/// ACME protocol implementation module
pub mod directory;
pub mod jwk;
pub mod jws;
pub mod nonce;

pub use directory::{Directory, DirectoryManager, DirectoryMeta};
pub use jwk::Jwk;
pub use jws::JwsSigner;
pub use nonce::NonceManager;
