//! 加密原语层 - 密钥生成、签名、哈希、编码等基础加密功能

pub mod encoding;
pub mod hash;
pub mod keypair;
pub mod signer;

pub use encoding::{Base64Encoding, PemEncoding};
pub use hash::{HashAlgorithm, Sha256Hash};
pub use keypair::{KeyPairGenerator, KeyType};
pub use signer::{Signature, Signer};
