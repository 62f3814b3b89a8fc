/// Storage backends for certificates, account data, and session state.
/// This module provides a pluggable storage architecture with support for
/// local files, Redis, and in-memory backends.
pub mod cert_store;
pub mod file;
pub mod keys;
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

use crate::error::Result;
use async_trait::async_trait;

/// A trait defining the interface for all storage backends.
/// Implementations must be thread-safe and support asynchronous operations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stores a binary value associated with the given key.
    async fn store(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Loads a binary value by its key. Returns `None` if the key does not exist.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Deletes the value associated with the given key.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Lists all keys that start with the specified prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Blanket implementation for `Arc<T>` to allow easy sharing of storage backends.
#[async_trait]
impl<T: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<T> {
    async fn store(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).store(key, value).await
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).load(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list(prefix).await
    }
}

pub use cert_store::{CachedCert, CertificateStore};
pub use file::FileStorage;
pub use keys::{account_key, cert_key};
pub use memory::MemoryStorage;
#[cfg(feature = "redis")]
pub use redis::RedisStorage;

/// Build the configured storage backend, boxed behind the `StorageBackend`
/// blanket impl for `Arc<dyn StorageBackend>` so callers don't need to be
/// generic over the concrete backend type.
pub fn build_backend(settings: &crate::config::StorageSettings) -> Result<std::sync::Arc<dyn StorageBackend>> {
    match settings.backend.as_str() {
        "memory" => Ok(std::sync::Arc::new(MemoryStorage::new())),
        "file" => {
            let path = settings
                .file
                .as_ref()
                .map(|f| f.path.clone())
                .unwrap_or_else(|| ".acmex/certs".to_string());
            Ok(std::sync::Arc::new(FileStorage::new(path)))
        }
        #[cfg(feature = "redis")]
        "redis" => {
            let url = settings
                .redis
                .as_ref()
                .map(|r| r.url.clone())
                .ok_or_else(|| crate::error::AcmeError::configuration("storage.redis.url is required"))?;
            Ok(std::sync::Arc::new(RedisStorage::new(&url)?))
        }
        #[cfg(not(feature = "redis"))]
        "redis" => Err(crate::error::AcmeError::configuration(
            "storage backend \"redis\" requires the `redis` feature",
        )),
        other => Err(crate::error::AcmeError::configuration(format!("unknown storage backend: {}", other))),
    }
}
