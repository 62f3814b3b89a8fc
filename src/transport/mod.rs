//! 传输层 - HTTP 客户端、重试

pub mod http_client;
pub mod retry;

pub use http_client::HttpClient;
pub use retry::RetryPolicy;
