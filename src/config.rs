//! Configuration management.
//!
//! TOML file parsing, `ACMEX_`-prefixed environment overrides, and
//! fail-fast validation at startup.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AcmeError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub acme: AcmeSettings,

    #[serde(default)]
    pub dns: DnsSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub renewal: RenewalSettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub metrics: Option<MetricsSettings>,
}

/// One CA this process may request certificates from. `acme.providers` is
/// tried in declared order; the first to succeed wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaProviderConfig {
    pub name: String,
    pub directory_url: String,
    #[serde(default)]
    pub eab: Option<EabConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EabConfig {
    pub kid: String,
    pub hmac_key_base64url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcmeSettings {
    #[serde(default)]
    pub providers: Vec<CaProviderConfig>,

    /// Contact email attached to newly registered accounts, if any.
    #[serde(default)]
    pub contact: Option<String>,

    /// When issuing for `*.example.com`, also request `example.com` in the
    /// same order.
    #[serde(default)]
    pub include_apex_with_wildcard: bool,
}

impl Default for AcmeSettings {
    fn default() -> Self {
        Self {
            providers: vec![CaProviderConfig {
                name: "letsencrypt".to_string(),
                directory_url: default_acme_directory(),
                eab: None,
            }],
            contact: None,
            include_apex_with_wildcard: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsSettings {
    /// Static suffix -> zone id map, longest match wins.
    #[serde(default)]
    pub zone_map: HashMap<String, String>,

    /// Cloudflare-compatible API token (supports `${VAR}` expansion).
    #[serde(default)]
    pub api_token: Option<String>,

    /// How long to sleep after creating a TXT record before posting the
    /// challenge response.
    #[serde(default = "default_propagation_seconds")]
    pub propagation_seconds: u64,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            zone_map: HashMap::new(),
            api_token: None,
            propagation_seconds: default_propagation_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// "file" (default), "memory", or "redis".
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    #[serde(default)]
    pub file: Option<FileStorageConfig>,

    #[serde(default)]
    pub redis: Option<RedisStorageConfig>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            file: Some(FileStorageConfig { path: default_cert_path() }),
            redis: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStorageConfig {
    #[serde(default = "default_cert_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStorageConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalSettings {
    #[serde(default = "default_renew_before_days")]
    pub renew_before_days: u32,

    #[serde(default = "default_check_interval_seconds")]
    pub check_interval_seconds: u64,

    /// Domains the background scheduler proactively checks and renews.
    #[serde(default)]
    pub domains: Vec<String>,
}

impl Default for RenewalSettings {
    fn default() -> Self {
        Self {
            renew_before_days: default_renew_before_days(),
            check_interval_seconds: default_check_interval_seconds(),
            domains: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_bind_address")]
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind_address: default_server_bind_address() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Structured JSON logs instead of the human-readable default.
    #[serde(default)]
    pub json: bool,

    /// OTLP collector endpoint. When set, spans are additionally exported
    /// via `tracing-opentelemetry`; when absent, only the local `fmt`
    /// subscriber runs.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level(), json: false, otlp_endpoint: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    pub bind_address: String,
}

fn default_acme_directory() -> String {
    "https://acme-v02.api.letsencrypt.org/directory".to_string()
}

fn default_propagation_seconds() -> u64 {
    20
}

fn default_storage_backend() -> String {
    "file".to_string()
}

fn default_cert_path() -> String {
    ".acmex/certs".to_string()
}

fn default_renew_before_days() -> u32 {
    30
}

fn default_check_interval_seconds() -> u64 {
    3600
}

fn default_server_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            acme: AcmeSettings::default(),
            dns: DnsSettings::default(),
            storage: StorageSettings::default(),
            renewal: RenewalSettings::default(),
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
            metrics: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AcmeError::configuration(format!("failed to read config file: {}", e)))?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|e| AcmeError::configuration(format!("failed to parse TOML: {}", e)))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// `ACMEX_`-prefixed overrides, applied after TOML parsing and before
    /// validation.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(token) = env::var("ACMEX_DNS_API_TOKEN") {
            self.dns.api_token = Some(Self::expand_env_var(&token)?);
        }
        if let Ok(backend) = env::var("ACMEX_STORAGE_BACKEND") {
            self.storage.backend = backend;
        }
        if let Ok(path) = env::var("ACMEX_STORAGE_FILE_PATH") {
            self.storage.file = Some(FileStorageConfig { path: Self::expand_env_var(&path)? });
        }
        if let Ok(url) = env::var("ACMEX_STORAGE_REDIS_URL") {
            self.storage.redis = Some(RedisStorageConfig { url: Self::expand_env_var(&url)? });
        }
        if let Ok(days) = env::var("ACMEX_RENEWAL_BEFORE_DAYS") {
            self.renewal.renew_before_days = days
                .parse()
                .map_err(|_| AcmeError::configuration("ACMEX_RENEWAL_BEFORE_DAYS must be an integer"))?;
        }
        if let Ok(interval) = env::var("ACMEX_RENEWAL_CHECK_INTERVAL_SECONDS") {
            self.renewal.check_interval_seconds = interval
                .parse()
                .map_err(|_| AcmeError::configuration("ACMEX_RENEWAL_CHECK_INTERVAL_SECONDS must be an integer"))?;
        }
        if let Ok(addr) = env::var("ACMEX_SERVER_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Ok(level) = env::var("ACMEX_LOGGING_LEVEL") {
            self.logging.level = level;
        }
        for provider in &mut self.acme.providers {
            if let Some(ref mut eab) = provider.eab {
                eab.hmac_key_base64url = Self::expand_env_var(&eab.hmac_key_base64url)?;
            }
        }
        Ok(())
    }

    /// Expand `${VAR}` references against the process environment, leaving
    /// unresolved references untouched.
    pub fn expand_env_var(value: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| AcmeError::configuration(format!("invalid env-var pattern: {}", e)))?;
        Ok(re
            .replace_all(value, |caps: &regex::Captures| {
                let var_name = &caps[1];
                env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string())
    }

    /// Fail fast on missing/contradictory settings rather than at first use.
    pub fn validate(&self) -> Result<()> {
        if self.acme.providers.is_empty() {
            return Err(AcmeError::configuration("acme.providers must not be empty"));
        }
        for provider in &self.acme.providers {
            if provider.directory_url.is_empty() {
                return Err(AcmeError::configuration(format!(
                    "provider {} has an empty directory_url",
                    provider.name
                )));
            }
        }

        if self.dns.zone_map.is_empty() && self.dns.api_token.is_none() {
            return Err(AcmeError::configuration(
                "dns.api_token is required when dns.zone_map does not cover every issued domain",
            ));
        }

        match self.storage.backend.as_str() {
            "file" => {
                if self.storage.file.as_ref().is_none_or(|f| f.path.is_empty()) {
                    return Err(AcmeError::configuration("storage.file.path must be set for the file backend"));
                }
            }
            "memory" => {}
            "redis" => {
                if self.storage.redis.as_ref().is_none_or(|r| r.url.is_empty()) {
                    return Err(AcmeError::configuration("storage.redis.url must be set for the redis backend"));
                }
            }
            other => {
                return Err(AcmeError::configuration(format!("unknown storage backend: {}", other)));
            }
        }

        if self.renewal.check_interval_seconds == 0 {
            return Err(AcmeError::configuration("renewal.check_interval_seconds must be greater than 0"));
        }

        Ok(())
    }

    pub fn renewal_check_interval(&self) -> Duration {
        Duration::from_secs(self.renewal.check_interval_seconds)
    }

    pub fn dns_propagation_wait(&self) -> Duration {
        Duration::from_secs(self.dns.propagation_seconds)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env lock")
    }

    #[test]
    fn default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_err(), "default has no DNS token or zone map");
    }

    #[test]
    fn config_parses_from_toml() {
        let toml = r#"
[acme]
contact = "ops@example.com"

[[acme.providers]]
name = "letsencrypt"
directory_url = "https://acme-staging-v02.api.letsencrypt.org/directory"

[dns]
api_token = "token-123"
propagation_seconds = 15

[dns.zone_map]
"example.com" = "zone-abc"

[storage]
backend = "memory"

[renewal]
renew_before_days = 14
check_interval_seconds = 1800
domains = ["example.com"]
"#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.acme.providers.len(), 1);
        assert_eq!(config.dns.propagation_seconds, 15);
        assert_eq!(config.renewal.renew_before_days, 14);
        assert_eq!(config.renewal.domains, vec!["example.com".to_string()]);
    }

    #[test]
    fn validate_rejects_empty_provider_list() {
        let mut config = Config::default();
        config.acme.providers.clear();
        config.dns.api_token = Some("token".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn expand_env_var_substitutes_known_variables() {
        let _guard = env_lock();
        // SAFETY: tests run single-threaded for this scope; the var is removed below.
        unsafe {
            std::env::set_var("ACMEX_TEST_EXPAND_VAR", "resolved");
        }
        let result = Config::expand_env_var("prefix_${ACMEX_TEST_EXPAND_VAR}_suffix").unwrap();
        unsafe {
            std::env::remove_var("ACMEX_TEST_EXPAND_VAR");
        }
        assert_eq!(result, "prefix_resolved_suffix");
    }
}
