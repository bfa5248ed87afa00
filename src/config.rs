//! Configuration types for link-resolver

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Main configuration for the resolver service
///
/// Every field has a default, so `{}` is a valid configuration file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// External delegates, timeouts and loop bounds
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Host patterns that drive stage dispatch
    #[serde(default)]
    pub domains: DomainConfig,

    /// Task store settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Load a JSON configuration file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the resolver cannot run with
    pub fn validate(&self) -> Result<()> {
        let endpoints = [
            ("resolver.timer_endpoint", &self.resolver.timer_endpoint),
            ("resolver.direct_endpoint", &self.resolver.direct_endpoint),
        ];
        for (key, endpoint) in endpoints {
            if url::Url::parse(endpoint).is_err() {
                return Err(Error::Config {
                    message: format!("'{}' is not a valid URL", endpoint),
                    key: Some(key.to_string()),
                });
            }
        }

        let timeouts = [
            ("resolver.page_timeout", self.resolver.page_timeout),
            ("resolver.timer_timeout", self.resolver.timer_timeout),
            ("resolver.direct_timeout", self.resolver.direct_timeout),
        ];
        for (key, timeout) in timeouts {
            if timeout.is_zero() {
                return Err(Error::Config {
                    message: "timeout must be greater than zero".to_string(),
                    key: Some(key.to_string()),
                });
            }
        }

        if self.resolver.max_timer_hops == 0 {
            return Err(Error::Config {
                message: "at least one timer hop is required".to_string(),
                key: Some("resolver.max_timer_hops".to_string()),
            });
        }

        Ok(())
    }
}

/// External delegates and per-call limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Timer decoding service, called as `<endpoint>?url=<encoded link>`
    #[serde(default = "default_timer_endpoint")]
    pub timer_endpoint: String,

    /// Direct-link resolution service, called as `<endpoint>?url=<encoded link>`
    #[serde(default = "default_direct_endpoint")]
    pub direct_endpoint: String,

    /// Timeout for HTML page fetches (default: 8 seconds)
    #[serde(default = "default_page_timeout", with = "duration_serde")]
    pub page_timeout: Duration,

    /// Timeout for the timer decoding service (default: 25 seconds)
    #[serde(default = "default_delegate_timeout", with = "duration_serde")]
    pub timer_timeout: Duration,

    /// Timeout for the direct-link service, which may solve challenges itself (default: 25 seconds)
    #[serde(default = "default_delegate_timeout", with = "duration_serde")]
    pub direct_timeout: Duration,

    /// Maximum chained timer pages bypassed per link (default: 3)
    #[serde(default = "default_max_timer_hops")]
    pub max_timer_hops: u32,

    /// User agent sent to the resolution delegates
    #[serde(default = "default_delegate_user_agent")]
    pub delegate_user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timer_endpoint: default_timer_endpoint(),
            direct_endpoint: default_direct_endpoint(),
            page_timeout: default_page_timeout(),
            timer_timeout: default_delegate_timeout(),
            direct_timeout: default_delegate_timeout(),
            max_timer_hops: default_max_timer_hops(),
            delegate_user_agent: default_delegate_user_agent(),
        }
    }
}

/// Host substrings for each dispatch tier
///
/// Matching is a plain substring test against the current link.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Direct CDN hosts, solved in a single hop before anything else
    #[serde(default = "default_direct_cdn_hosts")]
    pub direct_cdn: Vec<String>,

    /// Timer / ad-wait hosts handled by the timer decoder
    #[serde(default = "default_timer_hosts")]
    pub timer: Vec<String>,

    /// Hosts that stop the timer loop (any later stage can handle them)
    #[serde(default = "default_downstream_hosts")]
    pub downstream: Vec<String>,

    /// First intermediate tier (HBLinks)
    #[serde(default = "default_intermediate_a_hosts")]
    pub intermediate_a: Vec<String>,

    /// Second intermediate tier (HubDrive)
    #[serde(default = "default_intermediate_b_hosts")]
    pub intermediate_b: Vec<String>,

    /// Final tier resolved by the direct-link service
    #[serde(default = "default_final_hosts")]
    pub final_tier: Vec<String>,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            direct_cdn: default_direct_cdn_hosts(),
            timer: default_timer_hosts(),
            downstream: default_downstream_hosts(),
            intermediate_a: default_intermediate_a_hosts(),
            intermediate_b: default_intermediate_b_hosts(),
            final_tier: default_final_hosts(),
        }
    }
}

/// Task store configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./link-resolver.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Optional API key for authentication
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_timer_endpoint() -> String {
    "http://127.0.0.1:10000/solve".to_string()
}

fn default_direct_endpoint() -> String {
    "http://127.0.0.1:5000/solve".to_string()
}

fn default_page_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_delegate_timeout() -> Duration {
    Duration::from_secs(25)
}

fn default_max_timer_hops() -> u32 {
    3
}

fn default_delegate_user_agent() -> String {
    concat!("link-resolver/", env!("CARGO_PKG_VERSION")).to_string()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_direct_cdn_hosts() -> Vec<String> {
    strings(&["hubcdn.fans"])
}

fn default_timer_hosts() -> Vec<String> {
    strings(&["gadgetsweb", "review-tech", "ngwin", "cryptoinsights"])
}

fn default_downstream_hosts() -> Vec<String> {
    strings(&["hblinks", "hubdrive", "hubcdn", "hubcloud"])
}

fn default_intermediate_a_hosts() -> Vec<String> {
    strings(&["hblinks"])
}

fn default_intermediate_b_hosts() -> Vec<String> {
    strings(&["hubdrive"])
}

fn default_final_hosts() -> Vec<String> {
    strings(&["hubcloud", "hubcdn"])
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./link-resolver.db")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
