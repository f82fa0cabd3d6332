//! Configuration management.
//!
//! Settings come from built-in defaults, an optional TOML file and
//! `CITATION_GRAPH_*` environment variables (sections separated by `__`,
//! e.g. `CITATION_GRAPH_CLIENT__EMAIL`).
//!
//! ```toml
//! [client]
//! tool = "CitationGraph"
//! email = "you@example.org"
//! request_timeout_secs = 30
//!
//! [rate_limits]
//! batch_size = 200
//! batch_delay_ms = 1000
//! single_delay_ms = 340
//!
//! [retry]
//! max_attempts = 1
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::RetryConfig;

/// Largest number of ids the PMC services accept in one request
pub const MAX_BATCH_SIZE: usize = 200;

const CONFIG_FILE_NAME: &str = "citation-graph.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Identification sent with every request
    #[serde(default)]
    pub client: ClientConfig,

    /// Service endpoints
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Batching and throttling
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Opt-in retry of transient failures
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Client identification and transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Tool name reported to NCBI
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Contact email reported to NCBI (required by their usage policy)
    #[serde(default = "default_email")]
    pub email: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            email: default_email(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_tool() -> String {
    "CitationGraph".to_string()
}

fn default_email() -> Option<String> {
    std::env::var("NCBI_EMAIL").ok()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// Endpoint URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// PMC ID converter
    #[serde(default = "default_idconv_url")]
    pub idconv_url: String,

    /// E-utilities base (elink.fcgi and esummary.fcgi live below it)
    #[serde(default = "default_eutils_url")]
    pub eutils_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            idconv_url: default_idconv_url(),
            eutils_url: default_eutils_url(),
        }
    }
}

impl EndpointConfig {
    /// Point every endpoint at one base URL (mock servers, mirrors)
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            idconv_url: format!("{}/idconv", base),
            eutils_url: format!("{}/eutils", base),
        }
    }

    pub fn elink_url(&self) -> String {
        format!("{}/elink.fcgi", self.eutils_url.trim_end_matches('/'))
    }

    pub fn esummary_url(&self) -> String {
        format!("{}/esummary.fcgi", self.eutils_url.trim_end_matches('/'))
    }
}

fn default_idconv_url() -> String {
    "https://www.ncbi.nlm.nih.gov/pmc/utils/idconv/v1.0/".to_string()
}

fn default_eutils_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}

/// Batching and throttling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Ids per request, at most [`MAX_BATCH_SIZE`]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause after every batched request
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,

    /// Pause after every single-item lookup
    #[serde(default = "default_single_delay")]
    pub single_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay(),
            single_delay_ms: default_single_delay(),
        }
    }
}

impl RateLimitConfig {
    /// No pauses at all, for tests against local mock servers
    pub fn unthrottled() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: 0,
            single_delay_ms: 0,
        }
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn single_delay(&self) -> Duration {
        Duration::from_millis(self.single_delay_ms)
    }
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_batch_delay() -> u64 {
    1000
}

fn default_single_delay() -> u64 {
    340
}

/// Retry configuration as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per request; 1 disables retry
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            backoff_multiplier: settings.backoff_multiplier,
        }
    }
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(env_source())
        .build()?;

    settings.try_deserialize()
}

/// Get the default configuration, with environment overrides
pub fn get_config() -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(env_source())
        .build()?;

    settings.try_deserialize()
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix("CITATION_GRAPH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Look for a config file in the working directory, then the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("citation-graph").join("config.toml"))
        .filter(|path| path.is_file())
}
