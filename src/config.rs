//! Client configuration.
//!
//! Plain struct with serde deserialization and per-field defaults, plus
//! explicit environment-variable overrides. Read once at client
//! construction; there is no hot reload.

use crate::backend::Backend;
use crate::error::Error;
use crate::logging::Logger;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Client configuration.
///
/// Environment overrides (applied by [`Config::from_env`], highest priority):
/// `FAULTLINE_API_KEY`, `FAULTLINE_ENDPOINT`, `FAULTLINE_ENV`,
/// `FAULTLINE_HOSTNAME`, `FAULTLINE_ROOT`, `FAULTLINE_SYNC`,
/// `FAULTLINE_TIMEOUT` (seconds).
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Collector API key, sent as the `X-API-Key` header.
    #[serde(default)]
    pub api_key: String,

    /// Collector base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Deployment environment name reported with every notice.
    #[serde(default = "default_env")]
    pub env: String,

    /// Host name reported with every notice.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Project root path reported with every notice.
    #[serde(default = "default_root")]
    pub root: String,

    /// Deliver inline on the caller's thread instead of through the worker.
    /// For short-lived processes that would exit before the queue drains.
    #[serde(default)]
    pub sync: bool,

    /// HTTP timeout for a single delivery attempt.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Delivery queue capacity; pushes beyond this are dropped.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Number of delivery executors. One executor preserves FIFO delivery.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Transport override; defaults to the HTTP collector backend.
    #[serde(skip)]
    pub backend: Option<Arc<dyn Backend>>,

    /// Diagnostic sink override; defaults to the tracing logger.
    #[serde(skip)]
    pub logger: Option<Arc<dyn Logger>>,
}

fn default_endpoint() -> String {
    "https://api.faultline.io".to_string()
}

fn default_env() -> String {
    String::new()
}

fn default_hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_root() -> String {
    std::env::current_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default()
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_queue_size() -> usize {
    100
}

fn default_concurrency() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_endpoint(),
            env: default_env(),
            hostname: default_hostname(),
            root: default_root(),
            sync: false,
            timeout: default_timeout(),
            queue_size: default_queue_size(),
            concurrency: default_concurrency(),
            backend: None,
            logger: None,
        }
    }
}

impl Config {
    /// Defaults with environment-variable overrides applied.
    pub fn from_env() -> Config {
        let mut config = Config::default();

        if let Ok(api_key) = std::env::var("FAULTLINE_API_KEY") {
            config.api_key = api_key;
        }
        if let Ok(endpoint) = std::env::var("FAULTLINE_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(env) = std::env::var("FAULTLINE_ENV") {
            config.env = env;
        }
        if let Ok(hostname) = std::env::var("FAULTLINE_HOSTNAME") {
            config.hostname = hostname;
        }
        if let Ok(root) = std::env::var("FAULTLINE_ROOT") {
            config.root = root;
        }
        if let Ok(sync) = std::env::var("FAULTLINE_SYNC") {
            config.sync = matches!(sync.as_str(), "1" | "true" | "yes");
        }
        if let Ok(timeout) = std::env::var("FAULTLINE_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                config.timeout = Duration::from_secs(secs);
            }
        }

        config
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.queue_size == 0 {
            return Err(Error::Config("queue_size must be at least 1".to_string()));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        if self.endpoint.is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("env", &self.env)
            .field("hostname", &self.hostname)
            .field("root", &self.root)
            .field("sync", &self.sync)
            .field("timeout", &self.timeout)
            .field("queue_size", &self.queue_size)
            .field("concurrency", &self.concurrency)
            .field("backend", &self.backend.as_ref().map(|_| "custom"))
            .field("logger", &self.logger.as_ref().map(|_| "custom"))
            .finish()
    }
}
