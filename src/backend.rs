//! Collector transport.
//!
//! The core treats delivery as an opaque capability: [`Backend::deliver`]
//! either succeeds or fails. The default implementation POSTs the notice
//! payload to the configured collector endpoint; retry, backoff, and rate
//! limiting are the collector client's callers' concern, not this crate's.

use crate::config::Config;
use crate::error::Error;
use crate::notice::Notice;
use async_trait::async_trait;
use std::fmt;
use tracing::debug;

/// Transport capability consumed by the delivery pipeline.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn deliver(&self, notice: &Notice) -> Result<(), Error>;
}

impl fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Backend")
    }
}

/// HTTP backend for the hosted collector.
pub struct ServerBackend {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl ServerBackend {
    pub fn new(config: &Config) -> Result<ServerBackend, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(ServerBackend {
            client,
            url: format!("{}/v1/notices", config.endpoint.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Backend for ServerBackend {
    async fn deliver(&self, notice: &Notice) -> Result<(), Error> {
        let response = self
            .client
            .post(&self.url)
            .header("X-API-Key", &self.api_key)
            .json(&notice.payload())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Delivery(format!(
                "collector returned {status} for notice {}",
                notice.token
            )));
        }

        debug!(target: "faultline", token = %notice.token, "notice delivered");
        Ok(())
    }
}
