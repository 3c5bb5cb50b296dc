//! Error types for the faultline reporting client.

use thiserror::Error;

/// Boxed error value carried through filters and fault causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the reporting pipeline itself.
///
/// Failures that originate in the monitored application are never wrapped in
/// this type; they pass through notify/monitor unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// A before-notify filter vetoed the notice. Carries the filter's error as-is.
    #[error(transparent)]
    Rejected(BoxError),

    #[error("delivery queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("delivery worker is stopped")]
    Stopped,

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Delivery(err.to_string())
    }
}
