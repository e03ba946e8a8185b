//! Device source abstraction.
//!
//! The collector only ever sees a [`DeviceSource`]: the HTTP client in
//! production, a scripted [`MockSource`](super::MockSource) in tests.

use super::RawDevice;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to the cloud API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("session token expired")]
    AuthExpired,

    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    #[error("API returned code {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Trait for anything that can supply raw controller records.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Obtains a fresh session, replacing any held token.
    async fn authenticate(&self) -> Result<(), ClientError>;

    /// Fetches every controller visible to the account.
    ///
    /// Returns [`ClientError::AuthExpired`] when the session must be renewed.
    /// Implementations do not retry; that policy belongs to the caller.
    async fn fetch_devices(&self) -> Result<Vec<RawDevice>, ClientError>;
}
