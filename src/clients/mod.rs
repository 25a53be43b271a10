//! External collaborators
//!
//! Narrow async interfaces to the systems the agents talk to, plus their
//! HTTP implementations:
//! - [`ContentStore`]: content-addressable storage (`put(bytes) -> ContentId`)
//! - [`ChainClient`]: current block height
//! - [`LiabilityClient`]: finish the on-chain liability for a batch
//! - [`Publisher`]: outgoing announcements and bids

pub mod chain;
pub mod ipfs;
pub mod liability;
pub mod publisher;
pub mod retry;

pub use chain::JsonRpcChainClient;
pub use ipfs::IpfsClient;
pub use liability::HttpLiabilityClient;
pub use publisher::HttpPublisher;

use crate::types::{Bid, ContentId};
use async_trait::async_trait;

/// Errors returned by external collaborators
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    ServerError(reqwest::StatusCode),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Content-addressable store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` under `name` and return their content identifier.
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ContentId, ClientError>;
}

/// Read-only view of the settlement chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn current_block_height(&self) -> Result<u64, ClientError>;
}

/// Remote "finish liability" action.
#[async_trait]
pub trait LiabilityClient: Send + Sync {
    async fn finish_liability(&self, content_id: &ContentId) -> Result<(), ClientError>;
}

/// Outgoing side of the message transport.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Announce a flushed batch.
    async fn publish_content(&self, content_id: &ContentId) -> Result<(), ClientError>;

    /// Emit a bid answering an auction ask.
    async fn publish_bid(&self, bid: &Bid) -> Result<(), ClientError>;
}

/// Build the shared reqwest client used by all HTTP adapters.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_names_status() {
        let err = ClientError::ServerError(reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Server returned status 502 Bad Gateway");
    }

    #[test]
    fn test_serialization_error_from_serde() {
        let raw = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(ClientError::from(raw), ClientError::Serialization(_)));
    }
}
