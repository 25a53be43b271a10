//! HTTP Publisher - outgoing announcements and bids as JSON POSTs

use super::{ClientError, Publisher};
use crate::types::{Bid, ContentAnnouncement, ContentId};
use async_trait::async_trait;
use serde::Serialize;

/// Posts outgoing messages to the configured subscriber endpoints
#[derive(Clone)]
pub struct HttpPublisher {
    http: reqwest::Client,
    measurements_url: String,
    bids_url: String,
}

impl HttpPublisher {
    pub fn new(http: reqwest::Client, measurements_url: &str, bids_url: &str) -> Self {
        Self {
            http,
            measurements_url: measurements_url.to_string(),
            bids_url: bids_url.to_string(),
        }
    }

    async fn post<T: Serialize + Sync>(&self, url: &str, body: &T) -> Result<(), ClientError> {
        let resp = self.http.post(url).json(body).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::ServerError(resp.status()))
        }
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish_content(&self, content_id: &ContentId) -> Result<(), ClientError> {
        let msg = ContentAnnouncement {
            content_id: content_id.clone(),
        };
        self.post(&self.measurements_url, &msg).await
    }

    async fn publish_bid(&self, bid: &Bid) -> Result<(), ClientError> {
        self.post(&self.bids_url, bid).await
    }
}
