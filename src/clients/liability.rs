//! Liability Client - finishes the on-chain liability for a settled batch

use super::{ClientError, LiabilityClient};
use crate::types::{ContentAnnouncement, ContentId};
use async_trait::async_trait;

/// Calls the liability service's finish endpoint over HTTP
#[derive(Clone)]
pub struct HttpLiabilityClient {
    http: reqwest::Client,
    finish_url: String,
}

impl HttpLiabilityClient {
    pub fn new(http: reqwest::Client, finish_url: &str) -> Self {
        Self {
            http,
            finish_url: finish_url.to_string(),
        }
    }
}

#[async_trait]
impl LiabilityClient for HttpLiabilityClient {
    async fn finish_liability(&self, content_id: &ContentId) -> Result<(), ClientError> {
        let body = ContentAnnouncement {
            content_id: content_id.clone(),
        };
        let resp = self.http.post(&self.finish_url).json(&body).send().await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::ServerError(resp.status()))
        }
    }
}
