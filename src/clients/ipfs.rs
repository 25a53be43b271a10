//! IPFS Client - content-addressable storage over the Kubo HTTP API

use super::{ClientError, ContentStore};
use crate::types::ContentId;
use async_trait::async_trait;
use serde::Deserialize;

/// One entry of an `/api/v0/add` response
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Hash")]
    hash: String,
}

/// HTTP client for an IPFS node's RPC API
#[derive(Clone)]
pub struct IpfsClient {
    http: reqwest::Client,
    api_url: String,
}

impl IpfsClient {
    /// Create a client for the node at `api_url` (e.g. `http://127.0.0.1:5001`)
    pub fn new(http: reqwest::Client, api_url: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl ContentStore for IpfsClient {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<ContentId, ClientError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(format!("{}/api/v0/add", self.api_url))
            .query(&[("pin", "true")])
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::ServerError(resp.status()));
        }

        let body = resp.text().await?;
        parse_add_response(&body)
    }
}

/// Extract the content hash from an `/api/v0/add` response body.
///
/// The node streams one JSON object per added entry; the last line is the
/// root of what was added.
pub(crate) fn parse_add_response(body: &str) -> Result<ContentId, ClientError> {
    let last = body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .ok_or_else(|| ClientError::Protocol("empty add response".to_string()))?;

    let entry: AddResponse = serde_json::from_str(last)?;
    if entry.hash.is_empty() {
        return Err(ClientError::Protocol(format!(
            "add response for '{}' has no hash",
            entry.name
        )));
    }
    Ok(ContentId::new(entry.hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_entry() {
        let body = r#"{"Name":"data_2024-05-17_09-30-05.txt","Hash":"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG","Size":"1234"}"#;
        let id = parse_add_response(body).unwrap();
        assert_eq!(id.as_str(), "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG");
    }

    #[test]
    fn test_parse_uses_last_line() {
        let body = "{\"Name\":\"a\",\"Hash\":\"QmA\"}\n{\"Name\":\"root\",\"Hash\":\"QmRoot\"}\n";
        assert_eq!(parse_add_response(body).unwrap().as_str(), "QmRoot");
    }

    #[test]
    fn test_parse_rejects_empty_and_garbage() {
        assert!(matches!(parse_add_response(""), Err(ClientError::Protocol(_))));
        assert!(matches!(
            parse_add_response("not json"),
            Err(ClientError::Serialization(_))
        ));
        assert!(matches!(
            parse_add_response(r#"{"Name":"x","Hash":""}"#),
            Err(ClientError::Protocol(_))
        ));
    }

    #[test]
    fn test_api_url_trailing_slash() {
        let client = IpfsClient::new(reqwest::Client::new(), "http://127.0.0.1:5001/");
        assert_eq!(client.api_url(), "http://127.0.0.1:5001");
    }
}
