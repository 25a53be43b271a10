//! Chain Client - block height over Ethereum JSON-RPC

use super::{ChainClient, ClientError};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

/// JSON-RPC client for an Ethereum-compatible node
#[derive(Clone)]
pub struct JsonRpcChainClient {
    http: reqwest::Client,
    rpc_url: String,
}

impl JsonRpcChainClient {
    pub fn new(http: reqwest::Client, rpc_url: &str) -> Self {
        Self {
            http,
            rpc_url: rpc_url.to_string(),
        }
    }
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    async fn current_block_height(&self) -> Result<u64, ClientError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_blockNumber",
            "params": [],
            "id": 1,
        });

        let resp = self.http.post(&self.rpc_url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::ServerError(resp.status()));
        }

        let rpc: RpcResponse = serde_json::from_slice(&resp.bytes().await?)?;
        if let Some(err) = rpc.error {
            return Err(ClientError::Protocol(format!(
                "eth_blockNumber failed ({}): {}",
                err.code, err.message
            )));
        }
        let quantity = rpc
            .result
            .ok_or_else(|| ClientError::Protocol("eth_blockNumber returned no result".to_string()))?;
        parse_quantity(&quantity)
    }
}

/// Parse a JSON-RPC hex quantity such as `"0x1b4"`.
pub(crate) fn parse_quantity(quantity: &str) -> Result<u64, ClientError> {
    let digits = quantity
        .strip_prefix("0x")
        .or_else(|| quantity.strip_prefix("0X"))
        .ok_or_else(|| ClientError::Protocol(format!("quantity '{quantity}' lacks 0x prefix")))?;
    if digits.is_empty() {
        return Err(ClientError::Protocol("empty quantity".to_string()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ClientError::Protocol(format!("invalid quantity '{quantity}': {e}")))
}
