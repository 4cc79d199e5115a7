//! JSON-RPC poster and latest-block reader for the single configured
//! upstream (spec §4.5).

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::ProxyError;
use crate::jsonrpc::RPCRequest;

/// Abstract upstream collaborator the `Engine` is injected with, so tests
/// can swap in a mock HTTP server (`wiremock`) without touching the engine.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Posts `request` as JSON to the upstream and returns the raw response
    /// body verbatim.
    async fn post(&self, url: &str, request: &RPCRequest) -> Result<Vec<u8>, ProxyError>;

    /// `eth_blockNumber` then `eth_getBlockByNumber(result, true)`, returning
    /// `(number, timestamp)` (spec §4.5).
    async fn latest_block(&self, url: &str) -> Result<(u64, i64), ProxyError>;
}

pub struct ReqwestUpstream {
    client: Client,
}

impl ReqwestUpstream {
    pub fn new(request_timeout: std::time::Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<Vec<u8>, ProxyError> {
        let resp = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ProxyError::Transport(format!("request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(ProxyError::Transport(format!("upstream HTTP {}", resp.status())));
        }

        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| ProxyError::Transport(format!("body read error: {e}")))
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstream {
    async fn post(&self, url: &str, request: &RPCRequest) -> Result<Vec<u8>, ProxyError> {
        let body = serde_json::to_value(request)?;
        debug!(method = %request.method, url, "posting to upstream");
        self.post_json(url, &body).await
    }

    async fn latest_block(&self, url: &str) -> Result<(u64, i64), ProxyError> {
        let block_number_req = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_blockNumber",
            "params": [],
            "id": 1
        });
        let block_number_body = self.post_json(url, &block_number_req).await?;
        let block_number_hex = extract_str(&block_number_body, "result")?;

        let block_req = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_getBlockByNumber",
            "params": [block_number_hex, true],
            "id": 1
        });
        let block_body = self.post_json(url, &block_req).await?;
        let json: serde_json::Value = serde_json::from_slice(&block_body)
            .map_err(|e| ProxyError::Conversion(format!("invalid block response: {e}")))?;

        let number_hex = json
            .get("result")
            .and_then(|r| r.get("number"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProxyError::Conversion("missing result.number".to_string()))?;
        let timestamp_hex = json
            .get("result")
            .and_then(|r| r.get("timestamp"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProxyError::Conversion("missing result.timestamp".to_string()))?;

        let number = parse_big_hex(number_hex)?;
        let timestamp = parse_big_hex(timestamp_hex)? as i64;

        // A suspiciously small decoded number is almost always a decoding
        // error, except against a local devnet, which legitimately starts
        // at block 0 (spec §4.5 development escape hatch).
        let is_local = url.contains("localhost") || url.contains("127.0.0.1");
        if number < 1000 && !is_local {
            return Err(ProxyError::Conversion(format!(
                "suspiciously low block number {number}, refusing to trust it"
            )));
        }
        if timestamp < 1000 {
            return Err(ProxyError::Conversion(format!(
                "suspiciously low block timestamp {timestamp}"
            )));
        }

        Ok((number, timestamp))
    }
}

fn extract_str(body: &[u8], field: &str) -> Result<String, ProxyError> {
    let json: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ProxyError::Conversion(format!("invalid upstream response: {e}")))?;
    json.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ProxyError::Conversion(format!("missing {field} field")))
}

fn parse_big_hex(hex: &str) -> Result<u64, ProxyError> {
    let trimmed = hex.strip_prefix("0x").unwrap_or(hex);
    u64::from_str_radix(trimmed, 16)
        .map_err(|e| ProxyError::Conversion(format!("invalid hex {hex}: {e}")))
}
