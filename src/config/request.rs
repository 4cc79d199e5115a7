use std::collections::HashMap;

use crate::error::ProxyError;

use super::cli::Config;

/// Per-request overrides resolved from query parameters, falling back to the
/// process config (spec §4.8).
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub debug: bool,
    pub upstream_url: String,
    pub chain_id: Option<i64>,
}

impl RequestConfig {
    /// `query` is the raw `?key=value` pairs of the POST request, with
    /// whatever casing the client sent — parameter names are matched
    /// case-insensitively (spec §4.8: "case-insensitive names").
    pub fn resolve(query: &HashMap<String, String>, cli: &Config) -> Result<Self, ProxyError> {
        let lower: HashMap<String, &String> = query
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();

        let debug = lower
            .get("debug")
            .map(|v| matches!(v.as_str(), "1" | "true"))
            .unwrap_or(false);

        let upstream_url = lower
            .get("rpcurl")
            .or_else(|| lower.get("rpc_url"))
            .map(|s| s.to_string())
            .or_else(|| cli.upstream_url.clone())
            .unwrap_or_default();

        if upstream_url.len() < 5 {
            return Err(ProxyError::Config("no upstream configured".to_string()));
        }

        let chain_id = lower
            .get("chainid")
            .and_then(|s| s.parse::<i64>().ok());

        Ok(Self {
            debug,
            upstream_url,
            chain_id,
        })
    }
}
