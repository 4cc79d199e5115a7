use std::sync::LazyLock;

use regex::bytes::Regex;
use serde::Serialize;

/// JSON-RPC 2.0 error object, used only for responses the proxy itself
/// synthesizes (parse/invalid-request/internal errors) — cached/forwarded
/// upstream responses are passed through as raw bytes instead.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: &'static str,
    pub error: JsonRpcError,
    pub id: serde_json::Value,
}

impl JsonRpcErrorResponse {
    pub fn new(id: serde_json::Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            error: JsonRpcError {
                code,
                message: message.into(),
            },
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(serde_json::Value::Null, -32700, "Parse error")
    }

    pub fn invalid_request(id: i64) -> Self {
        Self::new(serde_json::Value::from(id), -32600, "Invalid request")
    }

    pub fn internal_error(id: i64, message: impl Into<String>) -> Self {
        Self::new(serde_json::Value::from(id), -32603, message.into())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("error response always serializes")
    }
}

static ID_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""id":[0-9]+"#).expect("valid regex"));

/// Rewrite the first `"id":<digits>` occurrence in a raw response body to the
/// caller's own id (spec §4.6 step d).
///
/// This matches the first occurrence anywhere in the body, including inside
/// nested fields — a known fragility the spec calls out (§9 design notes) in
/// favor of parsing and reserializing. Preserved literally because the spec
/// treats this as the reference behavior, not a bug to fix silently.
pub fn rewrite_id(body: &[u8], id: i64) -> Vec<u8> {
    let replacement = format!(r#""id":{id}"#);
    ID_FIELD
        .replacen(body, 1, replacement.as_bytes())
        .into_owned()
}
