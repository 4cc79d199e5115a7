use serde::{Deserialize, Serialize};

/// A parsed client JSON-RPC request (spec §3).
///
/// `params` defaults to an empty vec on missing input and always
/// round-trips as `[]`, never `null` or an omitted field (spec §4.6 edge
/// case). Immutable through a request's lifetime except that `id` is
/// temporarily substituted while fingerprinting (`crate::fingerprint`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RPCRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
    pub id: i64,
}

/// A POST body is either one request object or a batch array of them
/// (spec §4.6 step 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcBody {
    Single(RPCRequest),
    Batch(Vec<RPCRequest>),
}
