use std::fmt;

/// Error taxonomy for the proxy core (spec §7).
///
/// Recoverable locally: `NotFound` (KV miss) and `AlreadyExists` (benign
/// insert race) — both handled inside `Engine`/`kv` and never reach here.
/// Everything below is surfaced to the client unretried; the core never
/// retries an upstream call itself.
#[derive(Debug)]
pub enum ProxyError {
    /// No upstream URL could be resolved for this request.
    Config(String),
    /// Request body was neither a JSON-RPC object nor an array of objects.
    Decode(String),
    /// The upstream HTTP call failed (network, non-2xx, bad body).
    Transport(String),
    /// `latestBlock()` could not parse a hex number/timestamp.
    Conversion(String),
    /// KV store error other than `NotFound`/`AlreadyExists`.
    Storage(String),
    /// Failed to serialize/deserialize JSON.
    Json(serde_json::Error),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Conversion(e) => write!(f, "conversion error: {e}"),
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
