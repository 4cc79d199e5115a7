use clap::Parser;

/// Process-level settings, resolved from CLI flags falling back to
/// environment variables (spec §6/§4.8's "falling back to process env").
///
/// This is the ambient collaborator the core `Config` trait (§1 "the core
/// consumes ... a config source") is backed by in the full binary; the
/// per-request override layer lives in `config::request::RequestConfig`.
#[derive(Parser, Debug, Clone)]
#[command(name = "sjrpc", about = "Caching reverse proxy for JSON-RPC endpoints")]
pub struct Config {
    /// Port to listen on (spec §6 default listen port).
    #[arg(long, env = "SJRPC_PORT", default_value = "8434")]
    pub port: u16,

    /// Directory the persistent KV store's data lives under.
    #[arg(long, env = "SJRPC_DATA_DIR", default_value = "./database/data")]
    pub data_dir: String,

    /// Default upstream RPC URL, used when a request carries no `rpcurl`
    /// override. Mirrors the original's `SJRPC_URL` env var.
    #[arg(long, env = "SJRPC_URL")]
    pub upstream_url: Option<String>,

    /// Account address returned for `eth_accounts` (spec §6 `ETH_FROM`).
    #[arg(long, env = "ETH_FROM")]
    pub eth_from: Option<String>,

    /// Upstream request timeout in seconds.
    #[arg(long, env = "SJRPC_REQUEST_TIMEOUT", default_value = "10")]
    pub request_timeout: u64,

    /// Enable verbose logging.
    #[arg(short, long, env = "SJRPC_VERBOSE", default_value = "false")]
    pub verbose: bool,
}
