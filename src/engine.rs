//! Per-batch orchestration: parse -> classify -> lookup/fetch/store ->
//! assemble (spec §4.6). This is the core's single `Handle` entry point.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::classify::{self, CachePolicy};
use crate::clock::Clock;
use crate::config::RequestConfig;
use crate::error::ProxyError;
use crate::fingerprint::{fingerprint, fingerprint_b64};
use crate::jsonrpc::{rewrite_id, JsonRpcBody, JsonRpcErrorResponse, RPCRequest};
use crate::kv::{KvError, KvStore};
use crate::timely::{EphemeralEntry, TimelyCache};
use crate::upstream::UpstreamClient;

/// Namespace every cached request response is stored under (spec §6).
pub const REQUESTS_NAMESPACE: &str = "requests";

pub struct EngineResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

pub struct Engine {
    kv: Arc<RwLock<Arc<dyn KvStore>>>,
    timely: TimelyCache,
    upstream: Arc<dyn UpstreamClient>,
    clock: Arc<dyn Clock>,
    /// Account surfaced for `eth_accounts` (spec §6 `ETH_FROM`), resolved
    /// once from process config rather than re-read from the environment
    /// on every request.
    eth_from: Option<String>,
}

impl Engine {
    pub fn new(
        kv: Arc<RwLock<Arc<dyn KvStore>>>,
        timely: TimelyCache,
        upstream: Arc<dyn UpstreamClient>,
        clock: Arc<dyn Clock>,
        eth_from: Option<String>,
    ) -> Self {
        Self {
            kv,
            timely,
            upstream,
            clock,
            eth_from,
        }
    }

    /// The single abstract entry point spec §1 asks for:
    /// `Handle(request_bytes, query_params, headers) -> response_bytes`.
    /// Query params and headers have already been resolved into `req_cfg`
    /// by the time they reach here (spec §4.8's resolution is an HTTP-layer
    /// concern, injected as a plain value instead of threaded through).
    pub async fn handle(&self, body: &[u8], req_cfg: &RequestConfig) -> EngineResponse {
        let parsed: JsonRpcBody = match serde_json::from_slice(body) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "decode error");
                return EngineResponse {
                    status: 400,
                    body: JsonRpcErrorResponse::new(
                        serde_json::Value::Null,
                        -32700,
                        "decode error",
                    )
                    .to_bytes(),
                };
            }
        };

        match parsed {
            // A single request has a real HTTP status to carry: a dispatch
            // failure surfaces as spec §7 describes (e.g. TransportError ->
            // 500), not folded into a 200 (see `status_for`).
            JsonRpcBody::Single(request) => {
                let (status, fragment) = self.handle_one_top_level(&request, req_cfg).await;
                EngineResponse {
                    status,
                    body: fragment,
                }
            }
            // A JSON array has no per-element HTTP status, so a batch
            // fragment's failure is embedded as a JSON-RPC error object
            // inside the array instead of aborting the whole batch; the
            // envelope status stays 200.
            JsonRpcBody::Batch(requests) => {
                let mut out = Vec::with_capacity(body.len());
                out.push(b'[');
                for (i, request) in requests.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
                    out.extend(self.handle_one_embedded(request, req_cfg).await);
                }
                out.push(b']');
                EngineResponse {
                    status: 200,
                    body: out,
                }
            }
        }
    }

    /// Dispatches a single request through its classified policy (spec
    /// §4.6 step c).
    async fn dispatch(
        &self,
        request: &RPCRequest,
        req_cfg: &RequestConfig,
    ) -> Result<Vec<u8>, ProxyError> {
        let policy = classify::classify(&request.method);
        debug!(method = %request.method, ?policy, "classified request");

        match policy {
            CachePolicy::Final => self.handle_final(request, req_cfg).await,
            CachePolicy::AfterFinal => self.handle_after_final(request, req_cfg).await,
            CachePolicy::Timely => self.handle_timely(request, req_cfg).await,
            CachePolicy::Env => self.handle_env(request).await,
            CachePolicy::PassThrough => self.post_upstream(request, req_cfg).await,
        }
    }

    /// Top-level (non-batch) path: a dispatch failure becomes a real HTTP
    /// status (spec §7), with the client's `id` restored either way (spec
    /// §3 Invariant 6, applied unconditionally — see DESIGN.md Open
    /// Questions #1).
    async fn handle_one_top_level(
        &self,
        request: &RPCRequest,
        req_cfg: &RequestConfig,
    ) -> (u16, Vec<u8>) {
        match self.dispatch(request, req_cfg).await {
            Ok(bytes) => (200, rewrite_id(&bytes, request.id)),
            Err(e) => {
                warn!(method = %request.method, error = %e, "request failed");
                let status = status_for(&e);
                let body =
                    JsonRpcErrorResponse::internal_error(request.id, e.to_string()).to_bytes();
                (status, body)
            }
        }
    }

    /// Batch-fragment path: a dispatch failure is embedded as a JSON-RPC
    /// error object within the array rather than surfaced as an HTTP
    /// status, since a JSON array response carries exactly one status for
    /// every element (spec §4.6).
    async fn handle_one_embedded(&self, request: &RPCRequest, req_cfg: &RequestConfig) -> Vec<u8> {
        match self.dispatch(request, req_cfg).await {
            Ok(bytes) => rewrite_id(&bytes, request.id),
            Err(e) => {
                warn!(method = %request.method, error = %e, "request failed");
                JsonRpcErrorResponse::internal_error(request.id, e.to_string()).to_bytes()
            }
        }
    }

    async fn post_upstream(
        &self,
        request: &RPCRequest,
        req_cfg: &RequestConfig,
    ) -> Result<Vec<u8>, ProxyError> {
        self.upstream.post(&req_cfg.upstream_url, request).await
    }

    async fn handle_final(
        &self,
        request: &RPCRequest,
        req_cfg: &RequestConfig,
    ) -> Result<Vec<u8>, ProxyError> {
        let fp = fingerprint(request, req_cfg.chain_id);

        let cached = {
            let kv = self.kv.read().await;
            kv.get(REQUESTS_NAMESPACE, &fp).await
        };

        match cached {
            Ok(value) => Ok(value),
            Err(KvError::NotFound) => {
                let value = self.post_upstream(request, req_cfg).await?;
                self.insert_ignoring_race(&fp, &value).await?;
                Ok(value)
            }
            Err(e) => Err(ProxyError::Storage(e.to_string())),
        }
    }

    async fn handle_after_final(
        &self,
        request: &RPCRequest,
        req_cfg: &RequestConfig,
    ) -> Result<Vec<u8>, ProxyError> {
        let fp = fingerprint(request, req_cfg.chain_id);

        let cached = {
            let kv = self.kv.read().await;
            kv.get(REQUESTS_NAMESPACE, &fp).await
        };

        match cached {
            Ok(value) => Ok(value),
            Err(KvError::NotFound) => {
                let value = self.post_upstream(request, req_cfg).await?;
                if classify::is_result_final(&value) {
                    self.insert_ignoring_race(&fp, &value).await?;
                }
                Ok(value)
            }
            Err(e) => Err(ProxyError::Storage(e.to_string())),
        }
    }

    async fn insert_ignoring_race(&self, fp: &[u8; 64], value: &[u8]) -> Result<(), ProxyError> {
        let kv = self.kv.read().await;
        match kv.insert(REQUESTS_NAMESPACE, fp, value).await {
            Ok(()) | Err(KvError::AlreadyExists) => Ok(()),
            Err(e) => Err(ProxyError::Storage(e.to_string())),
        }
    }

    async fn handle_timely(
        &self,
        request: &RPCRequest,
        req_cfg: &RequestConfig,
    ) -> Result<Vec<u8>, ProxyError> {
        let fp = fingerprint(request, req_cfg.chain_id);
        let key_b64 = fingerprint_b64(&fp);
        let now = self.clock.now_unix();

        if let Some(entry) = self.timely.load(&key_b64).await {
            if entry.is_still_valid(now) {
                return Ok(entry.response.clone());
            }
        }

        let (block_number, when) = self.upstream.latest_block(&req_cfg.upstream_url).await?;
        let value = self.post_upstream(request, req_cfg).await?;

        let entry = Arc::new(EphemeralEntry {
            originating_request: request.clone(),
            response: value.clone(),
            block_number,
            when,
        });
        self.timely.swap(key_b64, entry).await;

        Ok(value)
    }

    async fn handle_env(&self, request: &RPCRequest) -> Result<Vec<u8>, ProxyError> {
        if !request.method.eq_ignore_ascii_case("eth_accounts") {
            // Spec §4.6: any Env method other than eth_accounts is
            // pass-through today (no other Env method is classified, but
            // this keeps the dispatch total if that ever changes).
            return Err(ProxyError::Transport(
                "unsupported env method, no upstream call configured".to_string(),
            ));
        }

        let accounts = match &self.eth_from {
            Some(addr) => vec![addr.clone()],
            None => vec![],
        };

        let body = serde_json::json!({
            "jsonrpc": request.jsonrpc,
            "id": request.id,
            "result": accounts,
        });
        Ok(serde_json::to_vec(&body)?)
    }
}

/// HTTP status for a top-level dispatch failure (spec §7): transport,
/// conversion, and storage errors are server-side failures (500);
/// config/decode errors are the caller's fault (400). Neither `Engine`
/// variant produces `Config`/`Decode` today (those are caught earlier, in
/// `RequestConfig::resolve` and `Engine::handle`'s parse step
/// respectively) but the mapping stays total in case that changes.
fn status_for(e: &ProxyError) -> u16 {
    match e {
        ProxyError::Config(_) | ProxyError::Decode(_) => 400,
        ProxyError::Transport(_)
        | ProxyError::Conversion(_)
        | ProxyError::Storage(_)
        | ProxyError::Json(_) => 500,
    }
}
