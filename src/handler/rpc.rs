use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::config::RequestConfig;
use crate::jsonrpc::JsonRpcErrorResponse;

use super::AppState;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// `GET /` (spec §6).
pub async fn root_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/html; charset=utf-8")],
        "Hello, This is Save JSON-RPC",
    )
}

/// `OPTIONS /`: CORS preflight, open to any origin (spec §6).
pub async fn options_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            ("access-control-allow-origin", "*"),
            ("access-control-allow-headers", "Origin, Content-Type, Accept"),
            ("access-control-allow-methods", "POST, GET, OPTIONS"),
        ],
    )
}

/// `POST /`: the JSON-RPC entry point (spec §6/§4.6).
pub async fn rpc_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    if !has_json_content_type(&headers) {
        warn!("rejected request with non-json content-type");
        return json_response(400, JsonRpcErrorResponse::invalid_request(0).to_bytes());
    }

    let req_cfg = match RequestConfig::resolve(&params, &state.cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "request config resolution failed");
            return json_response(
                400,
                JsonRpcErrorResponse::new(serde_json::Value::Null, -32000, e.to_string())
                    .to_bytes(),
            );
        }
    };

    let resp = state.engine.handle(&body, &req_cfg).await;
    json_response(resp.status, resp.body)
}

/// `GET /cleanup`: admin reset (spec §4.7).
pub async fn cleanup_handler(State(state): State<AppState>) -> Response {
    match state.admin.cleanup().await {
        Ok(()) => json_response(200, br#"{"status":"ok"}"#.to_vec()),
        Err(e) => {
            warn!(error = %e, "cleanup failed");
            json_response(
                500,
                serde_json::json!({ "status": "error", "error": e.to_string() })
                    .to_string()
                    .into_bytes(),
            )
        }
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

fn json_response(status: u16, body: Vec<u8>) -> Response {
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .header(axum::http::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(axum::body::Body::from(body))
        .expect("response with a fixed set of valid headers always builds")
}
