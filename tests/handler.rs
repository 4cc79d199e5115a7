use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use clap::Parser;
use tokio::sync::RwLock;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use sjrpc::admin::Admin;
use sjrpc::config::Config;
use sjrpc::engine::Engine;
use sjrpc::handler::{router, AppState};
use sjrpc::kv::{KvStore, SledStore};
use sjrpc::timely::TimelyCache;
use sjrpc::upstream::ReqwestUpstream;

fn cli(upstream: &str) -> Config {
    let mut cfg = Config::parse_from(["sjrpc"]);
    cfg.upstream_url = Some(upstream.to_string());
    cfg
}

async fn setup(upstream_uri: &str) -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SledStore::open(dir.path()).await.unwrap();
    let kv: Arc<RwLock<Arc<dyn KvStore>>> = Arc::new(RwLock::new(Arc::new(store)));

    let upstream = Arc::new(ReqwestUpstream::new(Duration::from_secs(5)));
    let timely = TimelyCache::new();
    let clock = Arc::new(sjrpc::clock::SystemClock);
    let cli = cli(upstream_uri);

    let engine = Arc::new(Engine::new(
        kv.clone(),
        timely,
        upstream,
        clock,
        cli.eth_from.clone(),
    ));
    let admin = Arc::new(Admin::new(kv, dir.path().to_path_buf()));

    let state = AppState {
        engine,
        admin,
        cli: Arc::new(cli),
    };

    (router(state), dir)
}

async fn post(app: axum::Router, body: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let body: serde_json::Value = serde_json::from_slice(
        &axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap(),
    )
    .unwrap();
    (status, body)
}

#[tokio::test]
async fn get_root_serves_greeting() {
    let (app, _dir) = setup("http://127.0.0.1:1").await;
    let resp = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"Hello, This is Save JSON-RPC");
}

#[tokio::test]
async fn options_root_is_empty_cors_preflight() {
    let (app, _dir) = setup("http://127.0.0.1:1").await;
    let resp = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn post_without_json_content_type_is_rejected() {
    let (app, _dir) = setup("http://127.0.0.1:1").await;
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

/// S1 — a Final method is fetched once from upstream, then served from cache.
#[tokio::test]
async fn final_method_hits_cache_on_second_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": "0x1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _dir) = setup(&server.uri()).await;

    let (status, body) = post(
        app.clone(),
        r#"{"jsonrpc":"2.0","method":"eth_chainId","params":[],"id":42}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 42);
    assert_eq!(body["result"], "0x1");

    let (status, body) = post(
        app,
        r#"{"jsonrpc":"2.0","method":"eth_chainId","params":[],"id":99}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 99);
    assert_eq!(body["result"], "0x1");
}

/// S2 — AfterFinal: a pending result is never stored; a final result is.
#[tokio::test]
async fn after_final_only_caches_once_result_is_final() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": null
        })))
        .up_to_n_times(1)
        .priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": {"blockNumber": "0x10"}
        })))
        .priority(2)
        .mount(&server)
        .await;

    let (app, _dir) = setup(&server.uri()).await;
    let req = r#"{"jsonrpc":"2.0","method":"eth_getTransactionReceipt","params":["0xdead"],"id":1}"#;

    let (_, body) = post(app.clone(), req).await;
    assert!(body["result"].is_null());

    let (_, body) = post(app.clone(), req).await;
    assert_eq!(body["result"]["blockNumber"], "0x10");

    let (_, body) = post(app, req).await;
    assert_eq!(body["result"]["blockNumber"], "0x10");
}

/// S4 — Env method is synthesized locally, no upstream call made.
#[tokio::test]
async fn env_method_never_calls_upstream() {
    let server = MockServer::start().await;
    // No mock mounted: any request made to the server is a hard failure.

    let dir = tempfile::tempdir().unwrap();
    let store = SledStore::open(dir.path()).await.unwrap();
    let kv: Arc<RwLock<Arc<dyn KvStore>>> = Arc::new(RwLock::new(Arc::new(store)));
    let upstream = Arc::new(ReqwestUpstream::new(Duration::from_secs(5)));
    let timely = TimelyCache::new();
    let clock = Arc::new(sjrpc::clock::SystemClock);
    let mut cli = cli(&server.uri());
    cli.eth_from = Some("0xabc".to_string());

    let engine = Arc::new(Engine::new(
        kv.clone(),
        timely,
        upstream,
        clock,
        cli.eth_from.clone(),
    ));
    let admin = Arc::new(Admin::new(kv, dir.path().to_path_buf()));
    let app = router(AppState {
        engine,
        admin,
        cli: Arc::new(cli),
    });

    let (status, body) = post(
        app,
        r#"{"jsonrpc":"2.0","method":"eth_accounts","params":[],"id":7}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 7);
    assert_eq!(body["result"], serde_json::json!(["0xabc"]));
}

/// S5 — batch requests preserve order and mix cache policies.
#[tokio::test]
async fn batch_preserves_order_across_mixed_policies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": "0x1"
        })))
        .mount(&server)
        .await;

    let (app, _dir) = setup(&server.uri()).await;

    let (status, body) = post(
        app,
        r#"[{"jsonrpc":"2.0","method":"eth_chainId","params":[],"id":1},
            {"jsonrpc":"2.0","method":"eth_blockNumber","params":[],"id":2}]"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let arr = body.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["id"], 1);
    assert_eq!(arr[1]["id"], 2);
}

#[tokio::test]
async fn malformed_body_returns_decode_error() {
    let (app, _dir) = setup("http://127.0.0.1:1").await;
    let (status, body) = post(app, "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32700);
}

/// A single request whose upstream call fails surfaces a real 500, not a
/// 200 with an embedded JSON-RPC error (spec §7: TransportError -> 500).
#[tokio::test]
async fn single_request_upstream_failure_is_a_500() {
    // Nothing is listening on this port, so every upstream call fails fast.
    let (app, _dir) = setup("http://127.0.0.1:1").await;
    let (status, body) = post(
        app,
        r#"{"jsonrpc":"2.0","method":"eth_chainId","params":[],"id":1}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["id"], 1);
    assert!(body["error"].is_object());
}

/// The same failure inside a batch stays embedded in the array at 200,
/// since a JSON array response has no per-element HTTP status.
#[tokio::test]
async fn batch_upstream_failure_is_embedded_not_a_500() {
    let (app, _dir) = setup("http://127.0.0.1:1").await;
    let (status, body) = post(
        app,
        r#"[{"jsonrpc":"2.0","method":"eth_chainId","params":[],"id":1}]"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let arr = body.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["id"], 1);
    assert!(arr[0]["error"].is_object());
}

/// Cleanup wipes a previously cached Final key.
#[tokio::test]
async fn cleanup_clears_final_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": "0x1"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let (app, _dir) = setup(&server.uri()).await;
    let req = r#"{"jsonrpc":"2.0","method":"eth_chainId","params":[],"id":1}"#;

    let (_, _) = post(app.clone(), req).await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/cleanup")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (_, _) = post(app, req).await;
}
