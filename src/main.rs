use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::RwLock;
use tracing::info;

use sjrpc::admin::Admin;
use sjrpc::config::Config;
use sjrpc::engine::Engine;
use sjrpc::handler::{router, AppState};
use sjrpc::kv::{KvStore, SledStore};
use sjrpc::timely::TimelyCache;
use sjrpc::upstream::ReqwestUpstream;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    let log_level = if config.verbose {
        "debug,hyper=info,reqwest=info"
    } else {
        "warn,sjrpc=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    info!(
        port = %config.port,
        data_dir = %config.data_dir,
        upstream_url = ?config.upstream_url,
        request_timeout = %config.request_timeout,
        verbose = config.verbose,
        "starting sjrpc"
    );

    let store = SledStore::open(&config.data_dir)
        .await
        .expect("failed to open KV store");
    let kv: Arc<RwLock<Arc<dyn KvStore>>> = Arc::new(RwLock::new(Arc::new(store)));

    let upstream = Arc::new(ReqwestUpstream::new(Duration::from_secs(
        config.request_timeout,
    )));
    let timely = TimelyCache::new();
    let clock = Arc::new(sjrpc::clock::SystemClock);

    let engine = Arc::new(Engine::new(
        kv.clone(),
        timely,
        upstream,
        clock,
        config.eth_from.clone(),
    ));
    let admin = Arc::new(Admin::new(kv, config.data_dir.clone().into()));

    let state = AppState {
        engine,
        admin,
        cli: Arc::new(config.clone()),
    };

    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!(addr = %addr, "sjrpc listening");
    axum::serve(listener, app).await.expect("server error");
}
