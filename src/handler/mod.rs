mod rpc;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::admin::Admin;
use crate::config::Config;
use crate::engine::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub admin: Arc<Admin>,
    pub cli: Arc<Config>,
}

/// Builds the HTTP surface spec §6 describes: `/` serves the JSON-RPC entry
/// point (plus a friendly `GET`/CORS preflight), `/cleanup` serves Admin.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(rpc::root_handler).options(rpc::options_handler).post(rpc::rpc_handler))
        .route("/cleanup", get(rpc::cleanup_handler))
        .with_state(state)
}
