pub mod admin;
pub mod classify;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod handler;
pub mod jsonrpc;
pub mod kv;
pub mod timely;
pub mod upstream;
