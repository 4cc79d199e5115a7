//! Canonical serialization and BLAKE2b-512 hashing of a classified request
//! (spec §4.2). The fingerprint is independent of the client-assigned `id`
//! so that two requests differing only in `id` share a cache slot.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use blake2::Blake2b512;
use blake2::Digest;
use serde::Serialize;

use crate::jsonrpc::RPCRequest;

/// The exact byte layout hashed for a cache key: field order
/// `jsonrpc, method, params, id`, with `id` replaced by the chain-id
/// override (or `1` if none is active).
#[derive(Serialize)]
struct CanonicalRequest<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: &'a [serde_json::Value],
    id: i64,
}

/// 64-byte BLAKE2b-512 digest of `request`'s canonical form.
///
/// `chain_id_override` separates the keyspace of a proxy serving multiple
/// chains; its absence is synthesized as `id = 1`, so `chainId=1` and no
/// override at all produce identical fingerprints (spec §8 boundary case).
pub fn fingerprint(request: &RPCRequest, chain_id_override: Option<i64>) -> [u8; 64] {
    let canonical = CanonicalRequest {
        jsonrpc: &request.jsonrpc,
        method: &request.method,
        params: &request.params,
        id: chain_id_override.unwrap_or(1),
    };
    let bytes = serde_json::to_vec(&canonical).expect("canonical request always serializes");

    let mut hasher = Blake2b512::new();
    hasher.update(&bytes);
    hasher.finalize().into()
}

/// Base64 form used for `TimelyCache` keys and log fields only (spec §4.2).
pub fn fingerprint_b64(fp: &[u8; 64]) -> String {
    BASE64.encode(fp)
}
