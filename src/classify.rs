//! Pure method classifier: maps a JSON-RPC method name to a `CachePolicy`.

/// Caching policy a classified request falls under (spec §3/§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Answer never changes once produced; cache forever.
    Final,
    /// Eventually final; cache only once the response indicates finality.
    AfterFinal,
    /// Valid for a bounded time window (~12s, one block).
    Timely,
    /// Answer derived from the proxy's own process environment.
    Env,
    /// Never cached.
    PassThrough,
}

const FINAL_METHODS: &[&str] = &[
    "eth_gettransactionbyblocknumberandindex",
    "eth_gettransactionbyblockhashandindex",
    "web3_clientversion",
    "web3_sha3",
    "net_version",
    "eth_chainid",
    "eth_getblockbyhash",
    "eth_getblockbynumber",
    "eth_getblocktransactioncountbyhash",
    "eth_getblocktransactioncountbynumber",
];

const AFTER_FINAL_METHODS: &[&str] = &["eth_gettransactionreceipt", "eth_gettransactionbyhash"];

const TIMELY_METHODS: &[&str] = &[
    "eth_getlogs",
    "eth_getcode",
    "eth_gettransactioncount",
    "eth_feehistory",
    "eth_getstorageat",
    "eth_getbalance",
];

const ENV_METHODS: &[&str] = &["eth_accounts"];

/// Classify a method name. Matching is exact but case-insensitive
/// (spec §4.1: "lowercased-exact match"). Unknown methods always take the
/// pass-through path, even if they could in principle be deterministic.
pub fn classify(method: &str) -> CachePolicy {
    let lower = method.to_ascii_lowercase();
    if FINAL_METHODS.contains(&lower.as_str()) {
        CachePolicy::Final
    } else if AFTER_FINAL_METHODS.contains(&lower.as_str()) {
        CachePolicy::AfterFinal
    } else if TIMELY_METHODS.contains(&lower.as_str()) {
        CachePolicy::Timely
    } else if ENV_METHODS.contains(&lower.as_str()) {
        CachePolicy::Env
    } else {
        CachePolicy::PassThrough
    }
}

/// `IsResultFinal` (spec §4.1): returns false iff the raw response body
/// contains any of the literal substrings that mark a pending/absent result.
///
/// This is a raw substring search over the response bytes, not a JSON-aware
/// check, by design — see spec §9's open question. A `"blockNumber":null,`
/// nested in an unrelated inner object would falsely suppress caching; that
/// hazard is preserved rather than fixed, per the spec's resolved decision
/// (DESIGN.md).
pub fn is_result_final(body: &[u8]) -> bool {
    const PENDING_MARKERS: &[&[u8]] = &[
        b"\"result\":null",
        b"\"result\": null",
        b"\"blockNumber\": null,",
        b"\"blockNumber\":null,",
    ];
    !PENDING_MARKERS.iter().any(|marker| contains(body, marker))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
