//! Deterministic cache keys for outgoing requests.
//!
//! A key is `endpoint?k1=v1&k2=v2` with parameter names sorted, so two
//! parameter sets that differ only in insertion order share one cache slot.
//! Names and values are percent-encoded, which keeps the mapping injective
//! and lets the key double as the request URL.

use std::collections::BTreeMap;

pub fn canonicalize<I, K, V>(endpoint: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect();

    let query = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", endpoint, query)
}
