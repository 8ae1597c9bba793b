use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Parameters that are sent but never part of the signed payload.
const UNSIGNED_PARAMS: [&str; 5] = [
    "file",
    "cloud_name",
    "resource_type",
    "api_key",
    "signature_algorithm",
];

/// SHA-256 request signature: `k=v` pairs sorted by key, joined with `&`,
/// followed by the API secret, hex encoded.
pub fn sign(params: &BTreeMap<String, String>, api_secret: &str) -> String {
    let payload = params
        .iter()
        .filter(|(key, value)| !UNSIGNED_PARAMS.contains(&key.as_str()) && !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
