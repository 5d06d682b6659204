//! Canonical content digests for audit entries.
//!
//! A digest is `sha256:` followed by the first 16 hex characters of the
//! SHA-256 of the canonical JSON form of a value. Canonical form sorts
//! object keys recursively and uses compact separators, so two values that
//! differ only in key insertion order produce the same digest.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Prefix carried by every digest string.
pub const DIGEST_PREFIX: &str = "sha256:";

/// Number of hex characters kept from the full SHA-256.
pub const DIGEST_HEX_LEN: usize = 16;

/// Serialize a JSON value with object keys sorted at every level.
///
/// Does not rely on `serde_json::Map` ordering: the `preserve_order`
/// feature may be switched on anywhere in the dependency graph.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Compute the truncated content digest of a JSON value.
pub fn content_digest(value: &Value) -> String {
    let hash = Sha256::digest(canonical_json(value).as_bytes());
    let hex = format!("{:x}", hash);
    format!("{}{}", DIGEST_PREFIX, &hex[..DIGEST_HEX_LEN])
}

/// True if `s` has the shape of a digest produced by [`content_digest`].
pub fn is_digest(s: &str) -> bool {
    s.strip_prefix(DIGEST_PREFIX).is_some_and(|hex| {
        hex.len() == DIGEST_HEX_LEN && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn digest_has_fixed_shape() {
        let d = content_digest(&json!({"contract_id": "CNT-2024-001"}));
        assert!(d.starts_with("sha256:"));
        assert_eq!(d.len(), DIGEST_PREFIX.len() + DIGEST_HEX_LEN);
        assert!(is_digest(&d));
    }

    #[test]
    fn digest_ignores_key_insertion_order() {
        let mut a = Map::new();
        a.insert("vendor".to_string(), json!("ABC"));
        a.insert("score".to_string(), json!(81.5));
        a.insert("nested".to_string(), json!({"z": 1, "a": [1, 2]}));

        let mut b = Map::new();
        b.insert("nested".to_string(), json!({"a": [1, 2], "z": 1}));
        b.insert("score".to_string(), json!(81.5));
        b.insert("vendor".to_string(), json!("ABC"));

        assert_eq!(
            content_digest(&Value::Object(a)),
            content_digest(&Value::Object(b))
        );
    }

    #[test]
    fn digest_is_stable_across_calls() {
        let v = json!({"status": "completed", "steps": [{"agent": "data_intake"}]});
        assert_eq!(content_digest(&v), content_digest(&v));
    }

    #[test]
    fn digest_distinguishes_content() {
        assert_ne!(
            content_digest(&json!({"a": 1})),
            content_digest(&json!({"a": 2}))
        );
        // Array order is significant.
        assert_ne!(
            content_digest(&json!([1, 2])),
            content_digest(&json!([2, 1]))
        );
    }

    #[test]
    fn canonical_form_sorts_and_compacts() {
        let v = json!({"b": {"y": true, "x": null}, "a": "q\"uote"});
        assert_eq!(
            canonical_json(&v),
            r#"{"a":"q\"uote","b":{"x":null,"y":true}}"#
        );
    }

    #[test]
    fn is_digest_rejects_malformed() {
        assert!(!is_digest("sha256:xyz"));
        assert!(!is_digest("md5:0123456789abcdef"));
        assert!(!is_digest("sha256:0123456789abcdef0"));
    }
}
