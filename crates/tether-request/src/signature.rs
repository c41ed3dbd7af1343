//! Request signatures.

use std::fmt;

use serde_json::Value;
use tether_core::Method;

/// Stable identity of a request: a blake3 hex digest of
/// `METHOD \n url \n canonical-body`.
///
/// The body is serialized with object keys sorted at every level, so two
/// bodies that differ only in key order share a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestSignature(String);

impl RequestSignature {
    /// Compute the signature of a request.
    #[must_use]
    pub fn compute(method: Method, url: &str, body: Option<&Value>) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(method.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(url.as_bytes());
        hasher.update(b"\n");
        if let Some(body) = body {
            hasher.update(canonical_json(body).as_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// JSON text with object keys sorted lexicographically at every level.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        },
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_matter() {
        let a = json!({"b": 1, "a": {"y": [1, 2], "x": null}});
        let b = json!({"a": {"x": null, "y": [1, 2]}, "b": 1});
        assert_eq!(canonical_json(&a), r#"{"a":{"x":null,"y":[1,2]},"b":1}"#);
        assert_eq!(
            RequestSignature::compute(Method::Post, "https://h/x", Some(&a)),
            RequestSignature::compute(Method::Post, "https://h/x", Some(&b)),
        );
    }

    #[test]
    fn method_url_and_body_all_count() {
        let base = RequestSignature::compute(Method::Get, "https://h/threads", None);
        assert_ne!(
            base,
            RequestSignature::compute(Method::Delete, "https://h/threads", None)
        );
        assert_ne!(
            base,
            RequestSignature::compute(Method::Get, "https://h/threads?page=2", None)
        );
        assert_ne!(
            base,
            RequestSignature::compute(Method::Get, "https://h/threads", Some(&json!({})))
        );
    }

    #[test]
    fn signature_is_hex_digest() {
        let sig = RequestSignature::compute(Method::Get, "https://h/", None);
        assert_eq!(sig.as_str().len(), 64);
        assert!(sig.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(sig.to_string(), sig.as_str());
    }

    #[test]
    fn strings_are_escaped() {
        let body = json!({"quote\"key": "line\nbreak"});
        assert_eq!(canonical_json(&body), r#"{"quote\"key":"line\nbreak"}"#);
    }
}
