//! Artifact constructors and the `data:` URI codec.
//!
//! Inline artifacts travel as `data:` URIs. Base64 bodies are preferred on
//! the way out (JSON string characters make percent-encoded bodies ambiguous
//! to eyeball); both base64 and percent-encoded bodies are accepted on the
//! way in — the `;base64` marker in the scheme header decides.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Artifact, ArtifactContent, Part};

/// Creates an artifact with a single inline data part.
pub fn new_data_artifact(name: impl Into<String>, data: Value) -> Artifact {
    Artifact {
        artifact_id: Uuid::new_v4().to_string(),
        name: Some(name.into()),
        mime_type: Some("application/json".to_string()),
        content: ArtifactContent::Parts {
            parts: vec![Part::data(data)],
        },
    }
}

/// Creates an artifact whose JSON body is carried as a base64 `data:` URI.
pub fn new_json_uri_artifact(name: impl Into<String>, data: &Value) -> Result<Artifact> {
    Ok(Artifact {
        artifact_id: Uuid::new_v4().to_string(),
        name: Some(name.into()),
        mime_type: Some("application/json".to_string()),
        content: ArtifactContent::Uri {
            uri: encode_json_data_uri(data)?,
        },
    })
}

/// Encodes a JSON value as `data:application/json;base64,...`.
pub fn encode_json_data_uri(data: &Value) -> Result<String> {
    let body = serde_json::to_vec(data)?;
    Ok(format!(
        "data:application/json;base64,{}",
        BASE64.encode(body)
    ))
}

/// Decodes a `data:` URI body back into bytes.
///
/// Handles both `;base64` and percent-encoded bodies. Fails with
/// `InvalidParams` for non-`data:` URIs or malformed bodies.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::invalid_params(format!("not a data: URI: {}", uri)))?;

    let (header, body) = rest
        .split_once(',')
        .ok_or_else(|| Error::invalid_params("data: URI has no body separator"))?;

    if header.ends_with(";base64") {
        BASE64
            .decode(body)
            .map_err(|e| Error::invalid_params(format!("invalid base64 body: {}", e)))
    } else {
        percent_decode(body)
    }
}

/// Decodes a `data:` URI carrying JSON into a parsed value.
pub fn decode_json_data_uri(uri: &str) -> Result<Value> {
    let bytes = decode_data_uri(uri)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::invalid_params(format!("data: URI body is not valid JSON: {}", e)))
}

/// Percent-decodes a `data:` URI body (RFC 3986 `%XX` escapes, literal bytes
/// otherwise). `+` is passed through — data URIs are not form-encoded.
fn percent_decode(body: &str) -> Result<Vec<u8>> {
    let raw = body.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'%' => {
                let hex = raw
                    .get(i + 1..i + 3)
                    .ok_or_else(|| Error::invalid_params("truncated percent escape"))?;
                let hex = std::str::from_utf8(hex)
                    .map_err(|_| Error::invalid_params("invalid percent escape"))?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|_| Error::invalid_params("invalid percent escape"))?;
                out.push(byte);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base64_round_trip() {
        let data = json!({"sessionId": "s-1", "answer": "two repositories", "n": 42});
        let uri = encode_json_data_uri(&data).unwrap();
        assert!(uri.starts_with("data:application/json;base64,"));

        let back = decode_json_data_uri(&uri).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn percent_encoded_body_decodes() {
        // {"a":"b c"} with the JSON punctuation percent-escaped.
        let uri = "data:application/json,%7B%22a%22%3A%22b%20c%22%7D";
        let value = decode_json_data_uri(uri).unwrap();
        assert_eq!(value, json!({"a": "b c"}));
    }

    #[test]
    fn percent_body_with_literal_characters() {
        let uri = "data:text/plain,hello%2Cworld";
        assert_eq!(decode_data_uri(uri).unwrap(), b"hello,world");
    }

    #[test]
    fn rejects_non_data_uri() {
        assert!(decode_data_uri("https://example.com/x.json").is_err());
    }

    #[test]
    fn rejects_truncated_escape() {
        assert!(decode_data_uri("data:text/plain,abc%2").is_err());
    }

    #[test]
    fn byte_identical_json_round_trip() {
        let data = json!({"answer": "café ☕", "nested": {"list": [1, 2, 3]}});
        let encoded = serde_json::to_vec(&data).unwrap();
        let uri = encode_json_data_uri(&data).unwrap();
        assert_eq!(decode_data_uri(&uri).unwrap(), encoded);
    }
}
