//! The marketplace answers with `{ success, data | message }`, but older
//! endpoints return bare payloads or name the collection (`{ plans: [...] }`).
//! Everything is normalized here so callers only see typed values.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiError;

pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

/// Decode a successful response body into `T`.
pub fn normalize<T: DeserializeOwned>(body: Value, collection_keys: &[&str]) -> Result<T, ApiError> {
    if let Value::Object(map) = &body {
        if map.get("success") == Some(&Value::Bool(false)) {
            return Err(ApiError::Unsuccessful(extract_message(&body)));
        }
    }
    let payload = unwrap_payload(body, collection_keys);
    serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
}

fn unwrap_payload(mut body: Value, collection_keys: &[&str]) -> Value {
    if let Value::Object(map) = &mut body {
        if let Some(data) = map.remove("data").filter(|d| !d.is_null()) {
            return unwrap_payload(data, collection_keys);
        }
        for key in collection_keys {
            if let Some(items) = map.remove(*key) {
                return items;
            }
        }
    }
    body
}

/// Best-effort message from any of the error shapes the API has used.
pub fn extract_message(body: &Value) -> String {
    let candidates = [
        body.get("message"),
        body.get("error").filter(|e| e.is_string()),
        body.get("error").and_then(|e| e.get("message")),
        body.get("errors")
            .and_then(|e| e.get(0))
            .and_then(|e| e.get("message").or_else(|| e.get("msg"))),
        body.get("data").and_then(|d| d.get("message")),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
        .or_else(|| body.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
        .unwrap_or_else(|| GENERIC_ERROR.to_string())
}
