//! Hierarchical JSON configuration documents.
//!
//! Schemes are configured by a document with `network`, `common`, `data`
//! and per-scheme parameter sections. Caller-supplied documents are merged
//! over built-in defaults RFC-7386 style.

use crate::Error;
use serde_json::{json, Value};

/// Merge `patch` into `base`: objects merge recursively, `null` removes a
/// key, anything else replaces the base value.
pub fn merge_patch(base: &mut Value, patch: &Value) {
    match patch {
        Value::Object(patch_map) => {
            if !base.is_object() {
                *base = json!({});
            }
            let base_map = base.as_object_mut().unwrap();
            for (key, value) in patch_map.iter() {
                if value.is_null() {
                    base_map.remove(key);
                } else {
                    merge_patch(base_map.entry(key.clone()).or_insert(Value::Null), value);
                }
            }
        }
        _ => *base = patch.clone(),
    }
}

/// The built-in default document for ECDH-PSI.
pub fn ecdh_psi_default() -> Value {
    json!({
        "network": {
            "address": "127.0.0.1",
            "remote_port": 30330,
            "local_port": 30331,
            "timeout": 90,
            "scheme": 0
        },
        "common": {
            "ids_num": 1,
            "is_sender": true,
            "verbose": true,
            "memory_psi_scheme": "psi",
            "psi_scheme": "ecdh"
        },
        "data": {
            "input_file": "/data/receiver_input_file.csv",
            "has_header": false,
            "output_file": "/data/receiver_output_file.csv"
        },
        "ecdh_params": {
            "curve_id": 415,
            "obtain_result": true
        }
    })
}

fn missing(pointer: &str) -> Error {
    Error::InvalidArgument(format!("missing or mistyped config key {}", pointer))
}

/// Fetch a boolean at a JSON pointer such as `/common/is_sender`.
pub fn get_bool(params: &Value, pointer: &str) -> Result<bool, Error> {
    params
        .pointer(pointer)
        .and_then(Value::as_bool)
        .ok_or_else(|| missing(pointer))
}

/// Fetch an unsigned integer at a JSON pointer.
pub fn get_u64(params: &Value, pointer: &str) -> Result<u64, Error> {
    params
        .pointer(pointer)
        .and_then(Value::as_u64)
        .ok_or_else(|| missing(pointer))
}

/// Fetch a signed integer at a JSON pointer.
pub fn get_i64(params: &Value, pointer: &str) -> Result<i64, Error> {
    params
        .pointer(pointer)
        .and_then(Value::as_i64)
        .ok_or_else(|| missing(pointer))
}

/// Fetch a float at a JSON pointer. Integer literals are accepted.
pub fn get_f64(params: &Value, pointer: &str) -> Result<f64, Error> {
    params
        .pointer(pointer)
        .and_then(Value::as_f64)
        .ok_or_else(|| missing(pointer))
}

/// Fetch a string at a JSON pointer.
pub fn get_str<'a>(params: &'a Value, pointer: &str) -> Result<&'a str, Error> {
    params
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| missing(pointer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_patch() {
        let mut base = ecdh_psi_default();
        let patch = json!({
            "common": { "is_sender": false },
            "ecdh_params": { "obtain_result": false },
            "data": { "has_header": null }
        });
        merge_patch(&mut base, &patch);
        assert!(!get_bool(&base, "/common/is_sender").unwrap());
        assert!(!get_bool(&base, "/ecdh_params/obtain_result").unwrap());
        // untouched keys survive
        assert_eq!(get_i64(&base, "/ecdh_params/curve_id").unwrap(), 415);
        assert_eq!(get_str(&base, "/network/address").unwrap(), "127.0.0.1");
        // null removes
        assert!(get_bool(&base, "/data/has_header").is_err());
    }

    #[test]
    fn test_missing_key_is_invalid_argument() {
        let doc = json!({ "common": {} });
        match get_bool(&doc, "/common/is_sender") {
            Err(Error::InvalidArgument(_)) => (),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
