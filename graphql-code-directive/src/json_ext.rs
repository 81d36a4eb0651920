//! JSON aliases shared across the crate.

pub use serde_json_bytes::Value;

/// A JSON object keyed by byte strings, matching [`Value::Object`].
pub type Object = serde_json_bytes::Map<serde_json_bytes::ByteString, Value>;
