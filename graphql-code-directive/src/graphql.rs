//! Types related to GraphQL field results: errors and responses.

use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Object;
use crate::json_ext::Value;

/// A [GraphQL error](https://spec.graphql.org/October2021/#sec-Errors)
/// as may be found in the `errors` field of a GraphQL [`Response`].
///
/// Converted to (or from) JSON with serde.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    /// The error message.
    pub message: String,

    /// If this is a field error, the response key of that field in [`Response::data`].
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<String>,

    /// The optional GraphQL extensions for this error.
    #[serde(default, skip_serializing_if = "Object::is_empty")]
    pub extensions: Object,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// The result of resolving a set of sibling fields.
///
/// Field failures are localized: a failed field contributes `null` under its
/// response key in [`data`](Response::data) and an entry in
/// [`errors`](Response::errors), while the other fields carry their values.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// The response data, keyed by field alias or name.
    #[serde(skip_serializing_if = "Object::is_empty", default)]
    pub data: Object,

    /// The optional graphql errors encountered.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,
}

impl Response {
    /// The value resolved for `key`, if any.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The first error reported for `key`, if any.
    pub fn error(&self, key: &str) -> Option<&Error> {
        self.errors
            .iter()
            .find(|error| error.path.as_deref() == Some(key))
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn empty_errors_are_not_serialized() {
        let response = Response {
            data: json!({"a": 1}).as_object().cloned().unwrap_or_default(),
            errors: Vec::new(),
        };
        let serialized = serde_json_bytes::to_value(&response).unwrap();
        assert_eq!(serialized, json!({"data": {"a": 1}}));
    }

    #[test]
    fn field_errors_carry_their_path() {
        let response = Response {
            data: Object::default(),
            errors: vec![Error {
                message: "boom".to_string(),
                path: Some("broken".to_string()),
                extensions: Object::default(),
            }],
        };
        assert_eq!(response.error("broken").unwrap().message, "boom");
        assert!(response.error("other").is_none());
    }
}
