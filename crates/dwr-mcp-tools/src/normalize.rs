//! Query parameter normalization.

use rmcp::model::JsonObject;
use serde_json::Value;

/// Drop every entry whose value is `null`.
///
/// Only true absence is filtered: `0`, `""`, `false`, empty arrays and objects are kept as-is.
/// Nested values are not touched.
#[must_use]
pub fn normalize_params(params: JsonObject) -> JsonObject {
    params
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .collect()
}

/// Like [`normalize_params`], but for an arbitrary JSON value.
///
/// `null` (no arguments at all) becomes an empty object; other non-object values are returned as
/// `None` so the caller can reject them.
pub(crate) fn normalize_value(value: Option<Value>) -> Option<JsonObject> {
    match value {
        None | Some(Value::Null) => Some(JsonObject::new()),
        Some(Value::Object(map)) => Some(normalize_params(map)),
        Some(_) => None,
    }
}
