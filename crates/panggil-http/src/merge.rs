//! Merging of JSON response bodies into a single document.

use crate::value::{Kind, Map, Value};

/// Accumulates top-level fields from successive response bodies.
///
/// Later merges overwrite earlier values for the same field name.
#[derive(Debug, Clone, Default)]
pub struct MergeSession {
    fields: Map,
}

impl MergeSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every top-level field of `body` except those named in `blacklist`.
    ///
    /// A body that is not a JSON object contributes nothing.
    pub fn merge_excluding<S: AsRef<str>>(&mut self, blacklist: &[S], body: &[u8]) {
        let decoded = match Value::decode_object(body) {
            Ok(map) => map,
            Err(e) => {
                tracing::debug!(error = %e, "response body is not a JSON object, nothing merged");
                return;
            }
        };

        for (field, value) in decoded {
            if !blacklist.iter().any(|b| b.as_ref() == field) {
                self.fields.insert(field, value);
            }
        }
    }

    /// Copy only the top-level fields named in `whitelist`.
    ///
    /// Names missing from `body`, or a body that is not a JSON object, store
    /// `null`. Mixed arrays are normalized to the kind of their first element.
    pub fn merge_selecting<S: AsRef<str>>(&mut self, whitelist: &[S], body: &[u8]) {
        let decoded = match Value::decode_object(body) {
            Ok(map) => map,
            Err(e) => {
                tracing::debug!(error = %e, "response body is not a JSON object, selected fields set to null");
                Map::new()
            }
        };

        for field in whitelist {
            let field = field.as_ref();
            let value = match decoded.get(field).cloned() {
                Some(Value::Array(items)) => normalize_array(items),
                Some(value) => value,
                None => Value::Null,
            };
            self.fields.insert(field.to_string(), value);
        }
    }

    /// Encode the accumulated fields as one JSON object.
    pub fn snapshot(&self) -> Vec<u8> {
        // String keys and finite-or-null floats: encoding cannot fail.
        serde_json::to_vec(&self.fields).unwrap_or_else(|_| b"{}".to_vec())
    }

    /// Look up an accumulated field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Number of accumulated fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consume the session, returning the accumulated fields.
    pub fn into_fields(self) -> Map {
        self.fields
    }
}

/// Give an array a single element kind.
///
/// Uniform arrays are returned unchanged. Otherwise the first element picks
/// the target kind and every element is coerced to it; arrays led by a
/// nested array or `null` have no scalar target and are kept as decoded.
fn normalize_array(items: Vec<Value>) -> Value {
    let Some(first) = items.first().map(Value::kind) else {
        return Value::Array(items);
    };

    if items.iter().all(|item| item.kind() == first) {
        return Value::Array(items);
    }

    match first {
        Kind::String | Kind::Integer | Kind::Float | Kind::Bool | Kind::Object => {
            Value::Array(items.into_iter().map(|item| item.coerce(first)).collect())
        }
        Kind::Array | Kind::Null => Value::Array(items),
    }
}
