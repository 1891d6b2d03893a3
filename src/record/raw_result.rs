//! RawResult - what an API session hands back before filtering

use crate::{ConnectorError, ConnectorResult};
use serde_json::{Map, Value};

/// A record flattened to field name → JSON value
///
/// Field order is the order the API delivered (or the projection order after
/// filtering). Every value is a `serde_json::Value`, so the record is always
/// serializable on its own.
pub type NormalizedRecord = Map<String, Value>;

/// Conversion of an API record into a [`NormalizedRecord`]
pub trait ToMapping {
    /// Produce the full field mapping of this record
    ///
    /// # Errors
    ///
    /// Return `ConnectorError::Serialization` when the record has no mapping shape
    fn to_mapping(&self) -> ConnectorResult<NormalizedRecord>;
}

impl ToMapping for Map<String, Value> {
    fn to_mapping(&self) -> ConnectorResult<NormalizedRecord> {
        Ok(self.clone())
    }
}

impl ToMapping for Value {
    fn to_mapping(&self) -> ConnectorResult<NormalizedRecord> {
        match self {
            Value::Object(map) => Ok(map.clone()),
            other => Err(ConnectorError::Serialization(format!(
                "expected a JSON object record, got {}",
                json_type_name(other)
            ))),
        }
    }
}

/// Result of one API call: a single object or an ordered collection
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult<T> {
    /// `find`-style result
    Single(T),
    /// List-style result, in API order
    Collection(Vec<T>),
}

impl<T> RawResult<T> {
    /// Check if this is a single-object result
    pub fn is_single(&self) -> bool {
        matches!(self, RawResult::Single(_))
    }

    /// Number of objects carried
    pub fn len(&self) -> usize {
        match self {
            RawResult::Single(_) => 1,
            RawResult::Collection(items) => items.len(),
        }
    }

    /// Check if no object is carried
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> From<Vec<T>> for RawResult<T> {
    fn from(items: Vec<T>) -> Self {
        RawResult::Collection(items)
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
