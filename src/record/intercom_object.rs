//! IntercomObject - one record as delivered by the Intercom API

use super::raw_result::{json_type_name, NormalizedRecord, ToMapping};
use crate::{ConnectorError, ConnectorResult};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of Intercom object, taken from its `type` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    User,
    /// Leads are delivered with `"type": "contact"`
    Contact,
    Company,
    Admin,
    Team,
    Tag,
    Segment,
    Conversation,
    Note,
    Event,
    /// A `type` this crate has no dedicated variant for
    Other(String),
    /// Object without a `type` attribute
    Untyped,
}

impl ObjectKind {
    /// Parse the value of a `type` attribute
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            "user" => ObjectKind::User,
            "contact" | "lead" => ObjectKind::Contact,
            "company" => ObjectKind::Company,
            "admin" => ObjectKind::Admin,
            "team" => ObjectKind::Team,
            "tag" => ObjectKind::Tag,
            "segment" => ObjectKind::Segment,
            "conversation" => ObjectKind::Conversation,
            "note" => ObjectKind::Note,
            "event" => ObjectKind::Event,
            other => ObjectKind::Other(other.to_string()),
        }
    }

    /// The `type` tag this kind is delivered with
    pub fn type_tag(&self) -> Option<&str> {
        match self {
            ObjectKind::User => Some("user"),
            ObjectKind::Contact => Some("contact"),
            ObjectKind::Company => Some("company"),
            ObjectKind::Admin => Some("admin"),
            ObjectKind::Team => Some("team"),
            ObjectKind::Tag => Some("tag"),
            ObjectKind::Segment => Some("segment"),
            ObjectKind::Conversation => Some("conversation"),
            ObjectKind::Note => Some("note"),
            ObjectKind::Event => Some("event"),
            ObjectKind::Other(tag) => Some(tag),
            ObjectKind::Untyped => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_tag().unwrap_or("untyped"))
    }
}

/// An Intercom API object: its kind plus every attribute the API returned
///
/// Attributes are kept exactly as delivered, nested objects and lists included,
/// in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub struct IntercomObject {
    kind: ObjectKind,
    attributes: Map<String, Value>,
}

impl IntercomObject {
    /// Build an object from an attribute map, reading its kind from `type`
    pub fn from_attributes(attributes: Map<String, Value>) -> Self {
        let kind = match attributes.get("type") {
            Some(Value::String(tag)) => ObjectKind::from_type_tag(tag),
            _ => ObjectKind::Untyped,
        };
        Self { kind, attributes }
    }

    /// Get the object kind
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Access all attributes
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Get a specific attribute
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    /// The object's `id`, rendered as a string
    pub fn id(&self) -> Option<String> {
        match self.attributes.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl TryFrom<Value> for IntercomObject {
    type Error = ConnectorError;

    fn try_from(value: Value) -> ConnectorResult<Self> {
        match value {
            Value::Object(attributes) => Ok(Self::from_attributes(attributes)),
            other => Err(ConnectorError::Serialization(format!(
                "Intercom object must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

impl ToMapping for IntercomObject {
    fn to_mapping(&self) -> ConnectorResult<NormalizedRecord> {
        Ok(self.attributes.clone())
    }
}

impl Serialize for IntercomObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_from_type_attribute() {
        let user = IntercomObject::try_from(json!({"type": "user", "id": "5a1"})).unwrap();
        assert_eq!(user.kind(), &ObjectKind::User);

        let lead = IntercomObject::try_from(json!({"type": "contact", "id": "l1"})).unwrap();
        assert_eq!(lead.kind(), &ObjectKind::Contact);

        let visitor = IntercomObject::try_from(json!({"type": "visitor"})).unwrap();
        assert_eq!(visitor.kind(), &ObjectKind::Other("visitor".to_string()));
        assert_eq!(visitor.kind().to_string(), "visitor");

        let bare = IntercomObject::try_from(json!({"id": 3})).unwrap();
        assert_eq!(bare.kind(), &ObjectKind::Untyped);
    }

    #[test]
    fn test_to_mapping_keeps_nested_values_and_order() {
        let object = IntercomObject::try_from(json!({
            "type": "user",
            "id": "5a1",
            "custom_attributes": {"plan": "pro"},
            "tags": {"type": "tag.list", "tags": [{"type": "tag", "name": "vip"}]},
            "updated_at": 1700000000
        }))
        .unwrap();

        let record = object.to_mapping().unwrap();
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            vec!["type", "id", "custom_attributes", "tags", "updated_at"]
        );
        assert_eq!(record["custom_attributes"]["plan"], "pro");
        assert_eq!(record["tags"]["tags"][0]["name"], "vip");
    }

    #[test]
    fn test_id_rendering() {
        let numeric = IntercomObject::try_from(json!({"id": 42})).unwrap();
        assert_eq!(numeric.id(), Some("42".to_string()));

        let missing = IntercomObject::try_from(json!({"name": "x"})).unwrap();
        assert_eq!(missing.id(), None);
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(IntercomObject::try_from(json!("user")).is_err());
    }

    #[test]
    fn test_serializes_as_attributes() {
        let object = IntercomObject::try_from(json!({"type": "tag", "name": "vip"})).unwrap();
        assert_eq!(
            serde_json::to_string(&object).unwrap(),
            r#"{"type":"tag","name":"vip"}"#
        );
    }
}
