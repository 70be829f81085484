//! JSON:API resource objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single JSON:API resource object.
///
/// The `id` is owned by the storage layer: it is empty on a create request and
/// filled in by whatever backend handles the save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(rename = "type")]
    pub object_type: String,

    #[serde(default)]
    pub attributes: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Map<String, Value>>,
}

/// An ordered collection of resource objects.
pub type List = Vec<Object>;

impl Object {
    /// Creates an object with no attributes.
    pub fn new(id: impl Into<String>, object_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object_type: object_type.into(),
            ..Default::default()
        }
    }

    /// Creates an object whose attributes are the serialized form of `attributes`.
    ///
    /// `attributes` must serialize to a JSON object (or `null`, which yields no
    /// attributes).
    pub fn with_attributes<T: Serialize>(
        id: impl Into<String>,
        object_type: impl Into<String>,
        attributes: &T,
    ) -> Result<Self, serde_json::Error> {
        let attributes = match serde_json::to_value(attributes)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(serde::ser::Error::custom(format!(
                    "attributes must serialize to a JSON object, got {other}"
                )))
            }
        };

        Ok(Self {
            attributes,
            ..Self::new(id, object_type)
        })
    }

    /// Returns a single attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Sets a single attribute, replacing any previous value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Deserializes the attributes into a typed value.
    pub fn unmarshal<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.attributes.clone()))
    }
}
