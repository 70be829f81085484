//! Top-level JSON:API document codec.
//!
//! Two directions:
//! - [`decode_object`] turns a request body into an [`Object`], validating the
//!   document shape and the resource type.
//! - [`encode`] turns a [`Sendable`] into a response body and status.
//!
//! [`Document`] is the owned, client-side view of a response body; it is what
//! tests and Rust clients parse responses into.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{ErrorObject, Failure};
use crate::object::{List, Object};

/// JSON:API media type.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

const JSONAPI_VERSION: &str = "1.0";

/// Anything the dispatcher can put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Sendable {
    Object(Object),
    List(List),
    Failure(Failure),
    /// Success with no document, e.g. after a delete.
    Empty,
}

impl From<Object> for Sendable {
    fn from(object: Object) -> Self {
        Sendable::Object(object)
    }
}

impl From<List> for Sendable {
    fn from(list: List) -> Self {
        Sendable::List(list)
    }
}

impl From<Failure> for Sendable {
    fn from(failure: Failure) -> Self {
        Sendable::Failure(failure)
    }
}

impl From<ErrorObject> for Sendable {
    fn from(error: ErrorObject) -> Self {
        Sendable::Failure(Failure::Single(error))
    }
}

/// An encoded response: status plus body bytes (empty for [`Sendable::Empty`]).
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDocument {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Failure while encoding a response document.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid response status: {status}")]
    InvalidStatus { status: u16 },
}

impl EncodeError {
    /// Every encoding failure is a server fault.
    pub fn status(&self) -> u16 {
        500
    }
}

#[derive(Serialize)]
struct JsonApi {
    version: &'static str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum DataRef<'a> {
    One(&'a Object),
    Many(&'a [Object]),
}

#[derive(Serialize)]
struct TopLevelRef<'a> {
    jsonapi: JsonApi,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<DataRef<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [ErrorObject]>,
}

/// Encodes a sendable.
///
/// `status` is used for success payloads; failures always use the status of
/// their leading error.
pub fn encode(sendable: &Sendable, status: u16) -> Result<EncodedDocument, EncodeError> {
    let (status, document) = match sendable {
        Sendable::Object(object) => (status, Some(top_level(Some(DataRef::One(object)), None))),
        Sendable::List(list) => (status, Some(top_level(Some(DataRef::Many(list)), None))),
        Sendable::Failure(failure) => (
            failure.status(),
            Some(top_level(None, Some(failure.errors()))),
        ),
        Sendable::Empty => (status, None),
    };

    if !(100..=999).contains(&status) {
        return Err(EncodeError::InvalidStatus { status });
    }

    let body = match document {
        Some(document) => serde_json::to_vec(&document)?,
        None => Vec::new(),
    };

    Ok(EncodedDocument { status, body })
}

fn top_level<'a>(
    data: Option<DataRef<'a>>,
    errors: Option<&'a [ErrorObject]>,
) -> TopLevelRef<'a> {
    TopLevelRef {
        jsonapi: JsonApi {
            version: JSONAPI_VERSION,
        },
        data,
        errors,
    }
}

/// Decodes a request body holding a single resource object.
///
/// Shape problems are reported as `400`; a `data.type` that does not match
/// `expected_type` is a `409`.
pub fn decode_object(body: &[u8], expected_type: &str) -> Result<Object, Failure> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ErrorObject::bad_request("request body is empty").into());
    }

    let document: Value = serde_json::from_slice(body).map_err(|e| {
        ErrorObject::bad_request(format!("request body is not valid JSON: {e}"))
    })?;

    let data = document
        .get("data")
        .ok_or_else(|| ErrorObject::bad_request("missing primary data").with_pointer("/data"))?;

    if !data.is_object() {
        return Err(ErrorObject::bad_request("primary data must be a single resource object")
            .with_pointer("/data")
            .into());
    }

    let object: Object = serde_json::from_value(data.clone()).map_err(|e| {
        ErrorObject::bad_request(format!("invalid resource object: {e}")).with_pointer("/data")
    })?;

    if object.object_type != expected_type {
        return Err(ErrorObject::conflict(format!(
            "resource type '{}' does not match endpoint type '{}'",
            object.object_type, expected_type
        ))
        .with_pointer("/data/type")
        .into());
    }

    Ok(object)
}

/// Primary data of a parsed response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Data {
    One(Object),
    Many(List),
}

/// Owned view of a response document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub data: Option<Data>,

    #[serde(default)]
    pub errors: Vec<ErrorObject>,
}

impl Document {
    /// Parses a response body.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// The single primary object, if the document carries one.
    pub fn object(&self) -> Option<&Object> {
        match &self.data {
            Some(Data::One(object)) => Some(object),
            _ => None,
        }
    }

    /// The primary list, if the document carries one.
    pub fn list(&self) -> Option<&List> {
        match &self.data {
            Some(Data::Many(list)) => Some(list),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_object_document() {
        let mut object = Object::new("1", "user");
        object.set_attribute("name", "alice");

        let encoded = encode(&Sendable::Object(object), 200).unwrap();
        assert_eq!(encoded.status, 200);

        let value: Value = serde_json::from_slice(&encoded.body).unwrap();
        assert_eq!(value["jsonapi"]["version"], "1.0");
        assert_eq!(value["data"]["id"], "1");
        assert_eq!(value["data"]["type"], "user");
        assert_eq!(value["data"]["attributes"]["name"], "alice");
        assert!(value.get("errors").is_none());
    }

    #[test]
    fn test_encode_list_document() {
        let list = vec![Object::new("1", "user"), Object::new("2", "user")];
        let encoded = encode(&Sendable::List(list), 200).unwrap();

        let document = Document::parse(&encoded.body).unwrap();
        let list = document.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].id, "2");
    }

    #[test]
    fn test_encode_failure_uses_leading_status() {
        let failure = Failure::from_errors(vec![
            ErrorObject::not_found("gone"),
            ErrorObject::internal("boom"),
        ])
        .unwrap();

        let encoded = encode(&Sendable::Failure(failure), 200).unwrap();
        assert_eq!(encoded.status, 404);

        let document = Document::parse(&encoded.body).unwrap();
        assert!(document.data.is_none());
        assert_eq!(document.errors.len(), 2);
        assert_eq!(document.errors[0].status, 404);
    }

    #[test]
    fn test_encode_empty_has_no_body() {
        let encoded = encode(&Sendable::Empty, 204).unwrap();
        assert_eq!(encoded.status, 204);
        assert!(encoded.body.is_empty());
    }

    #[test]
    fn test_encode_rejects_invalid_status() {
        let err = encode(&Sendable::Empty, 42).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidStatus { status: 42 }));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_decode_object() {
        let body = json!({"data": {"type": "user", "attributes": {"name": "alice"}}});
        let object = decode_object(body.to_string().as_bytes(), "user").unwrap();
        assert!(object.id.is_empty());
        assert_eq!(object.attribute("name"), Some(&json!("alice")));
    }

    #[test]
    fn test_decode_empty_body_is_bad_request() {
        let failure = decode_object(b"  ", "user").unwrap_err();
        assert_eq!(failure.status(), 400);
    }

    #[test]
    fn test_decode_malformed_json_is_bad_request() {
        let failure = decode_object(b"{not json", "user").unwrap_err();
        assert_eq!(failure.status(), 400);
    }

    #[test]
    fn test_decode_missing_data_is_bad_request() {
        let failure = decode_object(br#"{"meta": {}}"#, "user").unwrap_err();
        assert_eq!(failure.status(), 400);
        assert_eq!(
            failure.errors()[0].source.as_ref().unwrap().pointer.as_deref(),
            Some("/data")
        );
    }

    #[test]
    fn test_decode_list_data_is_bad_request() {
        let failure = decode_object(br#"{"data": []}"#, "user").unwrap_err();
        assert_eq!(failure.status(), 400);
    }

    #[test]
    fn test_decode_missing_type_is_bad_request() {
        let failure = decode_object(br#"{"data": {"id": "1"}}"#, "user").unwrap_err();
        assert_eq!(failure.status(), 400);
    }

    #[test]
    fn test_decode_type_mismatch_is_conflict() {
        let failure = decode_object(br#"{"data": {"type": "post"}}"#, "user").unwrap_err();
        assert_eq!(failure.status(), 409);
        assert_eq!(
            failure.errors()[0].source.as_ref().unwrap().pointer.as_deref(),
            Some("/data/type")
        );
    }
}
