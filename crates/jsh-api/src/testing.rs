//! Test utilities: a mock storage backend and a recording log sink.
//!
//! ```ignore
//! let node = new_mock_resource("user", 2, json!({"name": "alice"}));
//! let app = node.router();
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jsh_domain::{ErrorObject, Failure, Object, RequestContext};
use jsh_storage::{Delete, Get, List, Save, StorageResult, Update};
use serde_json::{Map, Value};

use crate::dispatch::{LogLevel, LogSink};
use crate::resource::ResourceNode;

/// Builds a CRUD resource backed by a [`MockStorage`].
///
/// `attributes` is used as the attribute set of every object the mock
/// returns; anything that is not a JSON object yields no attributes.
pub fn new_mock_resource(resource_type: &str, list_count: usize, attributes: Value) -> ResourceNode {
    let storage = MockStorage::new(resource_type, list_count).with_attributes(attributes);
    ResourceNode::new_crud(resource_type, Arc::new(storage))
}

/// Builds an object of `resource_type` with the given id and attributes.
pub fn sample_object(id: &str, resource_type: &str, attributes: &Map<String, Value>) -> Object {
    let mut object = Object::new(id, resource_type);
    object.attributes = attributes.clone();
    object
}

/// Storage that answers every call without keeping state.
///
/// - `save` assigns id `"1"` and echoes the object
/// - `get` returns a sample object with the requested id
/// - `list` returns `list_count` sample objects with ids `"1"..="n"`
/// - `update` echoes the object, `delete` succeeds
///
/// A mock built with [`MockStorage::failing`] returns the same failure from
/// every call instead.
#[derive(Debug)]
pub struct MockStorage {
    resource_type: String,
    list_count: usize,
    attributes: Map<String, Value>,
    failure: Option<ErrorObject>,
    calls: AtomicUsize,
}

impl MockStorage {
    pub fn new(resource_type: impl Into<String>, list_count: usize) -> Self {
        Self {
            resource_type: resource_type.into(),
            list_count,
            attributes: Map::new(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A mock whose every operation fails with `error`.
    pub fn failing(resource_type: impl Into<String>, error: ErrorObject) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(resource_type, 0)
        }
    }

    pub fn with_attributes(mut self, attributes: Value) -> Self {
        self.attributes = match attributes {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self
    }

    /// Number of storage calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), Failure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }

    fn sample(&self, id: &str) -> Object {
        sample_object(id, &self.resource_type, &self.attributes)
    }
}

#[async_trait]
impl Save for MockStorage {
    async fn save(&self, _ctx: RequestContext, mut object: Object) -> StorageResult<Object> {
        self.enter()?;
        object.id = "1".to_string();
        Ok(object)
    }
}

#[async_trait]
impl Get for MockStorage {
    async fn get(&self, _ctx: RequestContext, id: String) -> StorageResult<Object> {
        self.enter()?;
        Ok(self.sample(&id))
    }
}

#[async_trait]
impl List for MockStorage {
    async fn list(&self, _ctx: RequestContext) -> StorageResult<jsh_domain::List> {
        self.enter()?;
        Ok((1..=self.list_count)
            .map(|i| self.sample(&i.to_string()))
            .collect())
    }
}

#[async_trait]
impl Update for MockStorage {
    async fn update(&self, _ctx: RequestContext, object: Object) -> StorageResult<Object> {
        self.enter()?;
        Ok(object)
    }
}

#[async_trait]
impl Delete for MockStorage {
    async fn delete(&self, _ctx: RequestContext, _id: String) -> StorageResult<()> {
        self.enter()
    }
}

/// Log sink that keeps every entry in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.lock().clone()
    }

    pub fn levels(&self) -> Vec<LogLevel> {
        self.lock().iter().map(|(level, _)| *level).collect()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.lock().iter().filter(|(l, _)| *l == level).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(LogLevel, String)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LogSink for RecordingSink {
    fn log(&self, level: LogLevel, _ctx: &RequestContext, message: &str) {
        self.lock().push((level, message.to_string()));
    }
}
