//! In-memory storage implementation for testing and demos.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::instrument;

use jsh_domain::{Object, RequestContext};

use crate::error::StorageError;
use crate::traits::{Delete, Get, List, Save, StorageResult, Update};

/// In-memory implementation of the full storage contract for one resource type.
///
/// Ids are assigned from a per-store counter (`"1"`, `"2"`, ...) when a saved
/// object carries none. Uses DashMap for concurrent access without a global lock.
#[derive(Debug)]
pub struct MemoryStore {
    object_type: String,
    objects: DashMap<String, Object>,
    next_id: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store for `object_type`.
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            objects: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates an empty store wrapped in Arc.
    pub fn new_shared(object_type: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(object_type))
    }

    /// Creates a store pre-populated with `objects`.
    ///
    /// Objects without an id are assigned one; objects of another type are skipped.
    pub fn with_objects(object_type: impl Into<String>, objects: Vec<Object>) -> Self {
        let store = Self::new(object_type);
        for object in objects {
            if let Err(err) = store.insert(object) {
                tracing::warn!(error = %err, "skipping seed object");
            }
        }
        store
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn allocate_id(&self) -> String {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
            if !self.objects.contains_key(&id) {
                return id;
            }
        }
    }

    fn check_type(&self, object: &Object) -> Result<(), StorageError> {
        if object.object_type != self.object_type {
            return Err(StorageError::TypeMismatch {
                expected: self.object_type.clone(),
                actual: object.object_type.clone(),
            });
        }
        Ok(())
    }

    fn insert(&self, mut object: Object) -> Result<Object, StorageError> {
        self.check_type(&object)?;

        if object.id.is_empty() {
            object.id = self.allocate_id();
        }

        // Use atomic entry API to prevent race condition between check and insert
        match self.objects.entry(object.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                object_type: self.object_type.clone(),
                id: object.id,
            }),
            Entry::Vacant(entry) => {
                entry.insert(object.clone());
                Ok(object)
            }
        }
    }

    fn not_found(&self, id: &str) -> StorageError {
        StorageError::NotFound {
            object_type: self.object_type.clone(),
            id: id.to_string(),
        }
    }
}

/// Orders numeric ids numerically, everything else lexically after them.
fn id_order(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[async_trait]
impl Save for MemoryStore {
    #[instrument(skip_all, fields(object_type = %self.object_type))]
    async fn save(&self, _ctx: RequestContext, object: Object) -> StorageResult<Object> {
        Ok(self.insert(object)?)
    }
}

#[async_trait]
impl Get for MemoryStore {
    #[instrument(skip(self, _ctx), fields(object_type = %self.object_type))]
    async fn get(&self, _ctx: RequestContext, id: String) -> StorageResult<Object> {
        self.objects
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| self.not_found(&id).into())
    }
}

#[async_trait]
impl List for MemoryStore {
    #[instrument(skip_all, fields(object_type = %self.object_type))]
    async fn list(&self, _ctx: RequestContext) -> StorageResult<jsh_domain::List> {
        let mut objects: Vec<Object> = self
            .objects
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        objects.sort_by(|a, b| id_order(&a.id, &b.id));
        Ok(objects)
    }
}

#[async_trait]
impl Update for MemoryStore {
    /// Merges the supplied attributes into the stored object; attributes not
    /// present in the request are left untouched.
    #[instrument(skip_all, fields(object_type = %self.object_type, id = %object.id))]
    async fn update(&self, _ctx: RequestContext, object: Object) -> StorageResult<Object> {
        self.check_type(&object)?;

        let mut stored = self
            .objects
            .get_mut(&object.id)
            .ok_or_else(|| self.not_found(&object.id))?;

        stored.attributes.extend(object.attributes);
        if object.relationships.is_some() {
            stored.relationships = object.relationships;
        }
        if object.links.is_some() {
            stored.links = object.links;
        }

        Ok(stored.clone())
    }
}

#[async_trait]
impl Delete for MemoryStore {
    #[instrument(skip(self, _ctx), fields(object_type = %self.object_type))]
    async fn delete(&self, _ctx: RequestContext, id: String) -> StorageResult<()> {
        match self.objects.remove(&id) {
            Some(_) => Ok(()),
            None => Err(self.not_found(&id).into()),
        }
    }
}
