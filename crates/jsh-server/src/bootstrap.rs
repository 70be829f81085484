//! Builds the API and its HTTP app from a [`ServerConfig`].
//!
//! Every configured resource is backed by its own [`MemoryStore`]; nested
//! resources get a store of their own as well.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{response::IntoResponse, routing::get, Json, Router};
use jsh_api::{Api, Dispatcher, ResourceError, ResourceNode};
use jsh_domain::{Object, RequestContext};
use jsh_storage::{Action, MemoryStore, StorageResult, Update};
use serde_json::Map;
use serde_json::Value;
use tracing::info;

use crate::config::{ActionSettings, ResourceSettings, ServerConfig};

/// Builds the resource registry described by `config`.
pub fn build_api(config: &ServerConfig) -> Result<Api, ResourceError> {
    let dispatcher = Dispatcher::default().with_delete_status(config.api.delete_status);
    let mut api = Api::with_dispatcher(&config.api.prefix, dispatcher)
        .with_body_limit(config.server.body_limit_bytes)
        .with_cors(config.api.cors);

    for settings in &config.resources {
        let mut node = ResourceNode::new(settings.resource_type.trim());
        configure(&mut node, settings)?;
        api.add(node)?;
    }

    info!(
        prefix = %api.prefix(),
        resources = config.resources.len(),
        "api built"
    );
    Ok(api)
}

/// The complete HTTP app: every resource of `api` plus `GET /health`.
pub fn app(api: &Api) -> Router {
    api.router_with(Router::new().route("/health", get(health_check)))
}

/// Liveness probe. Does not touch any store.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn configure(node: &mut ResourceNode, settings: &ResourceSettings) -> Result<(), ResourceError> {
    let resource_type = settings.resource_type.trim();
    let store = Arc::new(seeded_store(settings));
    node.register_crud(Arc::clone(&store))?;

    for action in &settings.actions {
        node.register_action(&action.name, SetAttributes::new(Arc::clone(&store), action))?;
    }

    for child in &settings.children {
        let child_node = node.create_child(child.resource_type.trim())?;
        configure(child_node, child)?;
    }

    tracing::debug!(
        resource_type = %resource_type,
        seeded = store.len(),
        actions = settings.actions.len(),
        "resource configured"
    );
    Ok(())
}

fn seeded_store(settings: &ResourceSettings) -> MemoryStore {
    let resource_type = settings.resource_type.trim();
    let objects = settings
        .seed
        .iter()
        .map(|seed| {
            let mut object = Object::new(seed.id.clone().unwrap_or_default(), resource_type);
            object.attributes = seed.attributes.clone();
            object
        })
        .collect();
    MemoryStore::with_objects(resource_type, objects)
}

/// Action that stores the request's attributes plus a fixed attribute set.
///
/// Configured attributes win over the request body.
struct SetAttributes {
    store: Arc<MemoryStore>,
    attributes: Map<String, Value>,
}

impl SetAttributes {
    fn new(store: Arc<MemoryStore>, settings: &ActionSettings) -> Self {
        Self {
            store,
            attributes: settings.set.clone(),
        }
    }
}

#[async_trait]
impl Action for SetAttributes {
    async fn apply(&self, ctx: RequestContext, mut object: Object) -> StorageResult<Object> {
        for (name, value) in &self.attributes {
            object.set_attribute(name.clone(), value.clone());
        }
        self.store.update(ctx, object).await
    }
}
