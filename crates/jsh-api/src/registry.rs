//! Top-level resource registry.

use std::collections::BTreeMap;

use axum::{extract::DefaultBodyLimit, Router};

use crate::dispatch::Dispatcher;
use crate::errors::{validate_name, ResourceError};
use crate::extract::RequestScope;
use crate::middleware::{cors_layer, RequestIdLayer, RequestLoggingLayer};
use crate::resource::ResourceNode;
use crate::routes::normalize_prefix;

/// Default request body limit (1 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Holds the top-level resources of an API and turns them into one router.
///
/// ```ignore
/// let mut api = Api::new("/api");
/// api.add(ResourceNode::new_crud("user", store))?;
/// axum::serve(listener, api.router()).await?;
/// ```
#[derive(Debug)]
pub struct Api {
    prefix: String,
    resources: BTreeMap<String, ResourceNode>,
    dispatcher: Dispatcher,
    body_limit: usize,
    cors: bool,
}

impl Api {
    /// Creates an empty registry. `prefix` is normalized: `"api"` and
    /// `"/api/"` both become `"/api"`, an empty prefix stays empty.
    pub fn new(prefix: &str) -> Self {
        Self::with_dispatcher(prefix, Dispatcher::default())
    }

    pub fn with_dispatcher(prefix: &str, dispatcher: Dispatcher) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
            resources: BTreeMap::new(),
            dispatcher,
            body_limit: DEFAULT_BODY_LIMIT,
            cors: false,
        }
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Answers CORS preflights and tags responses for browser clients.
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors = enabled;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Adds a top-level resource.
    ///
    /// The node and its subtree are moved below the registry prefix and take
    /// over the registry's dispatcher. A resource of the same type that was
    /// added earlier is replaced and returned.
    pub fn add(&mut self, mut node: ResourceNode) -> Result<Option<ResourceNode>, ResourceError> {
        validate_name(node.resource_type())?;
        node.rebase(&self.prefix);
        node.set_dispatcher(self.dispatcher.clone());

        let resource_type = node.resource_type().to_string();
        let previous = self.resources.insert(resource_type.clone(), node);
        if previous.is_some() {
            tracing::warn!(
                resource_type = %resource_type,
                prefix = %self.prefix,
                "replacing previously registered resource"
            );
        }
        Ok(previous)
    }

    pub fn resource(&self, resource_type: &str) -> Option<&ResourceNode> {
        self.resources.get(resource_type)
    }

    /// Mutable access for registering further routes after [`Api::add`].
    pub fn resource_mut(&mut self, resource_type: &str) -> Option<&mut ResourceNode> {
        self.resources.get_mut(resource_type)
    }

    /// Top-level resources in type-name order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceNode> {
        self.resources.values()
    }

    /// Every route of every resource, one per line.
    ///
    /// Resources appear in type-name order, each followed by its descendants.
    pub fn route_tree(&self) -> String {
        let mut lines = Vec::new();
        for node in self.resources.values() {
            node.collect_routes(&mut lines);
        }
        lines.join("\n")
    }

    /// Builds the router serving every registered resource.
    ///
    /// Unmatched paths get a JSON:API `404` and unserved methods on a known
    /// path a JSON:API `405`. Request bodies above the body
    /// limit are rejected with `413`.
    pub fn router(&self) -> Router {
        self.router_with(Router::new())
    }

    /// Like [`Api::router`], with `extra` served alongside the resources.
    ///
    /// `extra` sits behind the same request id, logging and fallback layers.
    pub fn router_with(&self, extra: Router) -> Router {
        let router = self.routes(extra);
        if self.cors {
            router.layer(cors_layer())
        } else {
            router
        }
    }

    fn routes(&self, extra: Router) -> Router {
        let mut router = extra;
        for node in self.resources.values() {
            router = router.merge(node.router());
        }

        let not_found = self.dispatcher.clone();
        let not_allowed = self.dispatcher.clone();
        router
            .method_not_allowed_fallback(move |scope: RequestScope| async move {
                let (ctx, _guard) = scope.into_parts();
                not_allowed.method_not_allowed(&ctx)
            })
            .fallback(move |scope: RequestScope| async move {
                let (ctx, _guard) = scope.into_parts();
                not_found.not_found(&ctx)
            })
            .layer(DefaultBodyLimit::max(self.body_limit))
            .layer(RequestLoggingLayer::new())
            .layer(RequestIdLayer::new())
    }
}
