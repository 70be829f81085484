//! Resource nodes and the resource tree.
//!
//! A [`ResourceNode`] is one resource type together with the capabilities
//! bound to it, its relationships and its nested child resources. Children
//! hang off the parent's identifier path:
//!
//! ```text
//! /foo/bars                 GET (list), POST (save)
//! /foo/bars/:id             GET, PATCH, DELETE
//! /foo/bars/:id/mutate      PATCH (action)
//! /foo/bars/:id/owner       GET (to-one)
//! /foo/bars/:id/tags        GET (to-many)
//! /foo/bars/:id/bazs/...    child resource "baz"
//! ```
//!
//! Nodes are built during setup and are read-only once [`ResourceNode::router`]
//! has been called.

mod handler;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::{
    handler::Handler as AxumHandler,
    http::Method,
    routing::{on, MethodFilter},
    Router,
};
use jsh_storage::{Action, Crud, Delete, Get, List, Save, ToMany, ToOne, Update};

use crate::dispatch::Dispatcher;
use crate::errors::{validate_name, ResourceError};
use crate::routes::{id_matcher, matcher, pluralize, RouteEntry, RouteTable, Scope};

use handler::{Binding, Handler};

const RELATIONSHIPS_SEGMENT: &str = "relationships";

/// Kind of a relationship binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    ToOne,
    ToMany,
}

#[derive(Clone)]
enum Relationship {
    ToOne(Arc<dyn ToOne>),
    ToMany(Arc<dyn ToMany>),
}

impl Relationship {
    fn kind(&self) -> RelationshipKind {
        match self {
            Relationship::ToOne(_) => RelationshipKind::ToOne,
            Relationship::ToMany(_) => RelationshipKind::ToMany,
        }
    }
}

/// What occupies a literal path segment directly below the identifier path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SegmentOwner {
    Action(String),
    ToOne(String),
    ToMany(String),
    Child(String),
    Relationships,
    Custom,
}

impl SegmentOwner {
    /// Custom routes may share a segment with each other, and all
    /// relationships share `relationships/`.
    fn can_share_with(&self, other: &SegmentOwner) -> bool {
        matches!(
            (self, other),
            (SegmentOwner::Custom, SegmentOwner::Custom)
                | (SegmentOwner::Relationships, SegmentOwner::Relationships)
        )
    }
}

impl fmt::Display for SegmentOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentOwner::Action(name) => write!(f, "action '{name}'"),
            SegmentOwner::ToOne(name) => write!(f, "to-one relationship '{name}'"),
            SegmentOwner::ToMany(name) => write!(f, "to-many relationship '{name}'"),
            SegmentOwner::Child(name) => write!(f, "child resource '{name}'"),
            SegmentOwner::Relationships => f.write_str("relationship links"),
            SegmentOwner::Custom => f.write_str("a custom route"),
        }
    }
}

/// One resource type and everything registered on it.
pub struct ResourceNode {
    resource_type: String,
    prefix: String,
    routes: RouteTable,
    bindings: Vec<Binding>,
    segments: BTreeMap<String, SegmentOwner>,
    relationships: BTreeMap<String, Relationship>,
    children: BTreeMap<String, ResourceNode>,
    dispatcher: Dispatcher,
}

impl fmt::Debug for ResourceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceNode")
            .field("resource_type", &self.resource_type)
            .field("prefix", &self.prefix)
            .field("routes", &self.routes())
            .field("relationships", &self.relationships.keys().collect::<Vec<_>>())
            .field("children", &self.children)
            .finish()
    }
}

impl ResourceNode {
    /// Creates a node with no routes, mounted at the root.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            prefix: String::new(),
            routes: RouteTable::new(),
            bindings: Vec::new(),
            segments: BTreeMap::new(),
            relationships: BTreeMap::new(),
            children: BTreeMap::new(),
            dispatcher: Dispatcher::default(),
        }
    }

    /// Creates a node with all five storage capabilities bound to `storage`.
    pub fn new_crud<S: Crud>(resource_type: impl Into<String>, storage: Arc<S>) -> Self {
        let mut node = Self::new(resource_type);
        node.bind_crud(storage);
        node
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Collection path, e.g. `/foo/bars`.
    pub fn matcher(&self) -> String {
        matcher(&self.prefix, &self.resource_type)
    }

    /// Instance path, e.g. `/foo/bars/:id`.
    pub fn id_matcher(&self) -> String {
        id_matcher(&self.prefix, &self.resource_type)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Binds `POST {matcher}`.
    pub fn register_save(&mut self, op: impl Save) -> Result<&mut Self, ResourceError> {
        self.bind(Method::POST, Scope::Collection, "", Handler::Save(Arc::new(op)))
    }

    /// Binds `GET {id_matcher}`.
    pub fn register_get(&mut self, op: impl Get) -> Result<&mut Self, ResourceError> {
        self.bind(Method::GET, Scope::Instance, "", Handler::Get(Arc::new(op)))
    }

    /// Binds `GET {matcher}`.
    pub fn register_list(&mut self, op: impl List) -> Result<&mut Self, ResourceError> {
        self.bind(Method::GET, Scope::Collection, "", Handler::List(Arc::new(op)))
    }

    /// Binds `PATCH {id_matcher}`.
    pub fn register_update(&mut self, op: impl Update) -> Result<&mut Self, ResourceError> {
        self.bind(Method::PATCH, Scope::Instance, "", Handler::Update(Arc::new(op)))
    }

    /// Binds `DELETE {id_matcher}`.
    pub fn register_delete(&mut self, op: impl Delete) -> Result<&mut Self, ResourceError> {
        self.bind(Method::DELETE, Scope::Instance, "", Handler::Delete(Arc::new(op)))
    }

    /// Binds all five storage capabilities, in the order Get, Update, Save,
    /// List, Delete.
    ///
    /// Nothing is registered if any of the five routes is already bound.
    pub fn register_crud<S: Crud>(
        &mut self,
        storage: Arc<S>,
    ) -> Result<&mut Self, ResourceError> {
        for (method, scope) in CRUD_ROUTES {
            self.check_route(&method, scope, "")?;
        }
        self.bind_crud(storage);
        Ok(self)
    }

    fn bind_crud<S: Crud>(&mut self, storage: Arc<S>) {
        let handlers = [
            Handler::Get(storage.clone()),
            Handler::Update(storage.clone()),
            Handler::Save(storage.clone()),
            Handler::List(storage.clone()),
            Handler::Delete(storage),
        ];
        for ((method, scope), handler) in CRUD_ROUTES.into_iter().zip(handlers) {
            self.push(RouteEntry::new(method, scope, ""), handler);
        }
    }

    /// Binds `PATCH {id_matcher}/{name}` to a custom action.
    pub fn register_action(
        &mut self,
        name: &str,
        op: impl Action,
    ) -> Result<&mut Self, ResourceError> {
        validate_name(name)?;
        let owner = SegmentOwner::Action(name.to_string());
        self.check_segment(name, &owner)?;
        self.bind(Method::PATCH, Scope::Instance, name, Handler::Action(Arc::new(op)))?;
        self.segments.insert(name.to_string(), owner);
        Ok(self)
    }

    /// Binds `GET {id_matcher}/{name}` and `GET {id_matcher}/relationships/{name}`,
    /// both resolving a single related object.
    pub fn register_to_one(
        &mut self,
        name: &str,
        op: impl ToOne,
    ) -> Result<&mut Self, ResourceError> {
        self.register_relationship(
            name,
            name.to_string(),
            SegmentOwner::ToOne(name.to_string()),
            Relationship::ToOne(Arc::new(op)),
        )
    }

    /// Binds `GET {id_matcher}/{name}s` and `GET {id_matcher}/relationships/{name}s`,
    /// both resolving a related list.
    pub fn register_to_many(
        &mut self,
        name: &str,
        op: impl ToMany,
    ) -> Result<&mut Self, ResourceError> {
        self.register_relationship(
            name,
            pluralize(name),
            SegmentOwner::ToMany(name.to_string()),
            Relationship::ToMany(Arc::new(op)),
        )
    }

    fn register_relationship(
        &mut self,
        name: &str,
        segment: String,
        owner: SegmentOwner,
        relationship: Relationship,
    ) -> Result<&mut Self, ResourceError> {
        validate_name(name)?;
        if let Some(existing) = self.relationships.get(name) {
            let existing = match existing.kind() {
                RelationshipKind::ToOne => SegmentOwner::ToOne(name.to_string()),
                RelationshipKind::ToMany => SegmentOwner::ToMany(name.to_string()),
            };
            return Err(self.collision(name, &existing));
        }
        self.check_segment(&segment, &owner)?;
        self.check_segment(RELATIONSHIPS_SEGMENT, &SegmentOwner::Relationships)?;

        let link = format!("{RELATIONSHIPS_SEGMENT}/{segment}");
        self.check_route(&Method::GET, Scope::Instance, &segment)?;
        self.check_route(&Method::GET, Scope::Instance, &link)?;

        let handler = match &relationship {
            Relationship::ToOne(op) => Handler::ToOne(Arc::clone(op)),
            Relationship::ToMany(op) => Handler::ToMany(Arc::clone(op)),
        };
        self.push(
            RouteEntry::new(Method::GET, Scope::Instance, segment.clone()),
            handler.clone(),
        );
        self.push(RouteEntry::new(Method::GET, Scope::Instance, link), handler);

        self.segments.insert(segment, owner);
        self.segments
            .insert(RELATIONSHIPS_SEGMENT.to_string(), SegmentOwner::Relationships);
        self.relationships.insert(name.to_string(), relationship);
        Ok(self)
    }

    /// Binds an arbitrary axum handler at `{method} {id_matcher}/{suffix}`.
    ///
    /// The handler can extract [`RequestScope`](crate::RequestScope) to get the
    /// same request context the generated handlers use.
    pub fn route<H, T>(
        &mut self,
        method: Method,
        suffix: &str,
        handler: H,
    ) -> Result<&mut Self, ResourceError>
    where
        H: AxumHandler<T, ()>,
        T: 'static,
    {
        let suffix = suffix.trim_matches('/');
        if let Some(first) = suffix.split('/').next().filter(|s| !s.is_empty()) {
            self.check_segment(first, &SegmentOwner::Custom)?;
        }
        let filter = MethodFilter::try_from(method.clone()).map_err(|_| {
            ResourceError::InvalidName {
                name: method.to_string(),
                reason: "unsupported HTTP method",
            }
        })?;

        self.bind(
            method,
            Scope::Instance,
            suffix,
            Handler::Custom(on(filter, handler)),
        )?;
        if let Some(first) = suffix.split('/').next().filter(|s| !s.is_empty()) {
            self.segments.insert(first.to_string(), SegmentOwner::Custom);
        }
        Ok(self)
    }

    /// Creates a child resource mounted below this node's identifier path and
    /// returns it for further registration.
    pub fn create_child(
        &mut self,
        resource_type: &str,
    ) -> Result<&mut ResourceNode, ResourceError> {
        validate_name(resource_type)?;
        let segment = pluralize(resource_type);
        let owner = SegmentOwner::Child(resource_type.to_string());
        self.check_segment(&segment, &owner)?;

        let mut child = ResourceNode::new(resource_type);
        child.prefix = self.id_matcher();
        child.dispatcher = self.dispatcher.clone();

        self.segments.insert(segment, owner);
        Ok(self
            .children
            .entry(resource_type.to_string())
            .or_insert(child))
    }

    pub fn child(&self, resource_type: &str) -> Option<&ResourceNode> {
        self.children.get(resource_type)
    }

    pub fn child_mut(&mut self, resource_type: &str) -> Option<&mut ResourceNode> {
        self.children.get_mut(resource_type)
    }

    /// Children in type-name order.
    pub fn children(&self) -> impl Iterator<Item = &ResourceNode> {
        self.children.values()
    }

    /// Relationship names and kinds, in name order.
    pub fn relationships(&self) -> impl Iterator<Item = (&str, RelationshipKind)> {
        self.relationships
            .iter()
            .map(|(name, relationship)| (name.as_str(), relationship.kind()))
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// This node's route table, rendered as `"METHOD - pattern"` in
    /// registration order.
    pub fn routes(&self) -> Vec<String> {
        self.routes.render(&self.prefix, &self.resource_type)
    }

    /// Own routes followed by every descendant's, children in type-name order.
    pub fn route_tree(&self) -> String {
        let mut lines = Vec::new();
        self.collect_routes(&mut lines);
        lines.join("\n")
    }

    pub(crate) fn collect_routes(&self, lines: &mut Vec<String>) {
        lines.extend(self.routes());
        for child in self.children.values() {
            child.collect_routes(lines);
        }
    }

    /// Moves this node (and its subtree) below `prefix`.
    pub(crate) fn rebase(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
        let child_prefix = self.id_matcher();
        for child in self.children.values_mut() {
            child.rebase(&child_prefix);
        }
    }

    /// Installs `dispatcher` on this node and its subtree.
    pub fn set_dispatcher(&mut self, dispatcher: Dispatcher) {
        for child in self.children.values_mut() {
            child.set_dispatcher(dispatcher.clone());
        }
        self.dispatcher = dispatcher;
    }

    /// Builds the axum router serving this node and its subtree.
    pub fn router(&self) -> Router {
        let mut router = Router::new();
        for binding in &self.bindings {
            let (path, method_router) =
                binding.endpoint(&self.prefix, &self.resource_type, &self.dispatcher);
            router = router.route(&path, method_router);
        }
        for child in self.children.values() {
            router = router.merge(child.router());
        }
        router
    }

    fn bind(
        &mut self,
        method: Method,
        scope: Scope,
        suffix: &str,
        handler: Handler,
    ) -> Result<&mut Self, ResourceError> {
        self.check_route(&method, scope, suffix)?;
        self.push(RouteEntry::new(method, scope, suffix), handler);
        Ok(self)
    }

    fn push(&mut self, entry: RouteEntry, handler: Handler) {
        tracing::debug!(
            resource_type = %self.resource_type,
            route = %entry.render(&self.prefix, &self.resource_type),
            "route registered"
        );
        self.routes.push(entry.clone());
        self.bindings.push(Binding { entry, handler });
    }

    fn check_route(
        &self,
        method: &Method,
        scope: Scope,
        suffix: &str,
    ) -> Result<(), ResourceError> {
        if self.routes.contains(method, scope, suffix) {
            let entry = RouteEntry::new(method.clone(), scope, suffix);
            return Err(ResourceError::DuplicateRoute {
                method: method.clone(),
                pattern: entry.pattern(&self.prefix, &self.resource_type),
            });
        }
        Ok(())
    }

    fn check_segment(&self, segment: &str, owner: &SegmentOwner) -> Result<(), ResourceError> {
        match self.segments.get(segment) {
            Some(existing) if !existing.can_share_with(owner) => {
                Err(self.collision(segment, existing))
            }
            _ => Ok(()),
        }
    }

    fn collision(&self, segment: &str, existing: &SegmentOwner) -> ResourceError {
        ResourceError::NameCollision {
            resource_type: self.resource_type.clone(),
            segment: segment.to_string(),
            existing: existing.to_string(),
        }
    }
}

const CRUD_ROUTES: [(Method, Scope); 5] = [
    (Method::GET, Scope::Instance),
    (Method::PATCH, Scope::Instance),
    (Method::POST, Scope::Collection),
    (Method::GET, Scope::Collection),
    (Method::DELETE, Scope::Instance),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStorage;
    use jsh_domain::{Failure, Object, RequestContext};

    fn action() -> impl Action {
        |_ctx: RequestContext, object: Object| async move { Ok::<_, Failure>(object) }
    }

    fn owner() -> impl ToOne {
        |_ctx: RequestContext, _id: String| async move { Ok::<_, Failure>(Object::new("1", "user")) }
    }

    fn tags() -> impl ToMany {
        |_ctx: RequestContext, _id: String| async move { Ok::<_, Failure>(Vec::<Object>::new()) }
    }

    fn crud_node() -> ResourceNode {
        ResourceNode::new_crud("bar", Arc::new(MockStorage::new("bar", 2)))
    }

    #[test]
    fn test_new_node_has_no_routes() {
        let node = ResourceNode::new("bar");
        assert!(node.routes().is_empty());
        assert_eq!(node.prefix(), "");
        assert_eq!(node.matcher(), "/bars");
        assert_eq!(node.id_matcher(), "/bars/:id");
    }

    #[test]
    fn test_crud_registers_five_routes_in_order() {
        let node = crud_node();
        assert_eq!(
            node.routes(),
            vec![
                "GET - /bars/:id",
                "PATCH - /bars/:id",
                "POST - /bars",
                "GET - /bars",
                "DELETE - /bars/:id",
            ]
        );
    }

    #[test]
    fn test_individual_registration_order_does_not_change_count() {
        let storage = || MockStorage::new("bar", 0);
        let mut node = ResourceNode::new("bar");
        node.register_delete(storage())
            .and_then(|n| n.register_list(storage()))
            .and_then(|n| n.register_save(storage()))
            .and_then(|n| n.register_get(storage()))
            .and_then(|n| n.register_update(storage()))
            .unwrap();

        assert_eq!(node.routes().len(), 5);
        assert_eq!(node.routes()[0], "DELETE - /bars/:id");
    }

    #[test]
    fn test_duplicate_route_is_rejected() {
        let mut node = crud_node();
        let err = node
            .register_crud(Arc::new(MockStorage::new("bar", 0)))
            .unwrap_err();
        assert_eq!(
            err,
            ResourceError::DuplicateRoute {
                method: Method::GET,
                pattern: "/bars/:id".into()
            }
        );
        assert_eq!(node.routes().len(), 5);
    }

    #[test]
    fn test_action_route() {
        let mut node = crud_node();
        node.register_action("mutate", action()).unwrap();

        let routes = node.routes();
        assert_eq!(routes.len(), 6);
        assert_eq!(routes[5], "PATCH - /bars/:id/mutate");
    }

    #[test]
    fn test_relationships_add_two_routes_each() {
        let mut node = crud_node();

        node.register_to_one("owner", owner()).unwrap();
        assert_eq!(node.routes().len(), 7);
        assert_eq!(node.relationship_count(), 1);

        node.register_to_many("tag", tags()).unwrap();
        assert_eq!(node.routes().len(), 9);
        assert_eq!(node.relationship_count(), 2);

        let routes = node.routes();
        assert_eq!(routes[5], "GET - /bars/:id/owner");
        assert_eq!(routes[6], "GET - /bars/:id/relationships/owner");
        assert_eq!(routes[7], "GET - /bars/:id/tags");
        assert_eq!(routes[8], "GET - /bars/:id/relationships/tags");

        let kinds: Vec<_> = node.relationships().collect();
        assert_eq!(
            kinds,
            vec![
                ("owner", RelationshipKind::ToOne),
                ("tag", RelationshipKind::ToMany)
            ]
        );
    }

    #[test]
    fn test_child_prefix_is_parent_id_matcher() {
        let mut node = ResourceNode::new("bar");
        node.rebase("/foo");
        let child = node.create_child("baz").unwrap();

        assert_eq!(child.prefix(), "/foo/bars/:id");
        assert_eq!(child.matcher(), "/foo/bars/:id/bazs");
        assert_eq!(child.id_matcher(), "/foo/bars/:id/bazs/:id");
    }

    #[test]
    fn test_rebase_moves_subtree() {
        let mut node = crud_node();
        node.create_child("baz")
            .unwrap()
            .register_crud(Arc::new(MockStorage::new("baz", 0)))
            .unwrap();

        node.rebase("/api");
        assert_eq!(node.routes()[0], "GET - /api/bars/:id");
        assert_eq!(
            node.child("baz").unwrap().routes()[0],
            "GET - /api/bars/:id/bazs/:id"
        );
    }

    #[test]
    fn test_route_tree_lists_children_after_own_routes() {
        let mut node = ResourceNode::new("bar");
        node.register_get(MockStorage::new("bar", 0)).unwrap();
        node.create_child("zed")
            .unwrap()
            .register_list(MockStorage::new("zed", 0))
            .unwrap();
        node.create_child("baz")
            .unwrap()
            .register_list(MockStorage::new("baz", 0))
            .unwrap();

        assert_eq!(
            node.route_tree(),
            "GET - /bars/:id\nGET - /bars/:id/bazs\nGET - /bars/:id/zeds"
        );
    }

    #[test]
    fn test_name_collisions_are_rejected() {
        let mut node = ResourceNode::new("bar");
        node.register_action("tag", action()).unwrap();
        node.create_child("owner").unwrap();

        // to-many "tag" lives at "tags", so it does not clash with action "tag".
        node.register_to_many("tag", tags()).unwrap();

        let err = node.register_to_one("tag", owner()).unwrap_err();
        assert!(matches!(err, ResourceError::NameCollision { .. }));

        let err = node.register_to_many("owner", tags()).unwrap_err();
        assert!(matches!(err, ResourceError::NameCollision { ref segment, .. } if segment == "owners"));

        let err = node.register_action("owners", action()).unwrap_err();
        assert!(matches!(err, ResourceError::NameCollision { .. }));

        let err = node.create_child("owner").unwrap_err();
        assert!(matches!(err, ResourceError::NameCollision { .. }));

        let err = node.register_action("relationships", action()).unwrap_err();
        assert!(matches!(err, ResourceError::NameCollision { .. }));
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let mut node = ResourceNode::new("bar");
        assert!(matches!(
            node.register_action("", action()),
            Err(ResourceError::InvalidName { .. })
        ));
        assert!(matches!(
            node.create_child("a/b"),
            Err(ResourceError::InvalidName { .. })
        ));
        assert!(matches!(
            node.register_to_one(":id", owner()),
            Err(ResourceError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_custom_routes_share_segments() {
        let mut node = ResourceNode::new("bar");
        node.route(Method::GET, "stats/daily", || async { "daily" })
            .unwrap();
        node.route(Method::GET, "stats/weekly", || async { "weekly" })
            .unwrap();

        assert_eq!(
            node.routes(),
            vec!["GET - /bars/:id/stats/daily", "GET - /bars/:id/stats/weekly"]
        );

        let err = node.register_action("stats", action()).unwrap_err();
        assert!(matches!(err, ResourceError::NameCollision { .. }));
    }
}
