//! Path composition and the route table.
//!
//! Every path a resource exposes is derived from two inputs, its `prefix` and
//! its `type`:
//!
//! | Function | Result for prefix `/foo`, type `bar` |
//! |----------|--------------------------------------|
//! | [`matcher`] | `/foo/bars` |
//! | [`id_matcher`] | `/foo/bars/:id` |
//!
//! These are recomputed on every use and never cached, so a node re-based
//! under a new prefix cannot disagree with its own routes.

use std::collections::HashSet;
use std::fmt;

use axum::http::Method;

/// Path parameter holding a resource's own identifier.
pub const ID_PARAM: &str = "id";

/// Pluralizes a resource type by appending `s`.
///
/// Irregular plurals are not supported; pass an already plural type name if
/// `type + "s"` reads wrong.
pub fn pluralize(resource_type: &str) -> String {
    format!("{resource_type}s")
}

/// Joins two path fragments with exactly one `/` between them.
///
/// The result always starts with `/` and never ends with one (except for the
/// root path itself).
pub fn join(prefix: &str, segment: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let segment = segment.trim_matches('/');

    match (prefix.is_empty(), segment.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{segment}"),
        (false, true) => format!("/{prefix}"),
        (false, false) => format!("/{prefix}/{segment}"),
    }
}

/// Normalizes a registry prefix: empty stays empty, anything else gets a
/// single leading `/` and no trailing one.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Collection path of a resource: `join(prefix, pluralize(type))`.
pub fn matcher(prefix: &str, resource_type: &str) -> String {
    join(prefix, &pluralize(resource_type))
}

/// Instance path of a resource: `join(matcher, ":id")`.
pub fn id_matcher(prefix: &str, resource_type: &str) -> String {
    join(&matcher(prefix, resource_type), &format!(":{ID_PARAM}"))
}

/// Which of a node's two base paths a route hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Relative to [`matcher`].
    Collection,
    /// Relative to [`id_matcher`].
    Instance,
}

/// One registered route: method, base path and literal suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: Method,
    pub scope: Scope,
    pub suffix: String,
}

impl RouteEntry {
    pub fn new(method: Method, scope: Scope, suffix: impl Into<String>) -> Self {
        Self {
            method,
            scope,
            suffix: suffix.into(),
        }
    }

    /// Full pattern of this route for a node at `prefix` of type `resource_type`.
    pub fn pattern(&self, prefix: &str, resource_type: &str) -> String {
        let base = match self.scope {
            Scope::Collection => matcher(prefix, resource_type),
            Scope::Instance => id_matcher(prefix, resource_type),
        };
        if self.suffix.is_empty() {
            base
        } else {
            join(&base, &self.suffix)
        }
    }

    /// Human readable form, `"METHOD - pattern"`.
    pub fn render(&self, prefix: &str, resource_type: &str) -> String {
        format!("{} - {}", self.method, self.pattern(prefix, resource_type))
    }
}

/// Append-only log of the routes registered on one node.
///
/// Used for introspection only; dispatch never consults it.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    pub fn contains(&self, method: &Method, scope: Scope, suffix: &str) -> bool {
        self.entries
            .iter()
            .any(|e| &e.method == method && e.scope == scope && e.suffix == suffix)
    }

    /// Renders every entry against the given node coordinates, in registration order.
    pub fn render(&self, prefix: &str, resource_type: &str) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.render(prefix, resource_type))
            .collect()
    }
}

/// Rewrites a pattern into the path registered with axum.
///
/// The displayed pattern uses `:id` at every level. axum requires distinct
/// names within one path and the same name at the same position across
/// paths, so every `:id` becomes `:{collection}_id` (e.g. `/users/:id/posts`
/// becomes `/users/:users_id/posts`). Repeated names get a numeric suffix.
///
/// Returns the path and the name given to the last renamed segment.
pub(crate) fn rename_id_params(pattern: &str) -> (String, Option<String>) {
    let mut used = HashSet::new();
    let mut previous = "";
    let mut last = None;
    let mut segments = Vec::new();

    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        if segment == ":id" {
            let base = if previous.is_empty() {
                "parent_id".to_string()
            } else {
                format!("{previous}_id")
            };
            let mut name = base.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{base}_{n}");
                n += 1;
            }
            segments.push(format!(":{name}"));
            last = Some(name);
        } else {
            segments.push(segment.to_string());
        }
        previous = segment;
    }

    (join(&segments.join("/"), ""), last)
}

impl RouteEntry {
    /// The path registered with axum, and for instance routes the axum name
    /// of the node's own identifier parameter.
    pub(crate) fn router_path(
        &self,
        prefix: &str,
        resource_type: &str,
    ) -> (String, Option<String>) {
        let (base, own_id) = match self.scope {
            Scope::Collection => (rename_id_params(&matcher(prefix, resource_type)).0, None),
            Scope::Instance => rename_id_params(&id_matcher(prefix, resource_type)),
        };
        let path = if self.suffix.is_empty() {
            base
        } else {
            join(&base, &self.suffix)
        };
        (path, own_id)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Collection => f.write_str("collection"),
            Scope::Instance => f.write_str("instance"),
        }
    }
}
