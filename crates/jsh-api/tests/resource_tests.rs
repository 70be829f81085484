//! Route composition and registration through the public API.

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use jsh_api::testing::{new_mock_resource, MockStorage};
use jsh_api::{Api, ResourceError, ResourceNode};
use jsh_domain::{Failure, Object, RequestContext};
use serde_json::json;

use common::{app_for, send, send_document};

#[test]
fn test_crud_resource_has_five_routes() {
    let node = new_mock_resource("bar", 2, json!({"foo": "bar"}));
    assert_eq!(node.routes().len(), 5);
}

#[test]
fn test_nested_child_matchers() {
    let mut api = Api::new("/foo");
    let mut bar = ResourceNode::new("bar");
    bar.create_child("baz")
        .unwrap()
        .register_crud(Arc::new(MockStorage::new("baz", 1)))
        .unwrap();
    api.add(bar).unwrap();

    let child = api.resource("bar").unwrap().child("baz").unwrap();
    assert_eq!(child.prefix(), "/foo/bars/:id");
    assert_eq!(child.matcher(), "/foo/bars/:id/bazs");
}

fn rename_action() -> impl jsh_storage::Action {
    |_ctx: RequestContext, mut object: Object| async move {
        let name = object.attribute("name").cloned().unwrap_or_default();
        object.set_attribute("renamed_to", name);
        Ok::<_, Failure>(object)
    }
}

#[tokio::test]
async fn test_action_receives_request_body() {
    let mut node = new_mock_resource("bar", 0, json!({}));
    node.register_action("rename", rename_action()).unwrap();
    assert_eq!(node.routes().len(), 6);
    assert_eq!(node.routes()[5], "PATCH - /bars/:id/rename");

    let (app, _sink) = app_for("", node);
    let body = json!({"data": {"type": "bar", "attributes": {"name": "x"}}});
    let (status, document) =
        send_document(app, Method::PATCH, "/bars/3/rename", Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    let object = document.object().unwrap();
    assert_eq!(object.id, "3");
    assert_eq!(object.attribute("name"), Some(&json!("x")));
    assert_eq!(object.attribute("renamed_to"), Some(&json!("x")));
}

#[tokio::test]
async fn test_action_body_is_checked_like_update() {
    let mut node = new_mock_resource("bar", 0, json!({}));
    node.register_action("rename", rename_action()).unwrap();
    let (app, sink) = app_for("", node);

    let body = json!({"data": {"id": "9", "type": "bar", "attributes": {}}});
    let (status, document) =
        send_document(app.clone(), Method::PATCH, "/bars/3/rename", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(document.errors.len(), 1);

    let (status, _) = send(app, Method::PATCH, "/bars/3/rename", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(sink.count(jsh_api::LogLevel::Critical), 0);
}

#[tokio::test]
async fn test_to_one_relationship_routes() {
    let mut node = new_mock_resource("bar", 0, json!({}));
    node.register_to_one("owner", |_ctx: RequestContext, parent: String| async move {
        let mut owner = Object::new("9", "user");
        owner.set_attribute("owns", parent);
        Ok::<_, Failure>(owner)
    })
    .unwrap();
    assert_eq!(node.routes().len(), 7);
    assert_eq!(node.relationship_count(), 1);

    let (app, _sink) = app_for("", node);
    for uri in ["/bars/4/owner", "/bars/4/relationships/owner"] {
        let (status, document) = send_document(app.clone(), Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        let owner = document.object().unwrap();
        assert_eq!(owner.id, "9");
        assert_eq!(owner.attribute("owns"), Some(&json!("4")));
    }
}

#[tokio::test]
async fn test_to_many_relationship_routes() {
    let mut node = new_mock_resource("bar", 0, json!({}));
    node.register_to_many("tag", |_ctx: RequestContext, parent: String| async move {
        Ok::<_, Failure>(vec![
            Object::new(format!("{parent}-a"), "tag"),
            Object::new(format!("{parent}-b"), "tag"),
        ])
    })
    .unwrap();
    assert_eq!(node.routes().len(), 7);
    assert_eq!(node.relationship_count(), 1);

    let (app, _sink) = app_for("", node);
    for uri in ["/bars/5/tags", "/bars/5/relationships/tags"] {
        let (status, document) = send_document(app.clone(), Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        let tags = document.list().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].id, "5-a");
    }
}

#[tokio::test]
async fn test_nested_child_sees_parent_id() {
    let mut node = new_mock_resource("user", 0, json!({}));
    node.create_child("post")
        .unwrap()
        .register_get(|ctx: RequestContext, id: String| async move {
            let mut post = Object::new(id, "post");
            post.set_attribute("author", ctx.param("users_id").unwrap_or_default());
            Ok::<_, Failure>(post)
        })
        .unwrap();

    let (app, _sink) = app_for("/api", node);
    let (status, document) =
        send_document(app, Method::GET, "/api/users/7/posts/42", None).await;

    assert_eq!(status, StatusCode::OK);
    let post = document.object().unwrap();
    assert_eq!(post.id, "42");
    assert_eq!(post.attribute("author"), Some(&json!("7")));
}

#[tokio::test]
async fn test_custom_route_is_served() {
    let mut node = new_mock_resource("bar", 0, json!({}));
    node.route(Method::GET, "ping", || async { "pong" }).unwrap();
    assert_eq!(node.routes()[5], "GET - /bars/:id/ping");

    let (app, _sink) = app_for("", node);
    let (status, body) = send(app, Method::GET, "/bars/1/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"pong");
}

#[test]
fn test_child_and_to_many_cannot_share_a_path() {
    let mut node = ResourceNode::new("bar");
    node.create_child("baz").unwrap();

    let err = node
        .register_to_many("baz", |_ctx: RequestContext, _id: String| async move {
            Ok::<_, Failure>(Vec::<Object>::new())
        })
        .unwrap_err();
    assert!(matches!(err, ResourceError::NameCollision { .. }));
}

#[test]
fn test_route_tree_is_stable() {
    let build = || {
        let mut api = Api::new("api");
        for resource_type in ["user", "post", "comment"] {
            let mut node = new_mock_resource(resource_type, 0, json!({}));
            node.create_child("tag")
                .unwrap()
                .register_list(MockStorage::new("tag", 0))
                .unwrap();
            api.add(node).unwrap();
        }
        api.route_tree()
    };

    let tree = build();
    assert_eq!(tree, build());

    let lines: Vec<&str> = tree.lines().collect();
    assert_eq!(lines.len(), 18);
    assert_eq!(lines[0], "GET - /api/comments/:id");
    assert_eq!(lines[5], "GET - /api/comments/:id/tags");
    assert_eq!(lines[17], "GET - /api/users/:id/tags");
}
