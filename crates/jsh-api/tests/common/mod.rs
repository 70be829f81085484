//! Shared helpers for jsh-api integration tests.

// Each test file uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use jsh_api::testing::RecordingSink;
use jsh_api::{Api, Dispatcher, ResourceNode};
use jsh_domain::{Document, MEDIA_TYPE};

/// An API with a recording sink installed, plus the sink.
pub fn recording_api(prefix: &str) -> (Api, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let dispatcher = Dispatcher::default().with_sink(sink.clone());
    (Api::with_dispatcher(prefix, dispatcher), sink)
}

/// Router serving a single node below `prefix`, plus the sink.
pub fn app_for(prefix: &str, node: ResourceNode) -> (Router, Arc<RecordingSink>) {
    let (mut api, sink) = recording_api(prefix);
    api.add(node).unwrap();
    (api.router(), sink)
}

/// Sends one request and returns the raw response.
pub async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", MEDIA_TYPE);
            Body::from(serde_json::to_vec(&value).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

/// Sends one request and returns the status and body bytes.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Bytes) {
    let response = call(app, method, uri, body).await;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body)
}

/// Sends one request and parses the JSON:API response document.
pub async fn send_document(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Document) {
    let (status, body) = send(app, method, uri, body).await;
    let document = Document::parse(&body)
        .unwrap_or_else(|e| panic!("response is not a JSON:API document ({e}): {body:?}"));
    (status, document)
}
