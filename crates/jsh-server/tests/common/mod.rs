//! Shared helpers for jsh-server integration tests.

#![allow(dead_code)]

use std::io::Write;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::NamedTempFile;
use tower::ServiceExt;

use jsh_server::{app, build_api, ServerConfig};

/// Loads `yaml` through the file + env layers and builds the HTTP app.
pub fn app_from_yaml(yaml: &str) -> Router {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{yaml}").unwrap();
    let config = ServerConfig::load(file.path()).unwrap();
    app(&build_api(&config).unwrap())
}

/// Sends one request and returns the status and the parsed JSON body
/// (`Value::Null` for an empty body).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(serde_json::to_vec(&value).unwrap()),
        None => Body::empty(),
    };
    let request = Request::builder().method(method).uri(uri).body(body).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
