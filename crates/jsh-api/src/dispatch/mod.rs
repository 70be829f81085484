//! Dispatcher: the single translation point between one storage call and one
//! HTTP response.
//!
//! Every handler generated by a [`ResourceNode`](crate::ResourceNode) funnels
//! through [`Dispatcher::send`], which:
//!
//! 1. Classifies failures by status (`4xx` warning, `5xx` critical).
//! 2. Logs them through the injected [`LogSink`].
//! 3. Encodes the document through the injected [`Sender`].
//!
//! If encoding fails, the failure is logged on its own and a static `500`
//! JSON:API document is written instead, so the client always receives a
//! JSON:API body.

mod sender;
mod sink;

pub use sender::{JsonApiSender, SendError, Sender};
pub use sink::{LogLevel, LogSink, TracingSink};

pub(crate) use sender::internal_error_response;

use std::fmt;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::rejection::BytesRejection,
    response::Response,
};
use jsh_domain::{decode_object, ErrorObject, Failure, Object, RequestContext, Sendable};
use jsh_storage::{Action, Delete, Get, List, Save, ToMany, ToOne, Update};

use crate::routes::ID_PARAM;

/// How loudly a response status is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Success or redirect; not logged.
    None,
    /// Client fault.
    Warning,
    /// Server fault.
    Critical,
}

/// Classifies a response status.
pub fn classify(status: u16) -> Severity {
    match status {
        500.. => Severity::Critical,
        400..=499 => Severity::Warning,
        _ => Severity::None,
    }
}

/// Severity of a failure: the highest severity of any of its errors.
pub fn classify_failure(failure: &Failure) -> Severity {
    failure
        .errors()
        .iter()
        .map(|error| classify(error.status))
        .max()
        .unwrap_or(Severity::Critical)
}

/// Sender, log sink and response policy shared by every node of a tree.
#[derive(Clone)]
pub struct Dispatcher {
    sender: Arc<dyn Sender>,
    sink: Arc<dyn LogSink>,
    delete_status: u16,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            sender: Arc::new(JsonApiSender),
            sink: Arc::new(TracingSink),
            delete_status: 200,
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("delete_status", &self.delete_status)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn Sender>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            sender,
            sink,
            ..Self::default()
        }
    }

    pub fn with_sender(mut self, sender: Arc<dyn Sender>) -> Self {
        self.sender = sender;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Status written after a successful delete, `200` or `204`.
    pub fn with_delete_status(mut self, status: u16) -> Self {
        self.delete_status = status;
        self
    }

    pub fn delete_status(&self) -> u16 {
        self.delete_status
    }

    /// Logs and encodes one response.
    ///
    /// `status` applies to success payloads; a failure is always sent with
    /// the status of its leading error.
    pub fn send(&self, ctx: &RequestContext, sendable: Sendable, status: u16) -> Response {
        if let Sendable::Failure(failure) = &sendable {
            self.log_failure(ctx, failure);
        }

        match self.sender.encode(&sendable, status) {
            Ok(response) => response,
            Err(err) => {
                let level = match classify(err.status) {
                    Severity::Critical => LogLevel::Critical,
                    _ => LogLevel::Warning,
                };
                self.sink.log(
                    level,
                    ctx,
                    &format!("failed to send response ({}): {err}", err.status),
                );
                internal_error_response()
            }
        }
    }

    /// Sends a failure with its own status.
    pub fn fail(&self, ctx: &RequestContext, failure: impl Into<Failure>) -> Response {
        let failure = failure.into();
        let status = failure.status();
        self.send(ctx, Sendable::Failure(failure), status)
    }

    fn log_failure(&self, ctx: &RequestContext, failure: &Failure) {
        let level = match classify_failure(failure) {
            Severity::None => return,
            Severity::Warning => LogLevel::Warning,
            Severity::Critical => LogLevel::Critical,
        };
        let message = format!(
            "{} {} -> {}: {failure}",
            ctx.method(),
            ctx.path(),
            failure.status()
        );
        self.sink.log(level, ctx, &message);
    }

    /// `POST {matcher}`.
    pub async fn save(
        &self,
        ctx: RequestContext,
        op: &dyn Save,
        resource_type: &str,
        body: Result<Bytes, BytesRejection>,
    ) -> Response {
        let object = match decode_body(body, resource_type) {
            Ok(object) => object,
            Err(failure) => return self.fail(&ctx, failure),
        };

        match op.save(ctx.clone(), object).await {
            Ok(saved) => self.send(&ctx, saved.into(), op.created_status()),
            Err(failure) => self.fail(&ctx, failure),
        }
    }

    /// `GET {id_matcher}`.
    pub async fn get(&self, ctx: RequestContext, op: &dyn Get) -> Response {
        let id = match instance_id(&ctx) {
            Ok(id) => id,
            Err(failure) => return self.fail(&ctx, failure),
        };

        match op.get(ctx.clone(), id).await {
            Ok(object) => self.send(&ctx, object.into(), 200),
            Err(failure) => self.fail(&ctx, failure),
        }
    }

    /// `GET {matcher}`.
    pub async fn list(&self, ctx: RequestContext, op: &dyn List) -> Response {
        match op.list(ctx.clone()).await {
            Ok(list) => self.send(&ctx, list.into(), 200),
            Err(failure) => self.fail(&ctx, failure),
        }
    }

    /// `PATCH {id_matcher}`.
    pub async fn update(
        &self,
        ctx: RequestContext,
        op: &dyn Update,
        resource_type: &str,
        body: Result<Bytes, BytesRejection>,
    ) -> Response {
        let object = match instance_object(&ctx, body, resource_type) {
            Ok(object) => object,
            Err(failure) => return self.fail(&ctx, failure),
        };

        match op.update(ctx.clone(), object).await {
            Ok(updated) => self.send(&ctx, updated.into(), 200),
            Err(failure) => self.fail(&ctx, failure),
        }
    }

    /// `DELETE {id_matcher}`. Success carries no document.
    pub async fn delete(&self, ctx: RequestContext, op: &dyn Delete) -> Response {
        let id = match instance_id(&ctx) {
            Ok(id) => id,
            Err(failure) => return self.fail(&ctx, failure),
        };

        match op.delete(ctx.clone(), id).await {
            Ok(()) => self.send(&ctx, Sendable::Empty, self.delete_status),
            Err(failure) => self.fail(&ctx, failure),
        }
    }

    /// `PATCH {id_matcher}/{action}`. The body is decoded and checked like an
    /// update's.
    pub async fn action(
        &self,
        ctx: RequestContext,
        op: &dyn Action,
        resource_type: &str,
        body: Result<Bytes, BytesRejection>,
    ) -> Response {
        let object = match instance_object(&ctx, body, resource_type) {
            Ok(object) => object,
            Err(failure) => return self.fail(&ctx, failure),
        };

        match op.apply(ctx.clone(), object).await {
            Ok(object) => self.send(&ctx, object.into(), 200),
            Err(failure) => self.fail(&ctx, failure),
        }
    }

    /// `GET {id_matcher}/{name}` and `GET {id_matcher}/relationships/{name}`.
    pub async fn to_one(&self, ctx: RequestContext, op: &dyn ToOne) -> Response {
        let id = match instance_id(&ctx) {
            Ok(id) => id,
            Err(failure) => return self.fail(&ctx, failure),
        };

        match op.fetch(ctx.clone(), id).await {
            Ok(object) => self.send(&ctx, object.into(), 200),
            Err(failure) => self.fail(&ctx, failure),
        }
    }

    /// `GET {id_matcher}/{names}` and `GET {id_matcher}/relationships/{names}`.
    pub async fn to_many(&self, ctx: RequestContext, op: &dyn ToMany) -> Response {
        let id = match instance_id(&ctx) {
            Ok(id) => id,
            Err(failure) => return self.fail(&ctx, failure),
        };

        match op.fetch(ctx.clone(), id).await {
            Ok(list) => self.send(&ctx, list.into(), 200),
            Err(failure) => self.fail(&ctx, failure),
        }
    }

    /// JSON:API `404` for paths no resource matches.
    pub fn not_found(&self, ctx: &RequestContext) -> Response {
        let error = ErrorObject::not_found(format!("no route matches {}", ctx.path()));
        self.fail(ctx, error)
    }

    /// JSON:API `405` for a known path that does not serve the method.
    pub fn method_not_allowed(&self, ctx: &RequestContext) -> Response {
        let error = ErrorObject::method_not_allowed(format!(
            "{} is not supported on {}",
            ctx.method(),
            ctx.path()
        ));
        self.fail(ctx, error)
    }
}

/// Decodes the object addressed by `{id_matcher}`.
///
/// The body's `data.id` must match the path identifier; when absent it is
/// taken from the path.
fn instance_object(
    ctx: &RequestContext,
    body: Result<Bytes, BytesRejection>,
    resource_type: &str,
) -> Result<Object, Failure> {
    let mut object = decode_body(body, resource_type)?;
    let id = instance_id(ctx)?;

    if object.id.is_empty() {
        object.id = id;
    } else if object.id != id {
        let error = ErrorObject::conflict(format!(
            "resource id '{}' does not match endpoint id '{id}'",
            object.id
        ))
        .with_pointer("/data/id");
        return Err(error.into());
    }
    Ok(object)
}

/// Body extraction failures keep axum's status (e.g. `413`) but are
/// reported as JSON:API errors.
fn decode_body(
    body: Result<Bytes, BytesRejection>,
    resource_type: &str,
) -> Result<Object, Failure> {
    let body = body.map_err(|rejection| {
        let status = rejection.status().as_u16();
        ErrorObject::new(
            status,
            jsh_domain::error_codes::INVALID_DOCUMENT,
            rejection.body_text(),
        )
    })?;
    decode_object(&body, resource_type)
}

fn instance_id(ctx: &RequestContext) -> Result<String, Failure> {
    ctx.param(ID_PARAM).map(str::to_string).ok_or_else(|| {
        ErrorObject::internal(format!("path parameter '{ID_PARAM}' missing for {}", ctx.path()))
            .with_parameter(ID_PARAM)
            .into()
    })
}
