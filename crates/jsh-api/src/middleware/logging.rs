//! Request logging middleware.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{info, info_span, Instrument};

use super::RequestId;

/// Runs each request inside a `request` span and logs its start and
/// completion under the `jsh::http` target.
///
/// Everything logged while the request is handled, dispatcher entries
/// included, is recorded inside the span and carries its request id.
/// Install it inside [`RequestIdLayer`](super::RequestIdLayer).
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLoggingLayer;

impl RequestLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggingService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestLoggingService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLoggingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map_or("-", RequestId::as_str);
        let span = info_span!(
            target: "jsh::http",
            "request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path()
        );

        let start = Instant::now();
        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                info!(target: "jsh::http", "request started");
                let response = inner.call(request).await?;
                info!(
                    target: "jsh::http",
                    status = response.status().as_u16(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "request completed"
                );
                Ok(response)
            }
            .instrument(span),
        )
    }
}
