//! Request-scoped context handed to every storage operation.

use std::sync::Arc;

use tokio::sync::watch;

/// Context of one inbound request.
///
/// Cheap to clone. Carries the request id, the matched path parameters and a
/// cancellation signal tied to the lifetime of the request handler: when the
/// handler future is dropped (the client went away, or the response has been
/// produced) the signal fires.
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
    cancel: watch::Receiver<()>,
    _keepalive: Option<Arc<watch::Sender<()>>>,
}

#[derive(Debug)]
struct ContextInner {
    request_id: Option<String>,
    method: String,
    path: String,
    params: Vec<(String, String)>,
}

/// Keeps a [`RequestContext`] alive. Dropping it cancels the context.
#[derive(Debug)]
pub struct CancelGuard {
    _sender: watch::Sender<()>,
}

impl RequestContext {
    /// Creates a context and the guard controlling its cancellation.
    pub fn new(
        request_id: Option<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        params: Vec<(String, String)>,
    ) -> (Self, CancelGuard) {
        let (sender, cancel) = watch::channel(());
        let context = Self {
            inner: Arc::new(ContextInner {
                request_id,
                method: method.into(),
                path: path.into(),
                params,
            }),
            cancel,
            _keepalive: None,
        };
        (context, CancelGuard { _sender: sender })
    }

    /// A context outside of any request, for background work and tests.
    ///
    /// It is never cancelled.
    pub fn detached() -> Self {
        let (mut context, guard) = Self::new(None, "", "", Vec::new());
        context._keepalive = Some(Arc::new(guard._sender));
        context
    }

    pub fn request_id(&self) -> Option<&str> {
        self.inner.request_id.as_deref()
    }

    pub fn method(&self) -> &str {
        &self.inner.method
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Returns a path parameter by name.
    ///
    /// The resource's own identifier is `id`; identifiers of enclosing
    /// resources are named after their collection, e.g. `users_id`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.inner
            .params
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.inner.params
    }

    /// Whether the request scope has ended.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.has_changed().is_err()
    }

    /// Resolves once the request scope has ended.
    pub async fn cancelled(&self) {
        let mut cancel = self.cancel.clone();
        while cancel.changed().await.is_ok() {}
    }
}
