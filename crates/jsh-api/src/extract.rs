//! Request context extractor.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, RawPathParams},
    http::request::Parts,
};
use jsh_domain::{CancelGuard, RequestContext};

use crate::middleware::{RequestId, REQUEST_ID_HEADER};
use crate::routes::ID_PARAM;

/// Request extension naming the axum parameter that holds the matched
/// node's own identifier. Installed on every instance-scoped route.
#[derive(Debug, Clone)]
pub(crate) struct OwnIdParam(pub Arc<str>);

/// Builds a [`RequestContext`] for the matched route.
///
/// The matched node's own identifier is exposed as `id`; enclosing
/// identifiers keep their `{collection}_id` names.
///
/// The context is cancelled as soon as the [`CancelGuard`] is dropped, so a
/// handler must hold the guard until its storage call has finished. axum
/// drops the handler future when the client disconnects, which drops the
/// guard with it.
pub struct RequestScope {
    pub ctx: RequestContext,
    pub guard: CancelGuard,
}

impl RequestScope {
    pub fn into_parts(self) -> (RequestContext, CancelGuard) {
        (self.ctx, self.guard)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let own_id = parts.extensions.get::<OwnIdParam>().map(|p| p.0.clone());

        // The fallback route has no parameters.
        let params = match RawPathParams::from_request_parts(parts, state).await {
            Ok(raw) => raw
                .iter()
                .map(|(key, value)| {
                    let key = match &own_id {
                        Some(own) if own.as_ref() == key => ID_PARAM,
                        _ => key,
                    };
                    (key.to_string(), value.to_string())
                })
                .collect(),
            Err(_) => Vec::new(),
        };

        // Set by RequestIdLayer; the header covers routers built without it.
        let request_id = match parts.extensions.get::<RequestId>() {
            Some(id) => Some(id.as_str().to_string()),
            None => parts
                .headers
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string()),
        };

        let (ctx, guard) = RequestContext::new(
            request_id,
            parts.method.as_str(),
            parts.uri.path(),
            params,
        );
        Ok(Self { ctx, guard })
    }
}
