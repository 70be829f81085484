//! HTTP middleware installed by [`Api::router`](crate::Api::router):
//! request ids, request logging and, when enabled, CORS.

mod logging;
mod request_id;

pub use logging::RequestLoggingLayer;
pub use request_id::{RequestId, RequestIdLayer, MAX_REQUEST_ID_LEN, REQUEST_ID_HEADER};

use axum::http::{header, HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

/// CORS layer for browser clients of the API.
///
/// Any origin may call the JSON:API methods, and the request id header is
/// exposed to scripts.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}
