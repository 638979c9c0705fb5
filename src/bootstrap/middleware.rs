//! Fixed middleware pieces: CORS, security headers, error envelopes, panics.

use crate::config::{Environment, ServiceConfig};
use crate::error::{AppError, ErrorDetail, INTERNAL_MESSAGE};
use crate::response::failure_body;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use std::any::Any;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Security headers set on every response unless the handler already set them.
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
    ("x-dns-prefetch-control", "off"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("cross-origin-opener-policy", "same-origin"),
];

/// Configured origins with credentials. Without configured origins, development and
/// test mirror the caller's origin; production allows none. `*` mirrors, since
/// credentials rule out a literal wildcard.
pub fn cors_layer(config: &ServiceConfig) -> CorsLayer {
    let wildcard = config.cors_origins.iter().any(|o| o == "*");
    let origin = if wildcard {
        AllowOrigin::mirror_request()
    } else if !config.cors_origins.is_empty() {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    } else if config.environment == Environment::Production {
        AllowOrigin::list(Vec::<HeaderValue>::new())
    } else {
        AllowOrigin::mirror_request()
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
}

pub async fn route_not_found() -> AppError {
    AppError::NotFound("Route".into())
}

/// CatchPanicLayer handler: log and answer with the generic 500 envelope.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "handler panicked");
    envelope(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
}

/// Normalises error responses into the `{success: false, message}` envelope.
///
/// Responses produced by layers or the router (413 from the body limit, 405) carry
/// plain bodies and are rewritten. Outside production, the cause recorded in
/// `ErrorDetail` replaces the generic internal message.
pub async fn format_errors(State(environment): State<Environment>, response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    if let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() {
        if environment == Environment::Production {
            return response;
        }
        return rewrite(response, &detail);
    }

    if is_json(&response) {
        return response;
    }
    let message = match status {
        StatusCode::PAYLOAD_TOO_LARGE => "request body too large",
        StatusCode::METHOD_NOT_ALLOWED => "Method not allowed",
        StatusCode::NOT_FOUND => "Route not found",
        s if s.is_server_error() => INTERNAL_MESSAGE,
        s => s.canonical_reason().unwrap_or("Request failed"),
    };
    rewrite(response, message)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false)
}

fn rewrite(response: Response, message: &str) -> Response {
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(failure_body(message).to_string()))
}

fn envelope(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(failure_body(message))).into_response()
}
