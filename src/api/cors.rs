//! Origin allow-list and method gate shared by the dashboard routes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::error::ApiError;

/// Allowed origins and methods for a group of routes.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Arc<[String]>,
    methods: Arc<[Method]>,
    allow_methods: HeaderValue,
}

impl CorsPolicy {
    /// Policy for the given origins and methods. `OPTIONS` is always allowed.
    pub fn new<I, S>(origins: I, methods: &[Method]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: Arc<[String]> = origins
            .into_iter()
            .map(Into::into)
            .map(|o: String| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let mut names: Vec<&str> = methods.iter().map(Method::as_str).collect();
        names.push(Method::OPTIONS.as_str());
        let allow_methods = HeaderValue::from_str(&names.join(", "))
            .unwrap_or_else(|_| HeaderValue::from_static("OPTIONS"));

        Self {
            origins,
            methods: methods.into(),
            allow_methods,
        }
    }

    /// Whether `origin` may read responses.
    pub fn allows_origin(&self, origin: &str) -> bool {
        self.origins.iter().any(|allowed| allowed == origin)
    }

    /// Whether `method` is served by this route group.
    pub fn allows_method(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    fn apply(&self, request_origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        if let Some(origin) = request_origin {
            if origin.to_str().is_ok_and(|o| self.allows_origin(o)) {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
                headers.append(VARY, HeaderValue::from_static("Origin"));
            }
        }
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
    }
}

/// Middleware: CORS headers on every response, empty 200 for `OPTIONS`,
/// JSON 405 for methods outside the policy.
///
/// A disallowed origin only loses the allow-origin header; the request is
/// still processed.
pub async fn cors_gate(State(policy): State<CorsPolicy>, request: Request, next: Next) -> Response {
    let origin = request.headers().get(ORIGIN).cloned();
    let method = request.method().clone();

    let mut response = if method == Method::OPTIONS {
        (StatusCode::OK, Body::empty()).into_response()
    } else if !policy.allows_method(&method) {
        debug!(%method, path = %request.uri().path(), "Method not allowed");
        ApiError::MethodNotAllowed.into_response()
    } else {
        next.run(request).await
    };

    policy.apply(origin.as_ref(), response.headers_mut());
    response
}
