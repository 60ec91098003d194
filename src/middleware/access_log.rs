//! Access logging and request metrics.
//!
//! One log line and one histogram observation per request, taken from
//! the outside of the pipeline so the recorded latency covers routing
//! and forwarding.

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderValue, Request};
use axum::middleware::{from_fn, Next};
use axum::response::Response;
use uuid::Uuid;

use crate::middleware::{Middleware, PRIORITY_ACCESS_LOG_METRICS};
use crate::observability::metrics;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The route pattern a request matched, propagated from the dispatch
/// handler to the access log through response extensions.
#[derive(Debug, Clone)]
pub struct MatchedRoute(pub String);

/// Middleware recording an access-log line and a duration histogram
/// per request.
pub struct AccessLogMetrics;

impl AccessLogMetrics {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AccessLogMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for AccessLogMetrics {
    fn priority(&self) -> i32 {
        PRIORITY_ACCESS_LOG_METRICS
    }

    fn apply(&self, router: axum::Router) -> axum::Router {
        router.layer(from_fn(access_log_metrics))
    }
}

async fn access_log_metrics(mut request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();

    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string())
        .unwrap_or_default();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();
    let referer = header_str(&request, header::REFERER);
    let user_agent = header_str(&request, header::USER_AGENT);

    let request_id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(X_REQUEST_ID, value);
    }

    let mut response = next.run(request).await;

    let status = response.status();
    // Metrics are labeled with the matched pattern so parameterized
    // routes share one series; misses fall back to the raw path.
    let route = response
        .extensions()
        .get::<MatchedRoute>()
        .map(|m| m.0.clone())
        .unwrap_or_else(|| uri.path().to_string());

    metrics::record_request(method.as_str(), status.as_u16(), &route, started);

    tracing::info!(
        remote_addr = %remote_addr,
        method = %method,
        uri = %uri,
        version = ?version,
        status = status.as_u16(),
        referer = %referer,
        user_agent = %user_agent,
        request_id = %request_id,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "access"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

fn header_str(request: &Request<Body>, name: header::HeaderName) -> String {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
