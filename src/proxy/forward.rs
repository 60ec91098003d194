//! Reverse-proxy request rewriting and forwarding.
//!
//! A matched route hands the request to [`forward`], which points it at
//! the configured backend and relays the upstream response. The
//! request's query string survives the rewrite; the path is replaced by
//! the backend URL's path.

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderMap, HeaderName, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use url::Url;

/// Header telling the backend which host the client originally asked
/// for.
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Connection-scoped headers that must not cross the proxy.
fn hop_by_hop_headers() -> [HeaderName; 8] {
    [
        header::CONNECTION,
        HeaderName::from_static("keep-alive"),
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ]
}

/// Shared outbound HTTP client.
pub type HttpClient = Client<HttpConnector, Body>;

/// A configured upstream backend.
#[derive(Debug, Clone)]
pub struct Backend {
    url: Url,
}

impl Backend {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn scheme(&self) -> Scheme {
        if self.url.scheme() == "https" {
            Scheme::HTTPS
        } else {
            Scheme::HTTP
        }
    }

    fn authority(&self) -> Option<Authority> {
        let host = self.url.host_str()?;
        let authority = match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Authority::try_from(authority.as_str()).ok()
    }
}

/// Rewrites `request` to target `backend` and forwards it, relaying
/// the upstream response. Transport failures map to 502.
pub async fn forward(
    client: &HttpClient,
    backend: &Backend,
    mut request: Request<Body>,
) -> Response {
    let original_host = request.headers().get(header::HOST).cloned();

    let mut parts = request.uri().clone().into_parts();
    parts.scheme = Some(backend.scheme());

    let Some(authority) = backend.authority() else {
        return (StatusCode::BAD_GATEWAY, "Invalid backend address").into_response();
    };
    parts.authority = Some(authority);

    let rewritten = match request.uri().query() {
        Some(query) => format!("{}?{query}", backend.url.path()),
        None => backend.url.path().to_string(),
    };
    match PathAndQuery::try_from(rewritten.as_str()) {
        Ok(path_and_query) => parts.path_and_query = Some(path_and_query),
        Err(_) => return (StatusCode::BAD_GATEWAY, "Invalid backend path").into_response(),
    }

    match Uri::from_parts(parts) {
        Ok(uri) => *request.uri_mut() = uri,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "URI rewrite failed").into_response()
        }
    }

    strip_hop_by_hop(request.headers_mut());

    // The outgoing Host is derived from the rewritten authority; the
    // client's host survives in X-Forwarded-Host.
    request.headers_mut().remove(header::HOST);
    if let Some(host) = original_host {
        request.headers_mut().insert(X_FORWARDED_HOST, host);
    }

    match client.request(request).await {
        Ok(response) => {
            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                backend = %backend.url,
                "Upstream request failed"
            );
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// Removes hop-by-hop headers: those named by the Connection header,
/// then the standard set.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let connection_named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| name.trim().parse::<HeaderName>().ok())
        .collect();

    for name in connection_named {
        headers.remove(&name);
    }
    for name in &hop_by_hop_headers() {
        headers.remove(name);
    }
}
