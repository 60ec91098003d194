//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Compile the configured route table into the radix router
//! - Wire up middleware (access log, tracing, timeout)
//! - Dispatch requests: resolve → forward, or redirect on a
//!   trailing-slash/case repair, or 404
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::middleware::{compose, AccessLogMetrics, MatchedRoute};
use crate::proxy::forward::{forward, Backend, HttpClient};
use crate::router::{InsertError, Router as GatewayRouter};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Route-table construction failures; all are configuration faults and
/// abort startup.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid backend url '{url}': {source}")]
    BackendUrl {
        url: String,
        source: url::ParseError,
    },

    #[error(transparent)]
    Route(#[from] InsertError),
}

/// Application state injected into the dispatch handler.
#[derive(Clone)]
struct AppState {
    routes: Arc<GatewayRouter<Arc<Backend>>>,
    client: HttpClient,
}

/// The gateway's HTTP server.
pub struct GatewayServer {
    router: axum::Router,
    routes: Arc<GatewayRouter<Arc<Backend>>>,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Compiles the configured routes and builds the serving pipeline.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut routes = GatewayRouter::new();
        for route in &config.routes {
            let url = route.backend.url().map_err(|source| GatewayError::BackendUrl {
                url: route.backend.url.clone(),
                source,
            })?;
            let backend = Arc::new(Backend::new(url));

            for method in &route.frontend.methods {
                routes.add(method, &route.frontend.path, backend.clone())?;
            }
        }
        let routes = Arc::new(routes);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState {
            routes: routes.clone(),
            client,
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            routes,
            config,
        })
    }

    /// Builds the axum router: one catch-all dispatch route plus the
    /// middleware stack.
    fn build_router(state: AppState) -> axum::Router {
        let router = axum::Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(TimeoutLayer::new(DEFAULT_REQUEST_TIMEOUT))
            .layer(TraceLayer::new_for_http());

        compose(vec![Box::new(AccessLogMetrics::new())], router)
    }

    /// The compiled route table.
    pub fn router(&self) -> &GatewayRouter<Arc<Backend>> {
        &self.routes
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until ctrl-c or a shutdown trigger.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = shutdown.recv() => {}
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}

/// Resolves the request against the route table and forwards it, or
/// answers with a repair redirect or 404.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let (backend, matched_route, tsr) = {
        let (handler, params, tsr) = state.routes.resolve(method.as_str(), &path);
        let matched = params.map(|p| p.route().to_string());
        (handler.cloned(), matched, tsr)
    };

    if let Some(backend) = backend {
        tracing::debug!(
            method = %method,
            path = %path,
            backend = %backend.url(),
            "Routing request"
        );

        let mut response = forward(&state.client, &backend, request).await;
        if let Some(route) = matched_route {
            response.extensions_mut().insert(MatchedRoute(route));
        }
        return response;
    }

    // Trailing-slash recommendation: the same path with the slash
    // toggled names a registered route.
    if tsr {
        let toggled = if path.len() > 1 && path.ends_with('/') {
            path[..path.len() - 1].to_string()
        } else {
            format!("{path}/")
        };
        return redirect(&toggled, request.uri().query());
    }

    // Second chance: repair the case (and the trailing slash) before
    // giving up.
    if let Some(fixed) = state.routes.find_case_insensitive(method.as_str(), &path, true) {
        return redirect(&fixed, request.uri().query());
    }

    tracing::debug!(method = %method, path = %path, "No route matched");
    (StatusCode::NOT_FOUND, "No matching route found").into_response()
}

fn redirect(path: &str, query: Option<&str>) -> Response {
    let location = match query {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    match HeaderValue::from_str(&location) {
        Ok(value) => (
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, value)],
        )
            .into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
