//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the configured path pattern
//! - Wire up middleware (request ID, tracing)
//! - Build the upstream HTTP client
//! - Bind the router to a listener and serve until shutdown

use axum::{
    body::Body,
    http::{HeaderName, Request},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::error::ServerError;
use crate::http::proxy::proxy_handler;
use crate::transform::Sanitizer;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub client: Client<HttpConnector, Body>,
    pub tenant_header: HeaderName,
    pub sanitizer: Arc<Sanitizer>,
}

impl AppState {
    /// Build handler state from a loaded configuration.
    pub fn new(config: Arc<ProxyConfig>) -> Result<Self, ServerError> {
        let tenant_header = HeaderName::from_bytes(config.tenant_header.as_bytes()).map_err(
            |source| ServerError::TenantHeader {
                name: config.tenant_header.clone(),
                source,
            },
        )?;

        let sanitizer = Sanitizer::new(&config.sensitive_field).map_err(|source| {
            ServerError::Sanitizer {
                field: config.sensitive_field.clone(),
                source,
            }
        })?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            config,
            client,
            tenant_header,
            sanitizer: Arc::new(sanitizer),
        })
    }
}

/// HTTP server for the tenant proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let config = Arc::new(config);
        let state = AppState::new(config.clone())?;
        let router = Self::build_router(&config.pattern, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// A pattern ending in `/` serves its whole subtree; any other pattern
    /// serves exactly that path.
    fn build_router(pattern: &str, state: AppState) -> Router {
        let mut router = Router::new().route(pattern, any(proxy_handler));
        if pattern.ends_with('/') {
            router = router.route(&format!("{pattern}{{*path}}"), any(proxy_handler));
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Run the server on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            pattern = %self.config.pattern,
            upstream = %self.config.upstream,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The router, for driving requests without a listener.
    pub fn into_router(self) -> Router {
        self.router
    }
}
