//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (request ID, tracing)
//! - Dispatch requests: path → discovery → selection → forwarding
//! - Apply configuration reloads to the static registry
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::DispatcherConfig;
use crate::discovery::{self, DiscoveryResolver, Registry, RegistryError, ServiceName, StaticRegistry};
use crate::http::forward::{ExchangeContext, Forwarder};
use crate::http::request::{request_id, MakeDispatchRequestId};
use crate::load_balancer::BalancerFactory;
use crate::observability::metrics;
use crate::resilience::ExchangeTimeouts;
use crate::routing::PathRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<PathRouter>,
    pub resolver: Arc<DiscoveryResolver>,
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the edge dispatcher.
pub struct HttpServer {
    router: Router,
    config: DispatcherConfig,
    resolver: Arc<DiscoveryResolver>,
    static_registry: Option<Arc<StaticRegistry>>,
}

impl HttpServer {
    /// Create a server using the registry named by the configuration.
    pub fn new(config: DispatcherConfig) -> Result<Self, RegistryError> {
        let (registry, static_registry) = discovery::build_registry(&config.discovery, &config.services)?;
        let mut server = Self::with_registry(config, registry);
        server.static_registry = static_registry;
        Ok(server)
    }

    /// Create a server around an externally provided registry.
    pub fn with_registry(config: DispatcherConfig, registry: Arc<dyn Registry>) -> Self {
        let resolver = Arc::new(DiscoveryResolver::new(
            registry,
            &config.discovery,
            BalancerFactory::new(config.load_balancer.scope),
        ));
        let forwarder = Arc::new(Forwarder::new(
            config.headers.clone(),
            ExchangeTimeouts::from(&config.timeouts),
        ));

        let state = AppState {
            router: Arc::new(PathRouter::new(&config.dispatch.path_prefix)),
            resolver: resolver.clone(),
            forwarder,
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            resolver,
            static_registry: None,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new().fallback(dispatch_handler).with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeDispatchRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configurations received on `config_updates` replace the static
    /// registry's service table; other settings are fixed at startup.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<DispatcherConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            prefix = %self.config.dispatch.path_prefix,
            "HTTP server starting"
        );

        tokio::spawn(apply_config_updates(config_updates, self.static_registry.clone()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!(services = self.resolver.context_count(), "HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// The resolver shared with the request handlers.
    pub fn resolver(&self) -> Arc<DiscoveryResolver> {
        self.resolver.clone()
    }
}

async fn apply_config_updates(
    mut updates: mpsc::UnboundedReceiver<DispatcherConfig>,
    static_registry: Option<Arc<StaticRegistry>>,
) {
    while let Some(config) = updates.recv().await {
        match &static_registry {
            Some(registry) => registry.replace(&config.services),
            None => tracing::info!("Configuration change ignored: registry is not static"),
        }
    }
}

/// Dispatch handler.
/// Parses the dispatch path, resolves the service, selects an endpoint and forwards.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    let path = request.uri().path().to_string();

    let Some(target) = state.router.route(&path) else {
        tracing::debug!(request_id = %request_id, path = %path, "Path is not a dispatch path");
        return (StatusCode::NOT_FOUND, "No dispatch route").into_response();
    };

    let Some(service) = ServiceName::new(target.service) else {
        tracing::warn!(request_id = %request_id, path = %path, "Empty service name");
        return StatusCode::NOT_FOUND.into_response();
    };

    let candidates = state.resolver.resolve(&service).await;
    let balancer = state.resolver.balancer(&service);
    let Some(endpoint) = balancer.select(candidates.as_slice()) else {
        tracing::warn!(request_id = %request_id, service = %service, "No instance available");
        metrics::record_unresolved(StatusCode::NOT_FOUND.as_u16(), start);
        return StatusCode::NOT_FOUND.into_response();
    };

    let path_and_query = match request.uri().query() {
        Some(query) => format!("{}?{}", target.forward_path, query),
        None => target.forward_path,
    };

    let ctx = ExchangeContext {
        service: service.as_str().to_string(),
        request_id: request_id.clone(),
        client_addr: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
        path_and_query,
    };

    match state.forwarder.forward(ctx, request, endpoint).await {
        Ok(response) => {
            metrics::record_request(service.as_str(), response.status().as_u16(), start);
            response
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                service = %service,
                endpoint = %endpoint,
                error = %e,
                "Upstream exchange failed"
            );
            metrics::record_upstream_failure(service.as_str(), e.kind());
            metrics::record_request(service.as_str(), e.status().as_u16(), start);
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{RegistryQuery, ServiceInstance};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Debug, Default)]
    struct CountingRegistry {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Registry for CountingRegistry {
        async fn find_instances(&self, _query: &RegistryQuery) -> Result<Vec<ServiceInstance>, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![ServiceInstance::new("bad", vec!["not-an-endpoint".into()])])
        }
    }

    async fn send(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn non_dispatch_path_is_404_without_lookup() {
        let registry = Arc::new(CountingRegistry::default());
        let server = HttpServer::with_registry(DispatcherConfig::default(), registry.clone());

        let response = send(server.router.clone(), "/api/orders").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(registry.calls.load(Ordering::SeqCst), 0);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn empty_service_is_404_without_lookup() {
        let registry = Arc::new(CountingRegistry::default());
        let server = HttpServer::with_registry(DispatcherConfig::default(), registry.clone());

        let response = send(server.router.clone(), "/ui//index.html").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(registry.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn only_malformed_endpoints_is_404() {
        let registry = Arc::new(CountingRegistry::default());
        let server = HttpServer::with_registry(DispatcherConfig::default(), registry.clone());

        let response = send(server.router.clone(), "/ui/orders/list").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
        assert_eq!(server.resolver().context_count(), 1);
    }

    #[test]
    fn made_up_services_do_not_create_metric_series() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let server = HttpServer::new(DispatcherConfig::default()).unwrap();

        ::metrics::with_local_recorder(&recorder, || {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async {
                for name in ["a1f3", "b7c9", "zz-random"] {
                    let response = send(server.router.clone(), &format!("/ui/{}/x", name)).await;
                    assert_eq!(response.status(), StatusCode::NOT_FOUND);
                }
            });
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"service="unresolved""#));
        for name in ["a1f3", "b7c9", "zz-random"] {
            assert!(!rendered.contains(name), "{} leaked into metrics", name);
        }
    }

    #[tokio::test]
    async fn static_registry_from_config() {
        let server = HttpServer::new(DispatcherConfig::default()).unwrap();
        assert!(server.static_registry.is_some());
        assert_eq!(server.config().dispatch.path_prefix, "ui");
    }
}
