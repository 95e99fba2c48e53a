//! Streaming proxy forwarder.
//!
//! # Data Flow
//! ```text
//! inbound body ──frames──▶ hyper client conn ──▶ backend          (request direction)
//! client ◀── hyper server conn ◀──frames── ExchangeBody ◀── backend (response direction)
//! ```
//!
//! Each direction is polled by its own connection task and throttled only by
//! that connection's flow control. Nothing here buffers a body.
//!
//! The response timeout covers the wait for the response head once the
//! request body has been fully sent. Uploads themselves are never bounded.

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{Request, Response, StatusCode, Version},
    response::IntoResponse,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::HeaderPolicyConfig;
use crate::discovery::Endpoint;
use crate::http::request::{outbound_headers, strip_hop_by_hop, UploadBody};
use crate::http::response::{ExchangeBody, ExchangeGuard};
use crate::resilience::{within, ExchangeTimeouts};

/// Outbound HTTP/1.1 client shared by all exchanges.
pub type HttpClient = Client<HttpConnector, Body>;

/// Why an exchange could not produce a backend response.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid outbound request: {0}")]
    InvalidTarget(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[source] hyper_util::client::legacy::Error),

    #[error("upstream response timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl ForwardError {
    /// Status returned to the inbound client.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::InvalidTarget(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ForwardError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Metric label for the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::InvalidTarget(_) => "target",
            ForwardError::Upstream(e) if e.is_connect() => "connect",
            ForwardError::Upstream(_) => "request",
            ForwardError::Timeout(_) => "timeout",
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> axum::response::Response {
        let message = match &self {
            ForwardError::InvalidTarget(_) => "Invalid upstream target",
            ForwardError::Upstream(_) => "Upstream request failed",
            ForwardError::Timeout(_) => "Upstream response timed out",
        };
        (self.status(), message).into_response()
    }
}

/// Per-request inputs to [`Forwarder::forward`].
#[derive(Debug, Clone)]
pub struct ExchangeContext {
    pub service: String,
    pub request_id: String,
    pub client_addr: Option<SocketAddr>,
    /// Path (and query) requested from the backend.
    pub path_and_query: String,
}

/// Relays one inbound exchange to a chosen endpoint.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: HttpClient,
    policy: HeaderPolicyConfig,
    timeouts: ExchangeTimeouts,
}

impl Forwarder {
    pub fn new(policy: HeaderPolicyConfig, timeouts: ExchangeTimeouts) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeouts.connect));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(timeouts.idle)
            .build(connector);

        Self {
            client,
            policy,
            timeouts,
        }
    }

    /// Forward `request` to `endpoint` and return the relayed response.
    ///
    /// The returned body streams from the backend; its status and headers are
    /// the backend's, minus hop-by-hop headers.
    pub async fn forward(
        &self,
        ctx: ExchangeContext,
        request: Request<Body>,
        endpoint: &Endpoint,
    ) -> Result<Response<Body>, ForwardError> {
        let (parts, body) = request.into_parts();
        let (body, uploaded) = UploadBody::new(body);

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(endpoint.uri_for(&ctx.path_and_query)?)
            .version(Version::HTTP_11)
            .body(Body::new(body))?;
        *outbound.headers_mut() = outbound_headers(&parts.headers, endpoint, ctx.client_addr, &self.policy);

        tracing::debug!(
            request_id = %ctx.request_id,
            service = %ctx.service,
            endpoint = %endpoint,
            method = %outbound.method(),
            path = %ctx.path_and_query,
            "Forwarding request"
        );

        let guard = ExchangeGuard::start(&ctx.service, endpoint.to_string(), &ctx.request_id);

        let response = self.client.request(outbound);
        tokio::pin!(response);

        // A backend may answer before the upload ends; otherwise the clock
        // starts once the last request frame is sent.
        let response = tokio::select! {
            biased;
            head = &mut response => head,
            _ = uploaded => within(self.timeouts.response, &mut response)
                .await
                .map_err(ForwardError::Timeout)?,
        }
        .map_err(ForwardError::Upstream)?;

        let (mut parts, incoming) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);

        tracing::debug!(
            request_id = %ctx.request_id,
            service = %ctx.service,
            endpoint = %endpoint,
            status = %parts.status,
            "Upstream responded"
        );

        Ok(Response::from_parts(parts, Body::new(ExchangeBody::new(incoming, guard))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeoutConfig;
    use std::time::Duration;

    fn forwarder(response_secs: u64) -> Forwarder {
        let timeouts = ExchangeTimeouts::from(&TimeoutConfig {
            connect_secs: 1,
            response_secs,
            idle_secs: 5,
        });
        Forwarder::new(HeaderPolicyConfig::default(), timeouts)
    }

    fn ctx(path: &str) -> ExchangeContext {
        ExchangeContext {
            service: "svc".into(),
            request_id: "test".into(),
            client_addr: None,
            path_and_query: path.into(),
        }
    }

    #[test]
    fn errors_map_to_gateway_statuses() {
        assert_eq!(ForwardError::Timeout(Duration::from_secs(1)).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ForwardError::Timeout(Duration::from_secs(1)).kind(), "timeout");
    }

    #[tokio::test]
    async fn refused_connection_is_upstream_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint::parse(&format!("rest://{}", addr)).unwrap();
        let err = forwarder(5)
            .forward(ctx("/"), Request::new(Body::empty()), &endpoint)
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.kind(), "connect");
    }

    #[tokio::test]
    async fn relays_status_headers_and_body() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let app = axum::Router::new().fallback(|req: Request<Body>| async move {
                let path = req.uri().to_string();
                let host = req.headers().get("host").cloned();
                let mut res = Response::new(Body::from(path));
                *res.status_mut() = StatusCode::CREATED;
                if let Some(host) = host {
                    res.headers_mut().insert("x-seen-host", host);
                }
                res.headers_mut().insert("connection", "close".parse().unwrap());
                res
            });
            let _ = axum::serve(listener, app).await;
        });

        let endpoint = Endpoint::parse(&format!("rest://{}", addr)).unwrap();
        let response = forwarder(5)
            .forward(ctx("/items?x=1"), Request::new(Body::empty()), &endpoint)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-seen-host").unwrap(), addr.to_string().as_str());
        assert!(response.headers().get("connection").is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"/items?x=1");
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let app = axum::Router::new().fallback(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            });
            let _ = axum::serve(listener, app).await;
        });

        let endpoint = Endpoint::parse(&format!("rest://{}", addr)).unwrap();
        let err = forwarder(1)
            .forward(ctx("/"), Request::new(Body::empty()), &endpoint)
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
