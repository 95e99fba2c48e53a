//! Response relay.
//!
//! # Responsibilities
//! - Filter backend response headers before they reach the client
//! - Relay the backend body frame by frame, never buffering it
//! - Track each in-flight exchange from first byte sent to completion or abort
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - The exchange guard rides inside the response body, so a client disconnect
//!   drops it together with the backend stream
//! - A backend failure after the head is sent can only abort the client connection

use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Instant;

use hyper::body::{Body as HttpBody, Bytes, Frame, Incoming, SizeHint};

use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Pending,
    Completed,
    Failed,
}

/// Lifetime of one inbound/outbound exchange.
///
/// Created before the outbound request is sent; dropped when the relayed
/// body finishes, fails, or is abandoned by the client.
#[derive(Debug)]
pub struct ExchangeGuard {
    service: String,
    endpoint: String,
    request_id: String,
    started: Instant,
    bytes: u64,
    outcome: Outcome,
}

impl ExchangeGuard {
    pub fn start(service: impl Into<String>, endpoint: impl Into<String>, request_id: impl Into<String>) -> Self {
        metrics::exchange_started();
        Self {
            service: service.into(),
            endpoint: endpoint.into(),
            request_id: request_id.into(),
            started: Instant::now(),
            bytes: 0,
            outcome: Outcome::Pending,
        }
    }

    /// Response bytes relayed so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for ExchangeGuard {
    fn drop(&mut self) {
        metrics::exchange_finished(&self.service, self.bytes);
        match self.outcome {
            Outcome::Completed => tracing::debug!(
                request_id = %self.request_id,
                service = %self.service,
                endpoint = %self.endpoint,
                bytes = self.bytes,
                elapsed = ?self.started.elapsed(),
                "Exchange complete"
            ),
            Outcome::Failed => {}
            Outcome::Pending => tracing::debug!(
                request_id = %self.request_id,
                service = %self.service,
                endpoint = %self.endpoint,
                bytes = self.bytes,
                elapsed = ?self.started.elapsed(),
                "Exchange ended before completion"
            ),
        }
    }
}

/// Backend response body relayed to the client.
#[derive(Debug)]
pub struct ExchangeBody {
    inner: Incoming,
    guard: ExchangeGuard,
}

impl ExchangeBody {
    pub fn new(inner: Incoming, mut guard: ExchangeGuard) -> Self {
        if inner.is_end_stream() {
            guard.outcome = Outcome::Completed;
        }
        Self { inner, guard }
    }
}

impl HttpBody for ExchangeBody {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, hyper::Error>>> {
        let this = self.get_mut();
        match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.guard.bytes += data.len() as u64;
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => {
                tracing::warn!(
                    request_id = %this.guard.request_id,
                    service = %this.guard.service,
                    endpoint = %this.guard.endpoint,
                    bytes = this.guard.bytes,
                    error = %e,
                    "Upstream body transfer failed"
                );
                metrics::record_upstream_failure(&this.guard.service, "body");
                this.guard.outcome = Outcome::Failed;
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.guard.outcome = Outcome::Completed;
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
