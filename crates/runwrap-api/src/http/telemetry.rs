//! Per-route request counting.
//!
//! The layer wraps every route and the fallback. Requests that match no route
//! share the [`UNMATCHED_ROUTE`] label so arbitrary client paths cannot grow
//! the series count.
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use crate::http::constants::HEADER_REQUEST_ID;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::response::Response;
use runwrap_telemetry::{Metrics, with_request_context};
use tower::{Layer, Service};

/// Route label for requests that fell through to the fallback handler.
pub(crate) const UNMATCHED_ROUTE: &str = "unmatched";

#[derive(Clone)]
pub(crate) struct RouteMetricsLayer {
    metrics: Metrics,
}

impl RouteMetricsLayer {
    pub(crate) const fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for RouteMetricsLayer {
    type Service = RouteMetrics<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RouteMetrics {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct RouteMetrics<S> {
    inner: S,
    metrics: Metrics,
}

fn route_label<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ROUTE.to_string(), |matched| matched.as_str().to_string())
}

impl<S, B> Service<Request<B>> for RouteMetrics<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let route = route_label(&request);
        let request_id = request
            .headers()
            .get(HEADER_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let metrics = self.metrics.clone();
        let served = self.inner.call(request);

        Box::pin(with_request_context(request_id, route.clone(), async move {
            let response = served.await?;
            metrics.inc_http_request(&route, response.status().as_u16());
            Ok::<_, S::Error>(response)
        }))
    }
}
