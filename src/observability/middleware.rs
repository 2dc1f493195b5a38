use async_trait::async_trait;
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::{sync::Arc, time::Duration, time::Instant};
use tracing::{debug, error, info, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{get_current_trace_id, Metrics};
use crate::models::StoreResult;
use crate::repositories::SessionStore;

/// Middleware for automatic request tracing and metrics collection
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    // Client IP from X-Forwarded-For (first hop) or X-Real-IP
    let client_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
        })
        .unwrap_or("unknown")
        .trim()
        .to_string();

    // Matched route keeps metric label cardinality bounded
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let span_name = format!("{} {}", method, endpoint);

    let span = tracing::info_span!(
        target: "sessioncart_rs::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %endpoint,
        http.url = %uri,
        http.user_agent = %user_agent,
        http.client_ip = %client_ip,
        http.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async {
        metrics.increment_in_flight(&method, &endpoint);

        let trace_id = get_current_trace_id().unwrap_or_default();

        info!(trace_id = %trace_id, method = %method, path = %endpoint, user_agent = %user_agent, client_ip = %client_ip, "Processing request");

        let response = next.run(request).await;

        let duration = start_time.elapsed();
        let duration_ms = duration.as_millis();
        let status_code = response.status().as_u16();

        tracing::Span::current().record("http.status_code", status_code);
        tracing::Span::current().record("http.response_time_ms", duration_ms);

        let current_span = tracing::Span::current();
        let span_context = current_span.context();
        let otel_span = span_context.span();
        if status_code >= 500 {
            otel_span.set_status(opentelemetry::trace::Status::error("HTTP error"));
        } else {
            otel_span.set_status(opentelemetry::trace::Status::Ok);
        }

        metrics.record_http_request(&method, &endpoint, status_code, duration.as_secs_f64());
        metrics.decrement_in_flight(&method, &endpoint);

        if status_code >= 400 {
            error!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request completed with error"
            );
        } else {
            info!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request completed successfully"
            );
        }

        response
    }
    .instrument(span)
    .await
}

/// Session store operation tracing with automatic metrics recording
pub struct StoreTracingMiddleware {
    metrics: Arc<Metrics>,
    backend: &'static str,
}

impl StoreTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>, backend: &'static str) -> Self {
        Self { metrics, backend }
    }

    pub async fn trace_operation<F, T, E>(&self, operation: &str, future: F) -> Result<T, E>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();

        let result = future.await;
        let elapsed = start_time.elapsed();
        self.metrics.record_store_operation(
            operation,
            self.backend,
            result.is_ok(),
            elapsed.as_secs_f64(),
        );

        match &result {
            Ok(_) => debug!(
                operation = %operation,
                backend = self.backend,
                duration_ms = elapsed.as_millis(),
                "Session store operation completed"
            ),
            Err(e) => error!(
                operation = %operation,
                backend = self.backend,
                error = %e,
                duration_ms = elapsed.as_millis(),
                "Session store operation failed"
            ),
        }

        result
    }
}

/// SessionStore decorator that records metrics for every call
pub struct MeteredSessionStore {
    inner: Arc<dyn SessionStore>,
    tracer: StoreTracingMiddleware,
}

impl MeteredSessionStore {
    pub fn new(inner: Arc<dyn SessionStore>, metrics: Arc<Metrics>, backend: &'static str) -> Self {
        Self {
            inner,
            tracer: StoreTracingMiddleware::new(metrics, backend),
        }
    }
}

#[async_trait]
impl SessionStore for MeteredSessionStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.tracer.trace_operation("get", self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        self.tracer
            .trace_operation("set", self.inner.set(key, value, ttl))
            .await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.tracer
            .trace_operation("remove", self.inner.remove(key))
            .await
    }

    async fn len(&self) -> StoreResult<usize> {
        self.tracer.trace_operation("len", self.inner.len()).await
    }
}
