//! W3C trace context propagation for incoming HTTP requests.
//!
//! Callers that send `traceparent` / `tracestate` headers get the request span
//! attached to their trace. Without an OTLP exporter installed this is a no-op.

use axum::http::{HeaderMap, Request};
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use service_core::middleware::tracing::request_id;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// A text map extractor over HTTP headers.
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Root span for one HTTP request, carrying the request id.
pub fn http_span<B>(request: &Request<B>) -> Span {
    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id(request.headers()),
        method = %request.method(),
        uri = %request.uri(),
        version = ?request.version(),
    );

    let parent = TraceContextPropagator::new().extract(&HeaderExtractor(request.headers()));
    span.set_parent(parent);
    span
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use opentelemetry::trace::TraceContextExt;

    const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    #[test]
    fn extractor_reads_trace_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("traceparent", HeaderValue::from_static(TRACEPARENT));

        let extractor = HeaderExtractor(&headers);
        assert_eq!(extractor.get("traceparent"), Some(TRACEPARENT));
        assert_eq!(extractor.get("tracestate"), None);
        assert_eq!(extractor.keys(), vec!["traceparent"]);
    }

    #[test]
    fn remote_parent_is_recovered() {
        let mut headers = HeaderMap::new();
        headers.insert("traceparent", HeaderValue::from_static(TRACEPARENT));

        let context = TraceContextPropagator::new().extract(&HeaderExtractor(&headers));
        let span_context = context.span().span_context().clone();
        assert!(span_context.is_valid());
        assert!(span_context.is_remote());
        assert_eq!(
            span_context.trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
    }
}
