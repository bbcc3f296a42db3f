use axum::http::{Request, Response};
use axum::Router;
use tower_http::trace::TraceLayer;

pub trait HttpLoggingExt<S> {
    fn with_http_logging(self) -> Self;
}

impl<S> HttpLoggingExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// One `tower_http` line per request and one per response.
    fn with_http_logging(self) -> Router<S> {
        self.layer(
            TraceLayer::new_for_http()
                .on_request(|request: &Request<_>, _span: &_| {
                    let path = request
                        .uri()
                        .path_and_query()
                        .map_or_else(|| request.uri().path(), |pq| pq.as_str());
                    tracing::info!(target: "tower_http", method = %request.method(), path);
                })
                .on_response(|response: &Response<_>, latency: std::time::Duration, _span: &_| {
                    let status = response.status();
                    tracing::info!(
                        target: "tower_http",
                        status = format!("{} {}", status.as_str(), status.canonical_reason().unwrap_or("")),
                        latency_ms = latency.as_millis() as u64,
                    );
                }),
        )
    }
}
