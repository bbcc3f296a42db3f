use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{self, CorsLayer};
use tracing::warn;

pub trait CorsExt<S> {
    fn with_cors(self, origins: &[String]) -> Router<S>;
}

impl<S> CorsExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Allows the configured origins. Without any, no CORS headers are sent.
    fn with_cors(self, origins: &[String]) -> Router<S> {
        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| {
                HeaderValue::from_str(origin)
                    .inspect_err(|_| warn!(origin, "ignoring unparsable CORS origin"))
                    .ok()
            })
            .collect();
        if allowed.is_empty() {
            return self;
        }

        let cors_layer = CorsLayer::new()
            .allow_origin(cors::AllowOrigin::list(allowed))
            .allow_methods(cors::Any)
            .allow_headers(cors::Any);

        self.layer(cors_layer)
    }
}
