use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing::warn;

use crate::backend::StorageError;
use crate::state::AppState;

/// Serves uploaded objects, e.g. post images, with their stored content type.
async fn object(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.backend.objects.download(&key).await {
        Ok(object) => ([(header::CONTENT_TYPE, object.content_type)], object.bytes).into_response(),
        Err(StorageError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(key, error = %e, "object download failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/media/*key", get(object))
}
