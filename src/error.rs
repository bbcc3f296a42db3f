use std::fmt::Debug;
use std::fmt::Display;

use axum::response::Html;
use axum::{http::StatusCode, response::IntoResponse};

use crate::components;
use crate::stores::MutationError;

/// Failure while serving a page: a listing that could not load, a template that
/// did not render.
pub struct AppError {
    pub inner: anyhow::Error,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(error = ?self.inner, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("Something went wrong: {}", self.inner)),
        )
            .into_response()
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

// Lets handlers use `?` on anything anyhow accepts.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self { inner: err.into() }
    }
}

impl MutationError {
    pub fn status(&self) -> StatusCode {
        match self {
            MutationError::Unauthenticated => StatusCode::UNAUTHORIZED,
            MutationError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            MutationError::NotFound(_) => StatusCode::NOT_FOUND,
            MutationError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            MutationError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MutationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MutationError {
    fn into_response(self) -> axum::response::Response {
        tracing::warn!(code = self.code(), error = %self, "mutation rejected");
        (self.status(), components::flash::error(&self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: MutationError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn mutation_errors_map_to_statuses() {
        assert_eq!(status_of(MutationError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(MutationError::PermissionDenied("no".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(MutationError::NotFound("posts/x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(MutationError::InvalidArgument("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(MutationError::Unavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn app_error_is_a_500() {
        let err = AppError::from(anyhow::anyhow!("feed failed"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
