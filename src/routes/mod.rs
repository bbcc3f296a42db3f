pub mod auth;
pub mod comments;
pub mod media;
pub mod posts;
pub mod subjects;
pub mod users;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::extractors::ClientSession;
use crate::state::AppState;

/// Context every page starts from.
pub fn page_context(session: &ClientSession) -> tera::Context {
    let mut ctx = tera::Context::new();
    ctx.insert("viewer", &session.viewer());
    ctx.insert("signed_in", &session.state.signed_in.unwrap_or(false));
    ctx
}

pub async fn render_page(
    state: &AppState,
    name: &str,
    ctx: &tera::Context,
) -> Result<Html<String>, AppError> {
    let html = crate::templates::render(&state.templates, name, ctx).await?;
    Ok(Html(html))
}

pub async fn not_found(state: &AppState, session: &ClientSession, what: &str) -> Response {
    let mut ctx = page_context(session);
    ctx.insert("what", what);
    match render_page(state, "pages/not_found.html", &ctx).await {
        Ok(page) => (StatusCode::NOT_FOUND, page).into_response(),
        Err(e) => e.into_response(),
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/home") }))
        .merge(posts::router())
        .merge(comments::router())
        .merge(users::router())
        .merge(auth::router())
        .merge(subjects::router())
        .merge(media::router())
}
