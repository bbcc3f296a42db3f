use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use super::{not_found, page_context, render_page};
use crate::error::AppError;
use crate::extractors::ClientSession;
use crate::state::AppState;

/// A user's profile with their latest posts and comments.
#[tracing::instrument(skip(state, session))]
async fn profile(
    State(state): State<AppState>,
    session: ClientSession,
    Path(uid): Path<String>,
) -> Result<Response, AppError> {
    let stores = &state.stores;
    let Some(user) = stores.users.get_user(&uid).await else {
        return Ok(not_found(&state, &session, "user").await);
    };
    let (posts, comments) = tokio::try_join!(
        stores.posts.get_user_posts(session.viewer(), &uid),
        stores.comments.get_user_comments(session.viewer(), &uid),
    )?;

    let mut ctx = page_context(&session);
    ctx.insert("profile", &user);
    ctx.insert(
        "is_self",
        &session.viewer().is_some_and(|v| v.uid == user.uid),
    );
    ctx.insert("posts", &posts);
    ctx.insert("comments", &comments);
    Ok(render_page(&state, "pages/profile.html", &ctx).await?.into_response())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/users/:uid", get(profile))
}
