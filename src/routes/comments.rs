use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::{Form, Router};
use serde::Deserialize;

use crate::components::like_button::{self, LikeTarget};
use crate::extractors::{back_to, is_htmx, ClientSession};
use crate::models::comment::NewComment;
use crate::state::AppState;
use crate::stores::MutationError;

#[derive(Deserialize, Debug)]
pub struct CommentForm {
    pub body: String,
}

async fn create_comment(
    State(state): State<AppState>,
    session: ClientSession,
    Path(post_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Response, MutationError> {
    let comment = NewComment {
        post_id: post_id.clone(),
        body: form.body,
    };
    state
        .stores
        .comments
        .create_comment(session.viewer(), comment)
        .await?;
    Ok(Redirect::to(&format!("/posts/{post_id}")).into_response())
}

async fn delete_comment(
    State(state): State<AppState>,
    session: ClientSession,
    Path(id): Path<String>,
) -> Result<Response, MutationError> {
    let post_id = state
        .stores
        .comments
        .delete_comment(session.viewer(), &id)
        .await?;
    Ok(Redirect::to(&format!("/posts/{post_id}")).into_response())
}

async fn toggle_like(
    state: &AppState,
    session: &ClientSession,
    headers: &HeaderMap,
    id: &str,
    like: bool,
) -> Result<Response, MutationError> {
    let comments = &state.stores.comments;
    if like {
        comments.like_comment(session.viewer(), id).await?;
    } else {
        comments.dislike_comment(session.viewer(), id).await?;
    }

    if !is_htmx(headers) {
        return Ok(Redirect::to(&back_to(headers, "/home")).into_response());
    }
    let summary = comments.like_summary(session.viewer(), id).await?;
    Ok(like_button::render(LikeTarget::Comment, id, summary).into_response())
}

async fn like_comment(
    State(state): State<AppState>,
    session: ClientSession,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, MutationError> {
    toggle_like(&state, &session, &headers, &id, true).await
}

async fn dislike_comment(
    State(state): State<AppState>,
    session: ClientSession,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, MutationError> {
    toggle_like(&state, &session, &headers, &id, false).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/:id/comments", post(create_comment))
        .route("/comments/:id/like", post(like_comment))
        .route("/comments/:id/dislike", post(dislike_comment))
        .route("/comments/:id/delete", post(delete_comment))
}
