use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tracing::{debug, info};

use super::{not_found, page_context, render_page};
use crate::components::like_button::{self, LikeTarget};
use crate::error::AppError;
use crate::extractors::{back_to, is_htmx, ClientSession};
use crate::models::post::{NewImage, NewPost};
use crate::state::AppState;
use crate::stores::MutationError;

#[derive(Deserialize, Debug, Default)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[tracing::instrument(skip_all)]
async fn home(State(state): State<AppState>, session: ClientSession) -> Result<Response, AppError> {
    let posts = state.stores.posts.get_posts(session.viewer(), None).await?;

    let mut ctx = page_context(&session);
    ctx.insert("posts", &posts);
    ctx.insert("search", "");
    Ok(render_page(&state, "pages/feed.html", &ctx).await?.into_response())
}

#[tracing::instrument(skip_all)]
async fn search(
    State(state): State<AppState>,
    session: ClientSession,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    // Untrimmed: the title range is matched exactly as typed.
    let text = params.q.as_deref().unwrap_or_default();
    debug!(text, "searching posts");
    let posts = state
        .stores
        .posts
        .get_posts(session.viewer(), Some(text))
        .await?;

    let mut ctx = page_context(&session);
    ctx.insert("posts", &posts);
    ctx.insert("search", text);
    Ok(render_page(&state, "pages/feed.html", &ctx).await?.into_response())
}

async fn new_post_form(
    State(state): State<AppState>,
    session: ClientSession,
) -> Result<Response, AppError> {
    if session.viewer().is_none() {
        return Ok(Redirect::to("/signin").into_response());
    }
    let subjects = state.stores.subjects.list_subjects().await?;

    let mut ctx = page_context(&session);
    ctx.insert("subjects", &subjects);
    Ok(render_page(&state, "pages/new_post.html", &ctx).await?.into_response())
}

/// Reads the new-post form. An empty file input means no image.
async fn read_new_post(
    mut multipart: Multipart,
    default_content_type: &str,
) -> Result<NewPost, MutationError> {
    let bad_form = |e: axum::extract::multipart::MultipartError| {
        MutationError::InvalidArgument(format!("unreadable form: {e}"))
    };

    let mut post = NewPost::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let content_type = field
                    .content_type()
                    .unwrap_or(default_content_type)
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_form)?;
                if !bytes.is_empty() {
                    post.image = Some(NewImage {
                        bytes: bytes.to_vec(),
                        content_type,
                    });
                }
            }
            "title" => post.title = field.text().await.map_err(bad_form)?,
            "body" => post.body = field.text().await.map_err(bad_form)?,
            "subject" => post.subject = field.text().await.map_err(bad_form)?,
            "location" => post.location = Some(field.text().await.map_err(bad_form)?),
            _ => {}
        }
    }
    Ok(post)
}

async fn create_post(
    State(state): State<AppState>,
    session: ClientSession,
    multipart: Multipart,
) -> Result<Response, MutationError> {
    let post = read_new_post(multipart, &state.cfg.storage.image_content_type).await?;
    let id = state
        .stores
        .posts
        .create_post(session.viewer(), post)
        .await?;
    info!(id, "new post");
    Ok(Redirect::to("/home").into_response())
}

async fn show_post(
    State(state): State<AppState>,
    session: ClientSession,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(post) = state.stores.posts.get_post(session.viewer(), &id).await? else {
        return Ok(not_found(&state, &session, "post").await);
    };
    let comments = state
        .stores
        .comments
        .get_comments(session.viewer(), &id)
        .await?;

    let mut ctx = page_context(&session);
    ctx.insert("post", &post);
    ctx.insert("comments", &comments);
    Ok(render_page(&state, "pages/post.html", &ctx).await?.into_response())
}

async fn delete_post(
    State(state): State<AppState>,
    session: ClientSession,
    Path(id): Path<String>,
) -> Result<Response, MutationError> {
    state.stores.posts.delete_post(session.viewer(), &id).await?;
    Ok(Redirect::to("/home").into_response())
}

async fn toggle_like(
    state: &AppState,
    session: &ClientSession,
    headers: &HeaderMap,
    id: &str,
    like: bool,
) -> Result<Response, MutationError> {
    let posts = &state.stores.posts;
    if like {
        posts.like_post(session.viewer(), id).await?;
    } else {
        posts.dislike_post(session.viewer(), id).await?;
    }

    if !is_htmx(headers) {
        return Ok(Redirect::to(&back_to(headers, "/home")).into_response());
    }
    let summary = posts.like_summary(session.viewer(), id).await?;
    Ok(like_button::render(LikeTarget::Post, id, summary).into_response())
}

async fn like_post(
    State(state): State<AppState>,
    session: ClientSession,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, MutationError> {
    toggle_like(&state, &session, &headers, &id, true).await
}

async fn dislike_post(
    State(state): State<AppState>,
    session: ClientSession,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, MutationError> {
    toggle_like(&state, &session, &headers, &id, false).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/home", get(home))
        .route("/search", get(search))
        .route("/newpost", get(new_post_form))
        .route("/posts", post(create_post))
        .route("/posts/:id", get(show_post))
        .route("/posts/:id/delete", post(delete_post))
        .route("/posts/:id/like", post(like_post))
        .route("/posts/:id/dislike", post(dislike_post))
}
