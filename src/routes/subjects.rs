use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use super::{page_context, render_page};
use crate::components::subject_list;
use crate::error::AppError;
use crate::extractors::{is_htmx, ClientSession};
use crate::state::AppState;
use crate::stores::MutationError;

#[derive(Deserialize, Debug)]
pub struct SubjectForm {
    pub name: String,
}

/// The extractor has already copied the stored admin flag onto the viewer.
fn can_manage(session: &ClientSession) -> bool {
    session.viewer().is_some_and(|viewer| viewer.admin)
}

async fn list(State(state): State<AppState>, session: ClientSession) -> Result<Response, AppError> {
    let subjects = state.stores.subjects.list_subjects().await?;
    let manage = can_manage(&session);

    let mut ctx = page_context(&session);
    ctx.insert("can_manage", &manage);
    ctx.insert(
        "subject_list",
        &subject_list::render(&subjects, manage).into_string(),
    );
    Ok(render_page(&state, "pages/subjects.html", &ctx).await?.into_response())
}

/// The refreshed list for htmx, a redirect back to the page otherwise.
async fn after_change(
    state: &AppState,
    session: &ClientSession,
    headers: &HeaderMap,
) -> Result<Response, MutationError> {
    if !is_htmx(headers) {
        return Ok(Redirect::to("/subjects").into_response());
    }
    let subjects = state.stores.subjects.list_subjects().await?;
    let manage = can_manage(session);
    Ok(subject_list::render(&subjects, manage).into_response())
}

async fn create(
    State(state): State<AppState>,
    session: ClientSession,
    headers: HeaderMap,
    Form(form): Form<SubjectForm>,
) -> Result<Response, MutationError> {
    state
        .stores
        .subjects
        .create_subject(session.viewer(), &form.name)
        .await?;
    after_change(&state, &session, &headers).await
}

async fn delete(
    State(state): State<AppState>,
    session: ClientSession,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, MutationError> {
    state
        .stores
        .subjects
        .delete_subject(session.viewer(), &id)
        .await?;
    after_change(&state, &session, &headers).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subjects", get(list).post(create))
        .route("/subjects/:id/delete", post(delete))
}
