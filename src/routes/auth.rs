//! Sign-in, sign-up and sign-out.
//!
//! Mutations go to the identity provider; the session registry catches up through
//! the session listener, so each handler waits for that before redirecting.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{page_context, render_page};
use crate::backend::{AuthProvider, FederatedAssertion, SessionId};
use crate::error::AppError;
use crate::extractors::{session_cookie, ClientSession};
use crate::models::user::User;
use crate::session::SessionState;
use crate::state::AppState;
use crate::stores::{MutationError, MutationResult};

#[derive(Deserialize, Debug)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct SignUpForm {
    pub email: String,
    pub nickname: String,
    pub password: String,
}

/// What the federated provider's callback hands back.
#[derive(Deserialize, Debug, Default)]
pub struct ProviderForm {
    #[serde(default)]
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl From<ProviderForm> for FederatedAssertion {
    fn from(form: ProviderForm) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        FederatedAssertion {
            subject: form.subject.trim().to_string(),
            email: non_empty(form.email),
            display_name: non_empty(form.display_name),
            photo_url: non_empty(form.photo_url),
        }
    }
}

async fn sign_in_page(
    State(state): State<AppState>,
    session: ClientSession,
) -> Result<Response, AppError> {
    if session.viewer().is_some() {
        return Ok(Redirect::to("/home").into_response());
    }
    let ctx = page_context(&session);
    Ok(render_page(&state, "pages/signin.html", &ctx).await?.into_response())
}

/// Re-renders the sign-in page with the failure, using its status code.
async fn sign_in_failed(state: &AppState, session: &ClientSession, err: MutationError) -> Response {
    warn!(code = err.code(), error = %err, "sign-in failed");
    let mut ctx = page_context(session);
    ctx.insert("error", &err.to_string());
    ctx.insert("error_code", err.code());
    match render_page(state, "pages/signin.html", &ctx).await {
        Ok(page) => (err.status(), page).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Waits until the listener has published `user` (name included) for `id`, then binds
/// the browser to it.
async fn signed_in(state: &AppState, id: SessionId, user: &User) -> Response {
    let settled = state
        .sessions
        .settle(id, state.cfg.session.settle_timeout(), |s: &SessionState| {
            s.profile
                .as_ref()
                .is_some_and(|p| p.uid == user.uid && p.display_name == user.display_name)
        })
        .await;
    if !settled {
        warn!(session = %id, uid = %user.uid, "session did not settle before redirect");
    }

    let cookie = session_cookie(&state.cfg.session.cookie_name, id);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/home")).into_response()
}

/// Signs out the session the browser arrived with, if the registry knows it.
async fn retire(state: &AppState, old: Option<SessionId>) {
    let Some(old) = old.filter(|id| state.sessions.contains(*id)) else {
        return;
    };
    if let Err(e) = state.stores.users.sign_out(old).await {
        warn!(session = %old, error = %e, "previous session not signed out");
        return;
    }
    state
        .sessions
        .settle_signed_out(old, state.cfg.session.settle_timeout())
        .await;
}

/// A successful sign-in always gets a fresh session id; the browser's old one is retired.
async fn finish(
    state: &AppState,
    session: &ClientSession,
    id: SessionId,
    outcome: MutationResult<User>,
) -> Response {
    match outcome {
        Ok(user) => {
            retire(state, session.id).await;
            signed_in(state, id, &user).await
        }
        Err(err) => sign_in_failed(state, session, err).await,
    }
}

#[tracing::instrument(skip_all)]
async fn sign_in(
    State(state): State<AppState>,
    session: ClientSession,
    Form(form): Form<SignInForm>,
) -> Response {
    let id = Uuid::now_v7();
    let outcome = state
        .stores
        .users
        .sign_in_with_email(id, &form.email, &form.password)
        .await;
    finish(&state, &session, id, outcome).await
}

#[tracing::instrument(skip_all)]
async fn sign_up(
    State(state): State<AppState>,
    session: ClientSession,
    Form(form): Form<SignUpForm>,
) -> Response {
    let id = Uuid::now_v7();
    let outcome = state
        .stores
        .users
        .sign_up_with_email(id, &form.email, &form.nickname, &form.password)
        .await;
    finish(&state, &session, id, outcome).await
}

#[tracing::instrument(skip(state, session, form))]
async fn sign_in_with_provider(
    State(state): State<AppState>,
    session: ClientSession,
    Path(provider): Path<String>,
    Form(form): Form<ProviderForm>,
) -> Response {
    let provider = match AuthProvider::from_str(&provider) {
        Ok(provider) => provider,
        Err(e) => return sign_in_failed(&state, &session, e.into()).await,
    };
    let id = Uuid::now_v7();
    let outcome = state
        .stores
        .users
        .sign_in_with_provider(id, provider, form.into())
        .await;
    finish(&state, &session, id, outcome).await
}

async fn sign_out(
    State(state): State<AppState>,
    session: ClientSession,
) -> Result<Response, MutationError> {
    // Ids the registry does not hold were never signed in here.
    let Some(id) = session.id.filter(|id| state.sessions.contains(*id)) else {
        return Ok(Redirect::to("/home").into_response());
    };
    state.stores.users.sign_out(id).await?;
    state
        .sessions
        .settle_signed_out(id, state.cfg.session.settle_timeout())
        .await;
    info!(session = %id, "signed out");
    Ok(Redirect::to("/home").into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signin", get(sign_in_page).post(sign_in))
        .route("/signup", post(sign_up))
        .route("/signin/:provider", post(sign_in_with_provider))
        .route("/signout", post(sign_out))
}
