use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue};
use axum_extra::headers::Cookie;
use axum_extra::TypedHeader;
use uuid::Uuid;

use crate::backend::SessionId;
use crate::models::user::User;
use crate::session::SessionState;
use crate::state::AppState;

/// The browser's client session, if its cookie names one.
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub id: Option<SessionId>,
    pub state: SessionState,
}

impl ClientSession {
    pub fn viewer(&self) -> Option<&User> {
        self.state.profile.as_ref()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ClientSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Option::<TypedHeader<Cookie>>::from_request_parts(parts, state)
            .await
            .ok()
            .flatten();
        let id = cookies
            .as_ref()
            .and_then(|TypedHeader(c)| c.get(&state.cfg.session.cookie_name))
            .and_then(|raw| Uuid::parse_str(raw).ok());

        let mut session = id.map(|id| state.sessions.get(id)).unwrap_or_default();
        // The identity profile lacks the stored admin flag and avatar fallback.
        if let Some(profile) = session.profile.as_mut() {
            if let Some(stored) = state.stores.users.get_user(&profile.uid).await {
                profile.admin = stored.admin;
                profile.photo_url = stored.photo_url;
            }
        }

        Ok(ClientSession { id, state: session })
    }
}

/// `Set-Cookie` value binding the browser to `id`.
pub fn session_cookie(name: &str, id: SessionId) -> HeaderValue {
    HeaderValue::from_str(&format!("{name}={id}; Path=/; HttpOnly; SameSite=Lax"))
        .unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Whether the request came from htmx rather than a plain form submit.
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Same-site path a plain form submit should land on afterwards.
pub fn back_to(headers: &HeaderMap, fallback: &str) -> String {
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(fallback);
    let path = match referer.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => referer,
    };
    if path.starts_with('/') && !path.starts_with("//") {
        path.to_string()
    } else {
        fallback.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_referer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn back_to_keeps_only_the_path() {
        assert_eq!(
            back_to(&with_referer("http://localhost:3000/search?q=a"), "/home"),
            "/search?q=a"
        );
        assert_eq!(back_to(&with_referer("/posts/p1"), "/home"), "/posts/p1");
        assert_eq!(back_to(&with_referer("//evil.example"), "/home"), "/home");
        assert_eq!(back_to(&HeaderMap::new(), "/home"), "/home");
    }
}
