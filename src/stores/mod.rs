//! Data-access layer: one store per kind of document, all over the same [`Backend`].

pub mod comments;
pub mod posts;
pub mod query;
pub mod reader;
pub mod subjects;
pub mod users;

use serde_json::Value;

use crate::backend::{AuthError, Backend, BackendError, DocumentRef, FieldUpdate, StorageError};
use crate::config::AppCfg;
use crate::models::{like_summary, user::User};
use crate::schema;

use self::comments::CommentStore;
use self::posts::PostStore;
use self::reader::Denormalizer;
use self::subjects::SubjectStore;
use self::users::UserStore;

/// Why a mutation did not happen.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("sign in required")]
    Unauthenticated,

    #[error("not allowed: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidArgument(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MutationError {
    /// Stable reason code for logs and responses.
    pub fn code(&self) -> &'static str {
        match self {
            MutationError::Unauthenticated => "unauthenticated",
            MutationError::PermissionDenied(_) => "permission_denied",
            MutationError::NotFound(_) => "not_found",
            MutationError::InvalidArgument(_) => "invalid_argument",
            MutationError::Unavailable(_) => "unavailable",
            MutationError::Internal(_) => "internal",
        }
    }
}

impl From<BackendError> for MutationError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(what) => MutationError::NotFound(what),
            BackendError::PermissionDenied(why) => MutationError::PermissionDenied(why),
            BackendError::InvalidArgument(why) => MutationError::InvalidArgument(why),
            BackendError::Unavailable(why) => MutationError::Unavailable(why),
            BackendError::Conflict(why) | BackendError::Internal(why) => {
                MutationError::Internal(why)
            }
        }
    }
}

impl From<StorageError> for MutationError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => MutationError::NotFound(key),
            StorageError::Backend(why) => MutationError::Unavailable(why),
        }
    }
}

impl From<AuthError> for MutationError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::Cancelled => {
                MutationError::PermissionDenied(err.to_string())
            }
            AuthError::EmailInUse | AuthError::WeakPassword | AuthError::UnsupportedProvider(_) => {
                MutationError::InvalidArgument(err.to_string())
            }
            AuthError::NoSession => MutationError::Unauthenticated,
            AuthError::Backend(why) => MutationError::Unavailable(why),
        }
    }
}

pub type MutationResult<T = ()> = Result<T, MutationError>;

pub(crate) fn require_viewer(viewer: Option<&User>) -> MutationResult<&User> {
    viewer.ok_or(MutationError::Unauthenticated)
}

/// Admin status is read from the stored user document, not from the session.
pub(crate) async fn require_admin<'a>(
    backend: &Backend,
    viewer: Option<&'a User>,
) -> MutationResult<&'a User> {
    let viewer = require_viewer(viewer)?;
    let stored = backend
        .documents
        .get(&DocumentRef::new(schema::users::COLLECTION, &viewer.uid))
        .await?
        .map(|doc| doc.decode::<User>())
        .transpose()?;
    match stored {
        Some(user) if user.admin => Ok(viewer),
        _ => Err(MutationError::PermissionDenied(
            "administrators only".to_string(),
        )),
    }
}

/// Adds or removes the viewer in a document's like-set without reading it first.
pub(crate) async fn set_like(
    backend: &Backend,
    doc: &DocumentRef,
    field: &str,
    viewer: Option<&User>,
    like: bool,
) -> MutationResult {
    let viewer = require_viewer(viewer)?;
    let uid = vec![Value::String(viewer.uid.clone())];
    let update = if like {
        FieldUpdate::ArrayUnion(uid)
    } else {
        FieldUpdate::ArrayRemove(uid)
    };
    backend.documents.update(doc, field, update).await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LikeSummary {
    pub like_amount: usize,
    pub did_user_like: bool,
}

pub(crate) async fn read_like_summary(
    backend: &Backend,
    doc: &DocumentRef,
    field: &str,
    viewer: Option<&User>,
) -> Result<LikeSummary, BackendError> {
    let stored = backend
        .documents
        .get(doc)
        .await?
        .ok_or_else(|| BackendError::NotFound(doc.to_string()))?;
    let likes: Vec<String> = match stored.fields.get(field) {
        Some(value) => serde_json::from_value(value.clone())?,
        None => Vec::new(),
    };
    let (like_amount, did_user_like) = like_summary(&likes, viewer.map(|v| v.uid.as_str()));
    Ok(LikeSummary {
        like_amount,
        did_user_like,
    })
}

/// Every store, built once at startup.
#[derive(Clone)]
pub struct Stores {
    pub posts: PostStore,
    pub comments: CommentStore,
    pub subjects: SubjectStore,
    pub users: UserStore,
}

impl Stores {
    pub fn new(backend: Backend, cfg: &AppCfg) -> Self {
        let reader = Denormalizer::new(backend.clone(), cfg.storage.clone());
        Self {
            posts: PostStore::new(
                backend.clone(),
                reader.clone(),
                cfg.feed.clone(),
                cfg.storage.clone(),
            ),
            comments: CommentStore::new(backend.clone(), reader, cfg.feed.clone()),
            subjects: SubjectStore::new(backend.clone()),
            users: UserStore::new(backend, cfg.identity.clone()),
        }
    }
}
