//! Turns matched documents into display records.
//!
//! Each item is resolved in its own read transaction: the document is read again
//! together with its author so both come from one snapshot. Items resolve
//! concurrently and the listing keeps the query's order.

use std::future::Future;
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{
    BackendError, Backend, Document, DocumentRef, ObjectStore, ReadTransaction, StorageError,
};
use crate::config::StorageCfg;
use crate::models::comment::{Comment, CommentEntity};
use crate::models::post::{Post, PostEntity};
use crate::models::user::User;
use crate::schema::{comments, posts, users};

/// What a listing does when one item fails to resolve.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListingPolicy {
    /// The first failure fails the whole listing.
    #[default]
    FailFast,
    /// Failed items are logged and left out.
    BestEffort,
}

/// Resolves every item concurrently, keeping input order.
pub async fn resolve_all<I, T, F, Fut>(
    items: I,
    policy: ListingPolicy,
    resolve: F,
) -> Result<Vec<T>, BackendError>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let pending = items.into_iter().map(resolve);
    match policy {
        ListingPolicy::FailFast => try_join_all(pending).await,
        ListingPolicy::BestEffort => Ok(join_all(pending)
            .await
            .into_iter()
            .filter_map(|resolved| {
                resolved
                    .inspect_err(|e| warn!(error = %e, "dropping item from listing"))
                    .ok()
            })
            .collect()),
    }
}

#[derive(Clone)]
pub struct Denormalizer {
    backend: Backend,
    storage: Arc<StorageCfg>,
}

impl Denormalizer {
    pub fn new(backend: Backend, storage: StorageCfg) -> Self {
        Self {
            backend,
            storage: Arc::new(storage),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn post(&self, id: &str, viewer: Option<&str>) -> Result<Post, BackendError> {
        let (entity, author) = {
            let mut tx = self.backend.documents.read_transaction().await?;
            let doc = read_existing(&mut *tx, DocumentRef::new(posts::COLLECTION, id)).await?;
            let entity: PostEntity = doc.decode()?;
            let author = read_author(&mut *tx, &entity.uid).await?;
            (entity, author)
        };

        let image_url = image_url(&*self.backend.objects, &self.storage.image_key(id)).await;
        Ok(Post::assemble(id.to_string(), entity, author, image_url, viewer))
    }

    #[tracing::instrument(skip(self))]
    pub async fn comment(&self, id: &str, viewer: Option<&str>) -> Result<Comment, BackendError> {
        let mut tx = self.backend.documents.read_transaction().await?;
        let doc = read_existing(&mut *tx, DocumentRef::new(comments::COLLECTION, id)).await?;
        let entity: CommentEntity = doc.decode()?;
        let author = read_author(&mut *tx, &entity.uid).await?;
        Ok(Comment::assemble(id.to_string(), entity, author, viewer))
    }

    pub async fn posts(
        &self,
        matched: Vec<Document>,
        viewer: Option<&str>,
        policy: ListingPolicy,
    ) -> Result<Vec<Post>, BackendError> {
        resolve_all(matched, policy, |doc| async move {
            self.post(&doc.id, viewer).await
        })
        .await
    }

    pub async fn comments(
        &self,
        matched: Vec<Document>,
        viewer: Option<&str>,
        policy: ListingPolicy,
    ) -> Result<Vec<Comment>, BackendError> {
        resolve_all(matched, policy, |doc| async move {
            self.comment(&doc.id, viewer).await
        })
        .await
    }
}

async fn read_existing(
    tx: &mut dyn ReadTransaction,
    doc: DocumentRef,
) -> Result<Document, BackendError> {
    tx.get(&doc)
        .await?
        .ok_or_else(|| BackendError::NotFound(doc.to_string()))
}

async fn read_author(tx: &mut dyn ReadTransaction, uid: &str) -> Result<User, BackendError> {
    read_existing(tx, DocumentRef::new(users::COLLECTION, uid))
        .await?
        .decode()
}

/// A missing image is normal; any other storage failure is logged and also means no image.
async fn image_url(objects: &dyn ObjectStore, key: &str) -> Option<String> {
    match objects.download_url(key).await {
        Ok(url) => Some(url),
        Err(StorageError::NotFound(_)) => {
            debug!(key, "no image");
            None
        }
        Err(e) => {
            warn!(key, error = %e, "image lookup failed");
            None
        }
    }
}
