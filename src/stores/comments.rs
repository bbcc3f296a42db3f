use chrono::Utc;
use tracing::info;

use super::reader::Denormalizer;
use super::{
    query, read_like_summary, require_admin, require_viewer, set_like, LikeSummary,
    MutationError, MutationResult,
};
use crate::backend::{Backend, BackendError, DocumentRef};
use crate::config::FeedCfg;
use crate::models::comment::{Comment, CommentEntity, NewComment};
use crate::models::to_fields;
use crate::models::user::User;
use crate::schema::{comments, posts};

#[derive(Clone)]
pub struct CommentStore {
    backend: Backend,
    reader: Denormalizer,
    feed: FeedCfg,
}

fn comment_ref(id: &str) -> DocumentRef {
    DocumentRef::new(comments::COLLECTION, id)
}

impl CommentStore {
    pub fn new(backend: Backend, reader: Denormalizer, feed: FeedCfg) -> Self {
        Self {
            backend,
            reader,
            feed,
        }
    }

    /// Newest comments on a post.
    #[tracing::instrument(skip(self, viewer))]
    pub async fn get_comments(
        &self,
        viewer: Option<&User>,
        post_id: &str,
    ) -> Result<Vec<Comment>, BackendError> {
        let plan = query::post_comments(post_id, self.feed.page_size);
        let matched = self.backend.documents.query(&plan).await?;
        self.reader
            .comments(matched, viewer.map(|v| v.uid.as_str()), self.feed.listing_policy)
            .await
    }

    #[tracing::instrument(skip(self, viewer))]
    pub async fn get_user_comments(
        &self,
        viewer: Option<&User>,
        uid: &str,
    ) -> Result<Vec<Comment>, BackendError> {
        let plan = query::user_comments(uid, self.feed.page_size);
        let matched = self.backend.documents.query(&plan).await?;
        self.reader
            .comments(matched, viewer.map(|v| v.uid.as_str()), self.feed.listing_policy)
            .await
    }

    #[tracing::instrument(skip(self, viewer, comment), fields(post_id = %comment.post_id))]
    pub async fn create_comment(
        &self,
        viewer: Option<&User>,
        comment: NewComment,
    ) -> MutationResult<String> {
        let author = require_viewer(viewer)?;
        if comment.body.trim().is_empty() {
            return Err(MutationError::InvalidArgument("comment is empty".into()));
        }
        let parent = DocumentRef::new(posts::COLLECTION, &comment.post_id);
        if self.backend.documents.get(&parent).await?.is_none() {
            return Err(MutationError::NotFound(parent.to_string()));
        }

        let entity = CommentEntity {
            uid: author.uid.clone(),
            postid: comment.post_id,
            body: comment.body,
            timestamp: Utc::now(),
            likes: Vec::new(),
        };
        let created = self
            .backend
            .documents
            .add(comments::COLLECTION, to_fields(&entity)?)
            .await?;
        info!(id = %created.id, "comment created");
        Ok(created.id)
    }

    /// Deletes the comment and returns the post it belonged to.
    #[tracing::instrument(skip(self, viewer))]
    pub async fn delete_comment(&self, viewer: Option<&User>, id: &str) -> MutationResult<String> {
        let viewer = require_viewer(viewer)?;
        let doc = comment_ref(id);
        let stored: CommentEntity = self
            .backend
            .documents
            .get(&doc)
            .await?
            .ok_or_else(|| MutationError::NotFound(doc.to_string()))?
            .decode()?;

        if stored.uid != viewer.uid {
            require_admin(&self.backend, Some(viewer)).await?;
        }
        self.backend.documents.delete(&doc).await?;
        info!(id, "comment deleted");
        Ok(stored.postid)
    }

    pub async fn like_comment(&self, viewer: Option<&User>, id: &str) -> MutationResult {
        set_like(&self.backend, &comment_ref(id), comments::LIKES, viewer, true).await
    }

    pub async fn dislike_comment(&self, viewer: Option<&User>, id: &str) -> MutationResult {
        set_like(&self.backend, &comment_ref(id), comments::LIKES, viewer, false).await
    }

    pub async fn like_summary(
        &self,
        viewer: Option<&User>,
        id: &str,
    ) -> Result<LikeSummary, BackendError> {
        read_like_summary(&self.backend, &comment_ref(id), comments::LIKES, viewer).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{backend, seed_post, seed_user};
    use super::*;
    use crate::config::AppCfg;
    use crate::stores::Stores;

    fn store(backend: &Backend) -> CommentStore {
        Stores::new(backend.clone(), &AppCfg::default()).comments
    }

    fn new_comment(post_id: &str, body: &str) -> NewComment {
        NewComment {
            post_id: post_id.into(),
            body: body.into(),
        }
    }

    #[tokio::test]
    async fn comments_list_under_their_post_with_authors() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        let bob = seed_user(&backend, "bob", false).await;
        let post = seed_post(&backend, "ada", "topic", 1).await;
        let other = seed_post(&backend, "ada", "elsewhere", 2).await;
        let store = store(&backend);

        store
            .create_comment(Some(&bob), new_comment(&post, "first!"))
            .await
            .unwrap();
        store
            .create_comment(Some(&ada), new_comment(&other, "unrelated"))
            .await
            .unwrap();

        let listed = store.get_comments(Some(&ada), &post).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].body, "first!");
        assert_eq!(listed[0].author, bob);
        assert_eq!(listed[0].post_id, post);
        assert!(!listed[0].did_user_like);

        let by_ada = store.get_user_comments(None, "ada").await.unwrap();
        assert_eq!(by_ada.len(), 1);
        assert_eq!(by_ada[0].body, "unrelated");
    }

    #[tokio::test]
    async fn create_checks_session_body_and_parent() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        let post = seed_post(&backend, "ada", "topic", 1).await;
        let store = store(&backend);

        assert_eq!(
            store.create_comment(None, new_comment(&post, "hi")).await,
            Err(MutationError::Unauthenticated)
        );
        assert!(matches!(
            store.create_comment(Some(&ada), new_comment(&post, " ")).await,
            Err(MutationError::InvalidArgument(_))
        ));
        assert_eq!(
            store
                .create_comment(Some(&ada), new_comment("nope", "hi"))
                .await,
            Err(MutationError::NotFound("posts/nope".into()))
        );
    }

    #[tokio::test]
    async fn comment_likes_are_a_set() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        let post = seed_post(&backend, "ada", "topic", 1).await;
        let store = store(&backend);
        let id = store
            .create_comment(Some(&ada), new_comment(&post, "hi"))
            .await
            .unwrap();

        store.like_comment(Some(&ada), &id).await.unwrap();
        store.like_comment(Some(&ada), &id).await.unwrap();
        let summary = store.like_summary(Some(&ada), &id).await.unwrap();
        assert_eq!(summary.like_amount, 1);
        assert!(summary.did_user_like);

        store.dislike_comment(Some(&ada), &id).await.unwrap();
        let listed = store.get_comments(Some(&ada), &post).await.unwrap();
        assert_eq!(listed[0].like_amount, 0);
        assert!(!listed[0].did_user_like);
    }

    #[tokio::test]
    async fn delete_returns_parent_and_respects_ownership() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        let bob = seed_user(&backend, "bob", false).await;
        let post = seed_post(&backend, "ada", "topic", 1).await;
        let store = store(&backend);
        let id = store
            .create_comment(Some(&ada), new_comment(&post, "hi"))
            .await
            .unwrap();

        assert!(matches!(
            store.delete_comment(Some(&bob), &id).await,
            Err(MutationError::PermissionDenied(_))
        ));
        assert_eq!(store.delete_comment(Some(&ada), &id).await, Ok(post.clone()));
        assert!(store.get_comments(None, &post).await.unwrap().is_empty());
    }
}
