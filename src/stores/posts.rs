use chrono::Utc;
use tracing::{info, warn};

use super::reader::Denormalizer;
use super::{
    query, read_like_summary, require_admin, require_viewer, set_like, LikeSummary,
    MutationError, MutationResult,
};
use crate::backend::{Backend, BackendError, DocumentRef};
use crate::config::{FeedCfg, StorageCfg};
use crate::models::post::{NewPost, Post, PostEntity};
use crate::models::to_fields;
use crate::models::user::User;
use crate::schema::posts;

#[derive(Clone)]
pub struct PostStore {
    backend: Backend,
    reader: Denormalizer,
    feed: FeedCfg,
    storage: StorageCfg,
}

fn viewer_uid(viewer: Option<&User>) -> Option<&str> {
    viewer.map(|v| v.uid.as_str())
}

fn post_ref(id: &str) -> DocumentRef {
    DocumentRef::new(posts::COLLECTION, id)
}

impl PostStore {
    pub fn new(backend: Backend, reader: Denormalizer, feed: FeedCfg, storage: StorageCfg) -> Self {
        Self {
            backend,
            reader,
            feed,
            storage,
        }
    }

    /// The home feed, or title search results when `search` is non-empty.
    #[tracing::instrument(skip(self, viewer))]
    pub async fn get_posts(
        &self,
        viewer: Option<&User>,
        search: Option<&str>,
    ) -> Result<Vec<Post>, BackendError> {
        let plan = query::posts_feed(search, self.feed.page_size, self.feed.search_ordering);
        let matched = self.backend.documents.query(&plan).await?;
        self.reader
            .posts(matched, viewer_uid(viewer), self.feed.listing_policy)
            .await
    }

    #[tracing::instrument(skip(self, viewer))]
    pub async fn get_user_posts(
        &self,
        viewer: Option<&User>,
        uid: &str,
    ) -> Result<Vec<Post>, BackendError> {
        let plan = query::user_posts(uid, self.feed.page_size);
        let matched = self.backend.documents.query(&plan).await?;
        self.reader
            .posts(matched, viewer_uid(viewer), self.feed.listing_policy)
            .await
    }

    /// A single post, or `None` when it does not exist. A missing author is still an error.
    pub async fn get_post(
        &self,
        viewer: Option<&User>,
        id: &str,
    ) -> Result<Option<Post>, BackendError> {
        match self.reader.post(id, viewer_uid(viewer)).await {
            Ok(post) => Ok(Some(post)),
            Err(BackendError::NotFound(what)) if what == post_ref(id).to_string() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes the post, then uploads its image under the new id.
    ///
    /// A failed upload leaves the post in place without an image and reports the failure.
    #[tracing::instrument(skip(self, viewer, post), fields(title = %post.title))]
    pub async fn create_post(&self, viewer: Option<&User>, post: NewPost) -> MutationResult<String> {
        let author = require_viewer(viewer)?;
        if post.title.trim().is_empty() {
            return Err(MutationError::InvalidArgument("title is required".into()));
        }
        if post.subject.trim().is_empty() {
            return Err(MutationError::InvalidArgument("subject is required".into()));
        }

        let entity = PostEntity {
            subject: post.subject,
            uid: author.uid.clone(),
            title: post.title,
            body: post.body,
            timestamp: Utc::now(),
            likes: Vec::new(),
            location: post.location.filter(|l| !l.trim().is_empty()),
        };
        let created = self
            .backend
            .documents
            .add(posts::COLLECTION, to_fields(&entity)?)
            .await?;
        info!(id = %created.id, "post created");

        if let Some(image) = post.image {
            let key = self.storage.image_key(&created.id);
            self.backend
                .objects
                .upload(&key, image.bytes, &image.content_type)
                .await
                .inspect_err(|e| warn!(id = %created.id, error = %e, "post saved without its image"))?;
        }

        Ok(created.id)
    }

    /// Owners delete their own posts; administrators delete any.
    #[tracing::instrument(skip(self, viewer))]
    pub async fn delete_post(&self, viewer: Option<&User>, id: &str) -> MutationResult {
        let viewer = require_viewer(viewer)?;
        let doc = post_ref(id);
        let stored: PostEntity = self
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
        info!(id, "post deleted");
        Ok(())
    }

    pub async fn like_post(&self, viewer: Option<&User>, id: &str) -> MutationResult {
        set_like(&self.backend, &post_ref(id), posts::LIKES, viewer, true).await
    }

    pub async fn dislike_post(&self, viewer: Option<&User>, id: &str) -> MutationResult {
        set_like(&self.backend, &post_ref(id), posts::LIKES, viewer, false).await
    }

    pub async fn like_summary(
        &self,
        viewer: Option<&User>,
        id: &str,
    ) -> Result<LikeSummary, BackendError> {
        read_like_summary(&self.backend, &post_ref(id), posts::LIKES, viewer).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{backend, seed_post, seed_user};
    use super::*;
    use crate::config::AppCfg;
    use crate::models::post::NewImage;
    use crate::stores::query::SearchOrdering;
    use crate::stores::reader::ListingPolicy;
    use crate::stores::Stores;

    fn store_with(backend: &Backend, feed: FeedCfg) -> PostStore {
        let cfg = AppCfg {
            feed,
            ..Default::default()
        };
        Stores::new(backend.clone(), &cfg).posts
    }

    fn store(backend: &Backend) -> PostStore {
        store_with(backend, FeedCfg::default())
    }

    fn titles(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.title.as_str()).collect()
    }

    #[tokio::test]
    async fn liking_twice_counts_once() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        let id = seed_post(&backend, "ada", "Hello", 1).await;
        let store = store(&backend);

        store.like_post(Some(&ada), &id).await.unwrap();
        store.like_post(Some(&ada), &id).await.unwrap();

        let post = store.get_post(Some(&ada), &id).await.unwrap().unwrap();
        assert_eq!(post.like_amount, 1);
        assert!(post.did_user_like);
    }

    #[tokio::test]
    async fn last_like_operation_wins() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        let id = seed_post(&backend, "ada", "Hello", 1).await;
        let store = store(&backend);

        store.like_post(Some(&ada), &id).await.unwrap();
        store.dislike_post(Some(&ada), &id).await.unwrap();
        let summary = store.like_summary(Some(&ada), &id).await.unwrap();
        assert_eq!(summary.like_amount, 0);
        assert!(!summary.did_user_like);

        store.dislike_post(Some(&ada), &id).await.unwrap();
        store.like_post(Some(&ada), &id).await.unwrap();
        let summary = store.like_summary(Some(&ada), &id).await.unwrap();
        assert_eq!(summary.like_amount, 1);
        assert!(summary.did_user_like);
    }

    #[tokio::test]
    async fn signed_out_viewer_sees_counts_but_no_like() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        let bob = seed_user(&backend, "bob", false).await;
        let id = seed_post(&backend, "ada", "Hello", 1).await;
        let store = store(&backend);
        store.like_post(Some(&ada), &id).await.unwrap();
        store.like_post(Some(&bob), &id).await.unwrap();

        let feed = store.get_posts(None, None).await.unwrap();
        assert_eq!(feed[0].like_amount, 2);
        assert!(!feed[0].did_user_like);
    }

    #[tokio::test]
    async fn liking_requires_a_session_and_an_existing_post() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        let store = store(&backend);

        assert_eq!(
            store.like_post(None, "whatever").await,
            Err(MutationError::Unauthenticated)
        );
        assert!(matches!(
            store.like_post(Some(&ada), "missing").await,
            Err(MutationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn feed_is_newest_first_and_capped() {
        let backend = backend();
        seed_user(&backend, "ada", false).await;
        for i in 0..12 {
            seed_post(&backend, "ada", &format!("post {i:02}"), i).await;
        }
        let store = store(&backend);

        let feed = store.get_posts(None, None).await.unwrap();
        assert_eq!(feed.len(), 10);
        assert_eq!(feed[0].title, "post 11");
        assert_eq!(feed[9].title, "post 02");
    }

    #[tokio::test]
    async fn fewer_matches_than_page_size_returns_them_all_in_order() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        seed_user(&backend, "bob", false).await;
        seed_post(&backend, "ada", "first", 1).await;
        seed_post(&backend, "bob", "other", 2).await;
        seed_post(&backend, "ada", "second", 3).await;
        let store = store(&backend);

        let mine = store.get_user_posts(Some(&ada), "ada").await.unwrap();
        assert_eq!(titles(&mine), vec!["second", "first"]);
        assert!(mine.iter().all(|p| p.author == ada));
    }

    #[tokio::test]
    async fn search_by_recency() {
        let backend = backend();
        seed_user(&backend, "ada", false).await;
        seed_post(&backend, "ada", "Cherry", 1).await;
        seed_post(&backend, "ada", "Apple", 2).await;
        seed_post(&backend, "ada", "Banana", 3).await;
        let store = store(&backend);

        let found = store.get_posts(None, Some("Banana")).await.unwrap();
        assert_eq!(titles(&found), vec!["Banana", "Cherry"]);
    }

    #[tokio::test]
    async fn search_by_title_descending() {
        let backend = backend();
        seed_user(&backend, "ada", false).await;
        seed_post(&backend, "ada", "Apple", 1).await;
        seed_post(&backend, "ada", "Banana", 2).await;
        seed_post(&backend, "ada", "Cherry", 3).await;
        let store = store_with(
            &backend,
            FeedCfg {
                search_ordering: SearchOrdering::TitleDescending,
                ..Default::default()
            },
        );

        let found = store.get_posts(None, Some("Banana")).await.unwrap();
        assert_eq!(titles(&found), vec!["Cherry", "Banana"]);
    }

    #[tokio::test]
    async fn search_is_case_sensitive() {
        let backend = backend();
        seed_user(&backend, "ada", false).await;
        seed_post(&backend, "ada", "apple", 1).await;
        seed_post(&backend, "ada", "Zebra", 2).await;
        let store = store(&backend);

        // Lowercase sorts after uppercase.
        let found = store.get_posts(None, Some("a")).await.unwrap();
        assert_eq!(titles(&found), vec!["apple"]);
    }

    #[tokio::test]
    async fn missing_author_fails_the_listing() {
        let backend = backend();
        seed_user(&backend, "ada", false).await;
        seed_post(&backend, "ada", "fine", 1).await;
        seed_post(&backend, "ghost", "orphan", 2).await;

        let err = store(&backend).get_posts(None, None).await.unwrap_err();
        assert_eq!(err, BackendError::NotFound("users/ghost".into()));
    }

    #[tokio::test]
    async fn best_effort_drops_the_broken_item() {
        let backend = backend();
        seed_user(&backend, "ada", false).await;
        seed_post(&backend, "ada", "fine", 1).await;
        seed_post(&backend, "ghost", "orphan", 2).await;
        let store = store_with(
            &backend,
            FeedCfg {
                listing_policy: ListingPolicy::BestEffort,
                ..Default::default()
            },
        );

        let feed = store.get_posts(None, None).await.unwrap();
        assert_eq!(titles(&feed), vec!["fine"]);
    }

    #[tokio::test]
    async fn missing_post_is_none_but_missing_author_is_an_error() {
        let backend = backend();
        let store = store(&backend);
        assert_eq!(store.get_post(None, "nope").await, Ok(None));

        let orphan = seed_post(&backend, "ghost", "orphan", 1).await;
        assert_eq!(
            store.get_post(None, &orphan).await,
            Err(BackendError::NotFound("users/ghost".into()))
        );
    }

    #[tokio::test]
    async fn failed_upload_keeps_the_post_without_image() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        // A leading slash makes every image key unacceptable to the object store.
        let cfg = AppCfg {
            storage: StorageCfg {
                image_prefix: "/broken".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let store = Stores::new(backend.clone(), &cfg).posts;

        let result = store
            .create_post(
                Some(&ada),
                NewPost {
                    title: "with picture".into(),
                    subject: "general".into(),
                    image: Some(NewImage {
                        bytes: vec![1, 2, 3],
                        content_type: "image/jpeg".into(),
                    }),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(MutationError::Unavailable(_))));

        let feed = store.get_posts(None, None).await.unwrap();
        assert_eq!(titles(&feed), vec!["with picture"]);
        assert_eq!(feed[0].image_url, None);
    }

    #[tokio::test]
    async fn create_requires_session() {
        let backend = backend();
        let result = store(&backend)
            .create_post(
                None,
                NewPost {
                    title: "t".into(),
                    subject: "s".into(),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(result, Err(MutationError::Unauthenticated));
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        let result = store(&backend)
            .create_post(
                Some(&ada),
                NewPost {
                    title: "  ".into(),
                    subject: "s".into(),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(MutationError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn image_url_only_when_an_image_was_uploaded() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        let store = store(&backend);

        let plain = store
            .create_post(
                Some(&ada),
                NewPost {
                    title: "plain".into(),
                    body: "no picture".into(),
                    subject: "misc".into(),
                    location: Some("".into()),
                    image: None,
                },
            )
            .await
            .unwrap();
        let pictured = store
            .create_post(
                Some(&ada),
                NewPost {
                    title: "pictured".into(),
                    body: "with picture".into(),
                    subject: "misc".into(),
                    location: Some("Oslo".into()),
                    image: Some(NewImage {
                        bytes: vec![0xff, 0xd8],
                        content_type: "image/jpeg".into(),
                    }),
                },
            )
            .await
            .unwrap();

        let plain = store.get_post(Some(&ada), &plain).await.unwrap().unwrap();
        assert_eq!(plain.image_url, None);
        assert_eq!(plain.location, None);

        let pictured = store.get_post(Some(&ada), &pictured).await.unwrap().unwrap();
        assert_eq!(
            pictured.image_url,
            Some(format!("/media/postImages/{}.jpeg", pictured.id))
        );
        assert_eq!(pictured.location.as_deref(), Some("Oslo"));
        assert_eq!(pictured.author, ada);
    }

    #[tokio::test]
    async fn only_owner_or_admin_deletes() {
        let backend = backend();
        let ada = seed_user(&backend, "ada", false).await;
        let bob = seed_user(&backend, "bob", false).await;
        let root = seed_user(&backend, "root", true).await;
        let first = seed_post(&backend, "ada", "first", 1).await;
        let second = seed_post(&backend, "ada", "second", 2).await;
        let store = store(&backend);

        assert!(matches!(
            store.delete_post(Some(&bob), &first).await,
            Err(MutationError::PermissionDenied(_))
        ));
        store.delete_post(Some(&ada), &first).await.unwrap();
        store.delete_post(Some(&root), &second).await.unwrap();

        assert!(store.get_posts(None, None).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_post(Some(&ada), &first).await,
            Err(MutationError::NotFound(_))
        ));
    }
}
