use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{like_summary, user::User};

// Stored under `posts/{id}`. The image lives in the object store, keyed by the post id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PostEntity {
    #[serde(default)]
    pub subject: String,
    pub uid: String,
    pub title: String,
    pub body: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

// the input to `create_post`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub image: Option<NewImage>,
    pub location: Option<String>,
    pub subject: String,
}

// what the feed renders
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub subject: String,
    pub title: String,
    pub body: String,
    pub author: User,
    pub image_url: Option<String>,
    pub date: DateTime<Utc>,
    pub like_amount: usize,
    pub did_user_like: bool,
    pub location: Option<String>,
}

impl Post {
    pub fn assemble(
        id: String,
        entity: PostEntity,
        author: User,
        image_url: Option<String>,
        viewer: Option<&str>,
    ) -> Self {
        let (like_amount, did_user_like) = like_summary(&entity.likes, viewer);
        Self {
            id,
            subject: entity.subject,
            title: entity.title,
            body: entity.body,
            author,
            image_url,
            date: entity.timestamp,
            like_amount,
            did_user_like,
            location: entity.location,
        }
    }
}
