use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{like_summary, user::User};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CommentEntity {
    pub uid: String,
    pub postid: String,
    pub body: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub likes: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: String,
    pub body: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub body: String,
    pub author: User,
    pub date: DateTime<Utc>,
    pub like_amount: usize,
    pub did_user_like: bool,
}

impl Comment {
    pub fn assemble(id: String, entity: CommentEntity, author: User, viewer: Option<&str>) -> Self {
        let (like_amount, did_user_like) = like_summary(&entity.likes, viewer);
        Self {
            id,
            post_id: entity.postid,
            body: entity.body,
            author,
            date: entity.timestamp,
            like_amount,
            did_user_like,
        }
    }
}
