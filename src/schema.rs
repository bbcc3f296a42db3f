// Collection and field names as stored in the document store.

pub mod users {
    pub const COLLECTION: &str = "users";
    pub const UID: &str = "uid";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const PHOTO_URL: &str = "photoURL";
    pub const ADMIN: &str = "admin";
}

pub mod posts {
    pub const COLLECTION: &str = "posts";
    pub const UID: &str = "uid";
    pub const TITLE: &str = "title";
    pub const TIMESTAMP: &str = "timestamp";
    pub const LIKES: &str = "likes";
}

pub mod comments {
    pub const COLLECTION: &str = "comments";
    pub const UID: &str = "uid";
    pub const POST_ID: &str = "postid";
    pub const TIMESTAMP: &str = "timestamp";
    pub const LIKES: &str = "likes";
}

pub mod subjects {
    pub const COLLECTION: &str = "subjects";
    pub const NAME: &str = "name";
}
