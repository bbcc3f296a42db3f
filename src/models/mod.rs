pub mod comment;
pub mod post;
pub mod subject;
pub mod user;

use std::collections::HashSet;

use serde::Serialize;

use crate::backend::{BackendError, Fields};

/// Like count and whether `viewer` is among the likers.
pub fn like_summary(likes: &[String], viewer: Option<&str>) -> (usize, bool) {
    let distinct: HashSet<&str> = likes.iter().map(String::as_str).collect();
    let did_like = viewer.is_some_and(|uid| distinct.contains(uid));
    (distinct.len(), did_like)
}

/// Serializes an entity into top-level document fields.
pub fn to_fields<T: Serialize>(entity: &T) -> Result<Fields, BackendError> {
    match serde_json::to_value(entity)? {
        serde_json::Value::Object(fields) => Ok(fields),
        other => Err(BackendError::InvalidArgument(format!(
            "entity serialized to {other}, expected an object"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_out_viewer_never_liked() {
        let likes = vec!["u1".to_string()];
        assert_eq!(like_summary(&likes, None), (1, false));
        assert_eq!(like_summary(&likes, Some("u1")), (1, true));
        assert_eq!(like_summary(&likes, Some("u2")), (1, false));
    }

    #[test]
    fn count_is_set_cardinality() {
        let likes = vec!["u1".to_string(), "u2".to_string(), "u1".to_string()];
        assert_eq!(like_summary(&likes, None).0, 2);
    }
}
