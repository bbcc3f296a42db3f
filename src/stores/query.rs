//! Query plans for feed listings.

use serde::{Deserialize, Serialize};

use crate::backend::{Direction, FilterOp, Query};
use crate::schema::{comments, posts};

/// How search results are ordered. Browsing without a search is always newest first.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchOrdering {
    /// Newest first, same as browsing; the title range only filters.
    #[default]
    Recency,
    /// Title descending, then oldest first.
    TitleDescending,
}

/// The home feed, or a title search when `search` is non-empty.
///
/// Search is a case-sensitive lexicographic range: every title `>= search` matches.
pub fn posts_feed(search: Option<&str>, page_size: usize, ordering: SearchOrdering) -> Query {
    let base = Query::collection(posts::COLLECTION);
    let plan = match search.filter(|s| !s.is_empty()) {
        None => base.order_by(posts::TIMESTAMP, Direction::Desc),
        Some(text) => {
            let filtered = base.filter(posts::TITLE, FilterOp::Ge, text);
            match ordering {
                SearchOrdering::Recency => filtered.order_by(posts::TIMESTAMP, Direction::Desc),
                SearchOrdering::TitleDescending => filtered
                    .order_by(posts::TITLE, Direction::Desc)
                    .order_by(posts::TIMESTAMP, Direction::Asc),
            }
        }
    };
    plan.limit(page_size)
}

pub fn user_posts(uid: &str, page_size: usize) -> Query {
    Query::collection(posts::COLLECTION)
        .filter(posts::UID, FilterOp::Eq, uid)
        .order_by(posts::TIMESTAMP, Direction::Desc)
        .limit(page_size)
}

pub fn post_comments(post_id: &str, page_size: usize) -> Query {
    Query::collection(comments::COLLECTION)
        .filter(comments::POST_ID, FilterOp::Eq, post_id)
        .order_by(comments::TIMESTAMP, Direction::Desc)
        .limit(page_size)
}

pub fn user_comments(uid: &str, page_size: usize) -> Query {
    Query::collection(comments::COLLECTION)
        .filter(comments::UID, FilterOp::Eq, uid)
        .order_by(comments::TIMESTAMP, Direction::Desc)
        .limit(page_size)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::{Filter, Order};

    fn order(field: &str, direction: Direction) -> Order {
        Order {
            field: field.into(),
            direction,
        }
    }

    #[test]
    fn browse_is_newest_first() {
        let q = posts_feed(None, 10, SearchOrdering::TitleDescending);
        assert!(q.filters.is_empty());
        assert_eq!(q.order_by, vec![order("timestamp", Direction::Desc)]);
        assert_eq!(q.limit, Some(10));
    }

    #[test]
    fn empty_search_is_browse() {
        assert_eq!(
            posts_feed(Some(""), 10, SearchOrdering::Recency),
            posts_feed(None, 10, SearchOrdering::Recency)
        );
    }

    #[test]
    fn search_filters_title_range() {
        let q = posts_feed(Some("Banana"), 10, SearchOrdering::Recency);
        assert_eq!(
            q.filters,
            vec![Filter {
                field: "title".into(),
                op: FilterOp::Ge,
                value: json!("Banana"),
            }]
        );
        assert_eq!(q.order_by, vec![order("timestamp", Direction::Desc)]);
    }

    #[test]
    fn title_descending_search_keeps_legacy_ordering() {
        let q = posts_feed(Some("Banana"), 10, SearchOrdering::TitleDescending);
        assert_eq!(
            q.order_by,
            vec![
                order("title", Direction::Desc),
                order("timestamp", Direction::Asc)
            ]
        );
    }

    #[test]
    fn scoped_listings_filter_by_owner_or_parent() {
        let q = user_posts("u1", 10);
        assert_eq!(q.filters[0].field, "uid");
        assert_eq!(q.filters[0].op, FilterOp::Eq);

        let q = post_comments("p1", 3);
        assert_eq!(q.collection, "comments");
        assert_eq!(q.filters[0].field, "postid");
        assert_eq!(q.limit, Some(3));

        let q = user_comments("u1", 10);
        assert_eq!(q.filters[0].value, json!("u1"));
    }
}
