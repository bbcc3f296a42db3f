use std::collections::HashMap;

use maud::{html, Markup};
use serde_json::Value;

use crate::stores::LikeSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Post,
    Comment,
}

impl LikeTarget {
    fn path(&self) -> &'static str {
        match self {
            LikeTarget::Post => "/posts",
            LikeTarget::Comment => "/comments",
        }
    }
}

/// Toggle that swaps itself for the server's answer.
pub fn render(target: LikeTarget, id: &str, summary: LikeSummary) -> Markup {
    let action = if summary.did_user_like {
        "dislike"
    } else {
        "like"
    };
    let url = format!("{}/{}/{}", target.path(), id, action);
    html! {
        form.like method="post" action=(url) hx-post=(url) hx-swap="outerHTML" {
            button.liked[summary.did_user_like] type="submit" {
                @if summary.did_user_like { "♥ " } @else { "♡ " }
                (summary.like_amount)
            }
        }
    }
}

/// `like_button(kind="post", id=post.id, like_amount=post.like_amount, did_user_like=post.did_user_like)`
pub fn tera_function(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let target = match args.get("kind").and_then(Value::as_str) {
        Some("post") => LikeTarget::Post,
        Some("comment") => LikeTarget::Comment,
        other => return Err(tera::Error::msg(format!("like_button: bad kind {other:?}"))),
    };
    let id = args
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg("like_button: missing id"))?;
    let summary = LikeSummary {
        like_amount: args
            .get("like_amount")
            .and_then(Value::as_u64)
            .unwrap_or_default() as usize,
        did_user_like: args
            .get("did_user_like")
            .and_then(Value::as_bool)
            .unwrap_or_default(),
    };
    Ok(Value::String(render(target, id, summary).into_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn liked_button_offers_dislike() {
        let html = render(
            LikeTarget::Post,
            "p1",
            LikeSummary {
                like_amount: 3,
                did_user_like: true,
            },
        )
        .into_string();
        assert!(html.contains(r#"hx-post="/posts/p1/dislike""#));
        assert!(html.contains("3"));
        assert!(html.contains(r#"class="liked""#));
    }

    #[test]
    fn tera_function_renders_comment_button() {
        let args = HashMap::from([
            ("kind".to_string(), json!("comment")),
            ("id".to_string(), json!("c1")),
            ("like_amount".to_string(), json!(0)),
            ("did_user_like".to_string(), json!(false)),
        ]);
        let rendered = tera_function(&args).unwrap();
        assert!(rendered
            .as_str()
            .unwrap()
            .contains(r#"action="/comments/c1/like""#));
    }

    #[test]
    fn tera_function_rejects_unknown_kind() {
        let args = HashMap::from([("kind".to_string(), json!("user"))]);
        assert!(tera_function(&args).is_err());
    }
}
