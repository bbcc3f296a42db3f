use maud::{html, Markup};

use crate::stores::MutationError;

pub fn error(err: &MutationError) -> Markup {
    html! {
        p.flash.error role="alert" data-code=(err.code()) {
            @match err {
                MutationError::Unauthenticated => {
                    "Please " a href="/signin" { "sign in" } " first."
                }
                _ => (err.to_string()),
            }
        }
    }
}
