use maud::{html, Markup};

use crate::models::subject::Subject;

pub fn render(subjects: &[Subject], can_manage: bool) -> Markup {
    html! {
        ul #subject-list {
            @for subject in subjects {
                li {
                    span.subject { (subject.name) }
                    @if can_manage {
                        form method="post" action={ "/subjects/" (subject.id) "/delete" } {
                            button type="submit" { "Remove" }
                        }
                    }
                }
            }
            @if subjects.is_empty() {
                li.empty { "No subjects yet" }
            }
        }
    }
}
