//! Shared HTML chrome for every rendered page.

use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }
nav { display: flex; gap: 1rem; align-items: baseline; border-bottom: 1px solid #ddd; padding-bottom: .5rem; }
nav .viewer { margin-left: auto; color: #666; }
table { width: 100%; border-collapse: collapse; }
td, th { text-align: left; padding: .35rem; border-bottom: 1px solid #eee; }
tr.read td.title { text-decoration: line-through; color: #777; }
form label { display: block; margin: .5rem 0; }
ul.errors { color: #a00; }
"#;

/// Wrap page content in the document skeleton and navigation bar.
/// `viewer` is the email of the logged-in user, if any.
pub fn layout(title: &str, viewer: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · Biblio" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                header {
                    nav {
                        a href="/" { "My books" }
                        @if let Some(email) = viewer {
                            a href="/add-book" { "Add book" }
                            span.viewer { (email) }
                            a href="/logout" { "Log out" }
                        } @else {
                            a href="/login" { "Log in" }
                            a href="/register" { "Register" }
                        }
                    }
                }
                main {
                    h1 { (title) }
                    (content)
                }
            }
        }
    }
}

/// Render form validation messages; renders nothing for an empty list.
pub fn error_list(errors: &[String]) -> Markup {
    html! {
        @if !errors.is_empty() {
            ul.errors {
                @for error in errors {
                    li { (error) }
                }
            }
        }
    }
}
