use biblio_http::page::{error_list, layout};
use maud::{html, Markup};

pub fn login_page(email: &str, next: Option<&str>, errors: &[String]) -> Markup {
    layout(
        "Log in",
        None,
        html! {
            (error_list(errors))
            form method="post" action="/login" {
                @if let Some(next) = next {
                    input type="hidden" name="next" value=(next);
                }
                label {
                    "Email "
                    input type="email" name="email" value=(email) required autofocus;
                }
                label {
                    "Password "
                    input type="password" name="password" required;
                }
                button type="submit" { "Log in" }
            }
            p { "No account yet? " a href="/register" { "Register" } }
        },
    )
}

pub fn register_page(email: &str, min_password_length: usize, errors: &[String]) -> Markup {
    layout(
        "Register",
        None,
        html! {
            (error_list(errors))
            form method="post" action="/register" {
                label {
                    "Email "
                    input type="email" name="email" value=(email) required autofocus;
                }
                label {
                    "Password "
                    input type="password" name="password" required minlength=(min_password_length);
                }
                label {
                    "Confirm password "
                    input type="password" name="password_confirm" required;
                }
                button type="submit" { "Register" }
            }
            p { "Already registered? " a href="/login" { "Log in" } }
        },
    )
}
