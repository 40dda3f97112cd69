use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::CookieJar;
use biblio_authz::{extract::safe_next, AuthError, Authority, MaybeUser};
use biblio_http::AppError;
use tracing::instrument;

use super::{
    forms::{LoginForm, LoginQuery, RegisterForm},
    views,
};

pub fn router(authority: Arc<Authority>) -> Router {
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", get(logout).post(logout))
        .with_state(authority)
}

async fn login_form(MaybeUser(user): MaybeUser, Query(query): Query<LoginQuery>) -> Response {
    if user.is_some() {
        return Redirect::to(safe_next(query.next.as_deref())).into_response();
    }
    views::login_page("", query.next.as_deref(), &[]).into_response()
}

#[instrument(name = "Web: Login POST", skip_all)]
async fn login(
    State(authority): State<Arc<Authority>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let message = match authority.authenticate(&form.email, &form.password).await {
        Ok(user) => {
            let cookie = authority.session_cookie(&user)?;
            let target = safe_next(form.next.as_deref());
            return Ok((jar.add(cookie), Redirect::to(target)).into_response());
        }
        Err(AuthError::InvalidCredentials) => "Invalid email or password",
        Err(AuthError::Inactive) => "This account has been disabled",
        Err(e) => return Err(e.into()),
    };

    let page = views::login_page(&form.email, form.next.as_deref(), &[message.to_string()]);
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}

async fn register_form(
    State(authority): State<Arc<Authority>>,
    MaybeUser(user): MaybeUser,
) -> Result<Response, AppError> {
    if !authority.registerable() {
        return Err(AppError::not_found("registration is disabled"));
    }
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(views::register_page("", authority.password_min_length(), &[]).into_response())
}

#[instrument(name = "Web: Register POST", skip_all)]
async fn register(
    State(authority): State<Arc<Authority>>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if !authority.registerable() {
        return Err(AppError::not_found("registration is disabled"));
    }

    let errors = match form.mismatch() {
        Some(mismatch) => vec![mismatch],
        None => match authority.register(&form.email, &form.password).await {
            Ok(user) => {
                // Registration logs the new account in straight away.
                let cookie = authority.session_cookie(&user)?;
                return Ok((jar.add(cookie), Redirect::to("/")).into_response());
            }
            Err(AuthError::Rejected(violations)) => violations,
            Err(AuthError::EmailTaken) => vec!["Email is already registered".to_string()],
            Err(e) => return Err(e.into()),
        },
    };

    let page = views::register_page(&form.email, authority.password_min_length(), &errors);
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}

async fn logout(State(authority): State<Arc<Authority>>, jar: CookieJar) -> impl IntoResponse {
    (jar.remove(authority.removal_cookie()), Redirect::to("/login"))
}
