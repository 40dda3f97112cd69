//! Request guards resolving the session cookie to a [`User`].

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use biblio_http::AppError;

use crate::{authority::Authority, models::User};

/// The authenticated caller. Rejects with a redirect to the login page.
pub struct CurrentUser(pub User);

/// The caller if a valid session exists. Never rejects.
pub struct MaybeUser(pub Option<User>);

/// Redirect to `/login`, remembering where the caller was headed.
#[derive(Debug)]
pub struct AuthRedirect {
    next: String,
}

impl AuthRedirect {
    pub fn new(next: impl Into<String>) -> Self {
        Self { next: next.into() }
    }

    pub fn location(&self) -> String {
        format!("/login?next={}", encode_query_value(&self.next))
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        Redirect::to(&self.location()).into_response()
    }
}

/// Accept a post-login target only if it stays on this site.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(|c| c.is_control() || c.is_whitespace()) =>
        {
            path
        }
        _ => "/",
    }
}

fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

async fn session_user<S>(parts: &Parts, state: &S) -> Result<Option<User>, AppError>
where
    S: Send + Sync,
    Arc<Authority>: FromRef<S>,
{
    let authority = Arc::<Authority>::from_ref(state);
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(cookie) = jar.get(authority.cookie_name()) else {
        return Ok(None);
    };
    Ok(authority.resolve_session(cookie.value()).await?)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Arc<Authority>: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match session_user(parts, state).await {
            Ok(Some(user)) => {
                tracing::Span::current().record("user_id", user.id);
                Ok(CurrentUser(user))
            }
            Ok(None) => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path(), |target| target.as_str());
                tracing::debug!(next, "unauthenticated request redirected");
                Err(AuthRedirect::new(next).into_response())
            }
            Err(e) => Err(e.into_response()),
        }
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    Arc<Authority>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(session_user(parts, state).await?))
    }
}
