use biblio_http::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("email is already registered")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    Inactive,

    #[error("registration rejected: {}", .0.join("; "))]
    Rejected(Vec<String>),

    #[error("no user with email {0}")]
    UnknownUser(String),

    #[error("session token rejected: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("session lifetime {0} puts expiry out of range")]
    SessionLifetime(time::Duration),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::EmailTaken
            | AuthError::InvalidCredentials
            | AuthError::Inactive
            | AuthError::Rejected(_) => AppError::bad_request(error.to_string()),
            AuthError::UnknownUser(_) => AppError::not_found(error.to_string()),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}
