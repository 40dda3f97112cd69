use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use biblio_kernel::settings::{AuthSettings, MAX_SESSION_TTL_HOURS};
use sqlx::SqlitePool;
use time::Duration;
use tracing::instrument;

use crate::{
    error::AuthError,
    models::User,
    password::PasswordService,
    session::SessionKeys,
    store::{SqliteUserStore, UserStore},
};

const MAX_EMAIL_LENGTH: usize = 255;

/// Trim and lower-case an email so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration rules for an already normalized email and a raw password.
/// Returns every violated rule.
pub fn credential_policy_violations(email: &str, password: &str, min_length: usize) -> Vec<String> {
    let mut violations = Vec::new();
    if email.is_empty() {
        violations.push("Email is required".to_string());
    } else if !is_plausible_email(email) {
        violations.push("Email address is not valid".to_string());
    } else if email.len() > MAX_EMAIL_LENGTH {
        violations.push(format!("Email must be at most {MAX_EMAIL_LENGTH} characters"));
    }
    if password.chars().count() < min_length {
        violations.push(format!("Password must be at least {min_length} characters"));
    }
    violations
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Authentication capability shared by every route that needs an identity:
/// registration, credential checks and session cookies.
pub struct Authority {
    store: Arc<dyn UserStore>,
    passwords: PasswordService,
    sessions: SessionKeys,
    cookie_name: String,
    secure_cookie: bool,
    registerable: bool,
    password_min_length: usize,
}

impl Authority {
    pub fn new(store: Arc<dyn UserStore>, settings: &AuthSettings) -> Self {
        // Settings validation rejects longer lifetimes; clamp for callers that skip it.
        let ttl_hours = settings.session_ttl_hours.min(MAX_SESSION_TTL_HOURS);
        let ttl = Duration::hours(i64::try_from(ttl_hours).unwrap_or(i64::MAX / 3600));
        Self {
            store,
            passwords: PasswordService::new(&settings.password_salt),
            sessions: SessionKeys::new(settings.secret_key.as_bytes(), ttl),
            cookie_name: settings.session_cookie.clone(),
            secure_cookie: settings.secure_cookie,
            registerable: settings.registerable,
            password_min_length: settings.password_min_length,
        }
    }

    /// Authority backed by the SQLite identity tables.
    pub fn from_pool(pool: SqlitePool, settings: &AuthSettings) -> Self {
        Self::new(Arc::new(SqliteUserStore::new(pool)), settings)
    }

    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    pub fn registerable(&self) -> bool {
        self.registerable
    }

    pub fn password_min_length(&self) -> usize {
        self.password_min_length
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Create an active account after checking the credential policy.
    #[instrument(name = "Authority: register", skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        let violations = credential_policy_violations(&email, password, self.password_min_length);
        if !violations.is_empty() {
            return Err(AuthError::Rejected(violations));
        }

        let hash = self.passwords.hash_blocking(password.to_string()).await?;
        let user = self.store.create_user(&email, &hash).await?;
        tracing::info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Check credentials of an active account.
    #[instrument(name = "Authority: authenticate", skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        let Some(user) = self.store.find_by_email(&email).await? else {
            tracing::warn!("login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let valid = self
            .passwords
            .verify_blocking(password.to_string(), user.password_hash.clone())
            .await?;
        if !valid {
            tracing::warn!(user_id = user.id, "login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.active {
            tracing::warn!(user_id = user.id, "login refused: account disabled");
            return Err(AuthError::Inactive);
        }

        tracing::info!(user_id = user.id, "user authenticated");
        Ok(user)
    }

    /// Resolve a session token to its active user. Invalid or expired tokens
    /// and inactive or vanished users resolve to `None`.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<User>, AuthError> {
        let claims = match self.sessions.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "session token rejected");
                return Ok(None);
            }
        };

        let user = self.store.find_by_uniquifier(&claims.sub).await?;
        Ok(user.filter(|user| user.active))
    }

    /// Session cookie binding the browser to `user`.
    pub fn session_cookie(&self, user: &User) -> Result<Cookie<'static>, AuthError> {
        let token = self.sessions.issue(&user.fs_uniquifier)?;
        Ok(Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .max_age(self.sessions.ttl())
            .build())
    }

    /// Cookie to pass to `CookieJar::remove` to end the session.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), "")).path("/").build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;

    async fn authority() -> Authority {
        Authority::from_pool(memory_pool().await, &AuthSettings::default())
    }

    #[test]
    fn policy_reports_every_violation() {
        assert!(credential_policy_violations("ann@example.com", "longenough", 8).is_empty());

        let violations = credential_policy_violations("not-an-email", "short", 8);
        assert_eq!(
            violations,
            vec![
                "Email address is not valid".to_string(),
                "Password must be at least 8 characters".to_string(),
            ]
        );
        assert_eq!(
            credential_policy_violations("", "longenough", 8),
            vec!["Email is required".to_string()]
        );
    }

    #[tokio::test]
    async fn register_normalizes_email_and_authenticates() {
        let authority = authority().await;
        let user = authority
            .register("  Ann@Example.COM ", "password123")
            .await
            .unwrap();
        assert_eq!(user.email, "ann@example.com");
        assert_ne!(user.password_hash, "password123");

        let logged_in = authority
            .authenticate("ANN@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(logged_in.fs_uniquifier, user.fs_uniquifier);

        assert!(matches!(
            authority.authenticate("ann@example.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            authority.authenticate("bob@example.com", "password123").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn register_rejects_policy_violations_and_duplicates() {
        let authority = authority().await;
        assert!(matches!(
            authority.register("ann@example.com", "short").await,
            Err(AuthError::Rejected(_))
        ));

        authority
            .register("ann@example.com", "password123")
            .await
            .unwrap();
        assert!(matches!(
            authority.register("ANN@example.com", "password456").await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn sessions_resolve_only_for_active_users() {
        let authority = authority().await;
        let user = authority
            .register("ann@example.com", "password123")
            .await
            .unwrap();

        let cookie = authority.session_cookie(&user).unwrap();
        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.http_only(), Some(true));

        let resolved = authority.resolve_session(cookie.value()).await.unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id));

        assert!(authority.resolve_session("garbage").await.unwrap().is_none());

        authority
            .store()
            .set_active("ann@example.com", false)
            .await
            .unwrap();
        assert!(authority
            .resolve_session(cookie.value())
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            authority.authenticate("ann@example.com", "password123").await,
            Err(AuthError::Inactive)
        ));
    }

    #[tokio::test]
    async fn oversized_session_lifetime_is_clamped() {
        let settings = AuthSettings {
            session_ttl_hours: u64::MAX,
            ..AuthSettings::default()
        };
        let authority = Authority::from_pool(memory_pool().await, &settings);
        let user = authority
            .register("ann@example.com", "password123")
            .await
            .unwrap();

        let cookie = authority.session_cookie(&user).unwrap();
        assert_eq!(
            cookie.max_age(),
            Some(Duration::hours(MAX_SESSION_TTL_HOURS as i64))
        );
        assert!(authority.resolve_session(cookie.value()).await.unwrap().is_some());
    }
}
