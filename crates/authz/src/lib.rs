//! Identity and session handling: accounts, roles, password hashing, session
//! cookies and the request guards that turn a cookie into a [`User`].

use std::sync::Arc;

use async_trait::async_trait;
use biblio_kernel::{InitCtx, Migration, Module};

pub mod authority;
pub mod error;
pub mod extract;
pub mod models;
pub mod password;
pub mod session;
pub mod store;

pub use authority::Authority;
pub use error::AuthError;
pub use extract::{AuthRedirect, CurrentUser, MaybeUser};
pub use models::{Role, User};
pub use store::{SqliteUserStore, UserStore};

/// Core module owning the identity schema.
pub struct AuthzModule;

impl AuthzModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for AuthzModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for AuthzModule {
    fn name(&self) -> &'static str {
        "authz"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            registerable = ctx.settings.auth.registerable,
            session_ttl_hours = ctx.settings.auth.session_ttl_hours,
            "authz module initialized"
        );
        Ok(())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_identity",
            up: r#"
                CREATE TABLE user (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE CHECK (length(email) <= 255),
                    password TEXT NOT NULL,
                    active BOOLEAN NOT NULL DEFAULT 1,
                    confirmed_at TEXT,
                    fs_uniquifier TEXT NOT NULL UNIQUE
                );
                CREATE TABLE role (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE CHECK (length(name) <= 32),
                    description TEXT CHECK (length(description) <= 128)
                );
                CREATE TABLE roles_users (
                    user_id INTEGER NOT NULL REFERENCES user(id),
                    role_id INTEGER NOT NULL REFERENCES role(id),
                    PRIMARY KEY (user_id, role_id)
                );
                "#,
        }]
    }
}

/// Create the `authz` core module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(AuthzModule::new())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use biblio_kernel::settings::DatabaseSettings;
    use sqlx::SqlitePool;

    /// In-memory database with the identity schema applied.
    pub async fn memory_pool() -> SqlitePool {
        let pool = biblio_db::connect(&DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            ..DatabaseSettings::default()
        })
        .await
        .unwrap();
        let migrations: Vec<(String, Migration)> = AuthzModule::new()
            .migrations()
            .into_iter()
            .map(|m| ("authz".to_string(), m))
            .collect();
        biblio_db::migrate(&pool, &migrations).await.unwrap();
        pool
    }
}
