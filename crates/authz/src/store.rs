use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::{Role, User},
};

/// Persistence port for accounts and role assignments.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert an active account. Fails with [`AuthError::EmailTaken`] on a duplicate email.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_uniquifier(&self, fs_uniquifier: &str) -> Result<Option<User>, AuthError>;

    async fn set_active(&self, email: &str, active: bool) -> Result<User, AuthError>;

    async fn find_or_create_role(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Role, AuthError>;

    /// Returns `false` when the user already held the role.
    async fn add_role_to_user(&self, email: &str, role_name: &str) -> Result<bool, AuthError>;

    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AuthError>;
}

pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AuthError> {
        let result = sqlx::query_as::<_, User>(
            r#"INSERT INTO user (email, password, active, fs_uniquifier)
               VALUES (?, ?, 1, ?)
               RETURNING *"#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(Uuid::new_v4().to_string())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AuthError::EmailTaken)
            }
            Err(e) => Err(AuthError::Database(e)),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM user WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_uniquifier(&self, fs_uniquifier: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM user WHERE fs_uniquifier = ?")
            .bind(fs_uniquifier)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_active(&self, email: &str, active: bool) -> Result<User, AuthError> {
        sqlx::query_as::<_, User>("UPDATE user SET active = ? WHERE email = ? RETURNING *")
            .bind(active)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AuthError::UnknownUser(email.to_string()))
    }

    async fn find_or_create_role(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Role, AuthError> {
        sqlx::query("INSERT OR IGNORE INTO role (name, description) VALUES (?, ?)")
            .bind(name)
            .bind(description)
            .execute(&self.pool)
            .await?;

        let role = sqlx::query_as::<_, Role>("SELECT * FROM role WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(role)
    }

    async fn add_role_to_user(&self, email: &str, role_name: &str) -> Result<bool, AuthError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::UnknownUser(email.to_string()))?;
        let role = self.find_or_create_role(role_name, None).await?;

        let result = sqlx::query("INSERT OR IGNORE INTO roles_users (user_id, role_id) VALUES (?, ?)")
            .bind(user.id)
            .bind(role.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AuthError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"SELECT role.* FROM role
               JOIN roles_users ON roles_users.role_id = role.id
               WHERE roles_users.user_id = ?
               ORDER BY role.name"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }
}
