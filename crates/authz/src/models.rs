use std::fmt;

use sqlx::FromRow;
use time::OffsetDateTime;

/// A registered account.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub active: bool,
    pub confirmed_at: Option<OffsetDateTime>,
    /// Stable identifier other tables reference; independent of the email.
    pub fs_uniquifier: String,
}

// Keeps the password hash out of logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("active", &self.active)
            .field("confirmed_at", &self.confirmed_at)
            .field("fs_uniquifier", &self.fs_uniquifier)
            .finish_non_exhaustive()
    }
}

/// A label attachable to users. Not consulted by any access decision.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}
