use serde::Deserialize;
use sqlx::FromRow;

pub const MAX_FIELD_LENGTH: usize = 100;

/// A book on one user's shelf.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub read: bool,
    /// Owner's `fs_uniquifier`.
    pub user_id: String,
}

/// Add-book form body. Missing fields deserialize as empty and fail validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBookForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

/// Validated add-book input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
}

impl NewBookForm {
    pub fn validate(&self) -> Result<NewBook, Vec<String>> {
        let mut errors = Vec::new();
        let title = required_field("Title", &self.title, &mut errors);
        let author = required_field("Author", &self.author, &mut errors);

        if errors.is_empty() {
            Ok(NewBook { title, author })
        } else {
            Err(errors)
        }
    }
}

fn required_field(label: &str, raw: &str, errors: &mut Vec<String>) -> String {
    let value = raw.trim();
    if value.is_empty() {
        errors.push(format!("{label} is required"));
    } else if value.chars().count() > MAX_FIELD_LENGTH {
        errors.push(format!("{label} must be at most {MAX_FIELD_LENGTH} characters"));
    }
    value.to_string()
}
