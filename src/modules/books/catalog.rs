//! Per-owner book storage. Every query is scoped by the owner's `fs_uniquifier`.

use biblio_http::AppError;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::instrument;

use super::models::{Book, NewBook};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("book {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<CatalogError> for AppError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound(_) => AppError::not_found(error.to_string()),
            CatalogError::Database(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

/// Result of a mutation that only the owner may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnedChange {
    Applied,
    /// The book exists but belongs to someone else; nothing changed.
    NotOwner,
}

#[derive(Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

impl Catalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The owner's books in insertion order.
    pub async fn list(&self, owner: &str) -> Result<Vec<Book>, CatalogError> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM book WHERE user_id = ? ORDER BY id")
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Insert an unread book owned by `owner`.
    #[instrument(name = "Catalog: add", skip(self, book))]
    pub async fn add(&self, owner: &str, book: &NewBook) -> Result<Book, CatalogError> {
        let book = sqlx::query_as::<_, Book>(
            r#"INSERT INTO book (title, author, read, user_id)
               VALUES (?, ?, 0, ?)
               RETURNING *"#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    /// Flip the read flag if `owner` owns book `id`.
    #[instrument(name = "Catalog: toggle read", skip(self))]
    pub async fn toggle_read(&self, owner: &str, id: i64) -> Result<OwnedChange, CatalogError> {
        let mut tx = self.pool.begin().await?;
        if !owned_by(&mut tx, owner, id).await? {
            return Ok(OwnedChange::NotOwner);
        }

        sqlx::query("UPDATE book SET read = NOT read WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(OwnedChange::Applied)
    }

    /// Remove book `id` if `owner` owns it.
    #[instrument(name = "Catalog: delete", skip(self))]
    pub async fn delete(&self, owner: &str, id: i64) -> Result<OwnedChange, CatalogError> {
        let mut tx = self.pool.begin().await?;
        if !owned_by(&mut tx, owner, id).await? {
            return Ok(OwnedChange::NotOwner);
        }

        sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(OwnedChange::Applied)
    }
}

/// Whether book `id` belongs to `owner`; [`CatalogError::NotFound`] if it doesn't exist.
async fn owned_by(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    owner: &str,
    id: i64,
) -> Result<bool, CatalogError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT user_id FROM book WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

    match row {
        None => Err(CatalogError::NotFound(id)),
        Some((book_owner,)) => Ok(book_owner == owner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_kernel::{settings::DatabaseSettings, Module};

    async fn catalog() -> Catalog {
        let pool = biblio_db::connect(&DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            ..DatabaseSettings::default()
        })
        .await
        .unwrap();
        // Foreign keys need the identity schema underneath.
        let mut migrations: Vec<(String, biblio_kernel::Migration)> = Vec::new();
        for module in [biblio_authz::create_module(), crate::modules::books::create_module()] {
            for migration in module.migrations() {
                migrations.push((module.name().to_string(), migration));
            }
        }
        biblio_db::migrate(&pool, &migrations).await.unwrap();

        for owner in ["u1", "u2"] {
            sqlx::query(
                "INSERT INTO user (email, password, fs_uniquifier) VALUES (?, 'x', ?)",
            )
            .bind(format!("{owner}@example.com"))
            .bind(owner)
            .execute(&pool)
            .await
            .unwrap();
        }
        Catalog::new(pool)
    }

    fn dune() -> NewBook {
        NewBook {
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
        }
    }

    #[tokio::test]
    async fn listing_is_scoped_to_owner_in_insertion_order() {
        let catalog = catalog().await;
        let first = catalog.add("u1", &dune()).await.unwrap();
        catalog
            .add(
                "u2",
                &NewBook {
                    title: "Emma".to_string(),
                    author: "Austen".to_string(),
                },
            )
            .await
            .unwrap();
        let second = catalog
            .add(
                "u1",
                &NewBook {
                    title: "Ubik".to_string(),
                    author: "Dick".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(!first.read);
        let ids: Vec<i64> = catalog.list("u1").await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert!(catalog
            .list("u2")
            .await
            .unwrap()
            .iter()
            .all(|b| b.user_id == "u2"));
    }

    #[tokio::test]
    async fn double_toggle_restores_state() {
        let catalog = catalog().await;
        let book = catalog.add("u1", &dune()).await.unwrap();

        assert_eq!(catalog.toggle_read("u1", book.id).await.unwrap(), OwnedChange::Applied);
        assert!(catalog.list("u1").await.unwrap()[0].read);

        catalog.toggle_read("u1", book.id).await.unwrap();
        assert!(!catalog.list("u1").await.unwrap()[0].read);
    }

    #[tokio::test]
    async fn foreign_owner_changes_nothing() {
        let catalog = catalog().await;
        let book = catalog.add("u1", &dune()).await.unwrap();

        assert_eq!(catalog.toggle_read("u2", book.id).await.unwrap(), OwnedChange::NotOwner);
        assert_eq!(catalog.delete("u2", book.id).await.unwrap(), OwnedChange::NotOwner);

        assert_eq!(catalog.list("u1").await.unwrap(), vec![book]);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let catalog = catalog().await;
        assert!(matches!(
            catalog.toggle_read("u1", 42).await,
            Err(CatalogError::NotFound(42))
        ));
        assert!(matches!(
            catalog.delete("u1", 42).await,
            Err(CatalogError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn delete_removes_book_for_good() {
        let catalog = catalog().await;
        let book = catalog.add("u1", &dune()).await.unwrap();

        assert_eq!(catalog.delete("u1", book.id).await.unwrap(), OwnedChange::Applied);
        assert!(catalog.list("u1").await.unwrap().is_empty());
        assert!(matches!(
            catalog.delete("u1", book.id).await,
            Err(CatalogError::NotFound(_))
        ));
    }
}
