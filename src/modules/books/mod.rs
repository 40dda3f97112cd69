pub mod catalog;
pub mod models;
pub mod routes;
mod views;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use biblio_authz::Authority;
use biblio_kernel::{InitCtx, Migration, Module};

use catalog::Catalog;
use routes::BooksState;

/// Each user's private reading list
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        routes::router(BooksState {
            catalog: Catalog::new(ctx.db.clone()),
            authority: Arc::new(Authority::from_pool(ctx.db.clone(), &ctx.settings.auth)),
        })
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE book (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL CHECK (length(title) BETWEEN 1 AND 100),
                    author TEXT NOT NULL CHECK (length(author) BETWEEN 1 AND 100),
                    read BOOLEAN NOT NULL DEFAULT 0,
                    user_id TEXT NOT NULL REFERENCES user(fs_uniquifier)
                );
                CREATE INDEX book_user_id ON book (user_id);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}
