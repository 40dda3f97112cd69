//! SQLite connection pool factory, migration runner and the `db` core module.

use std::{str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use biblio_kernel::{settings::DatabaseSettings, InitCtx, Migration, Module};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use time::OffsetDateTime;

/// Open a connection pool for the configured database URL.
///
/// In-memory databases exist per connection, so their pool is pinned to a
/// single connection that is never recycled.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut pool_options =
        SqlitePoolOptions::new().acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms));

    pool_options = if is_in_memory(&settings.url) {
        pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool_options.max_connections(settings.max_connections)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| "can't connect to database")?;

    tracing::info!(target: "biblio-db", url = %settings.url, "database pool ready");
    Ok(pool)
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

const LEDGER_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS _migrations (
    module TEXT NOT NULL,
    id TEXT NOT NULL,
    applied_at TEXT NOT NULL,
    PRIMARY KEY (module, id)
)"#;

/// Apply every migration not yet recorded in the `_migrations` ledger, in the
/// order given. Each migration runs in its own transaction together with its
/// ledger row. Returns how many were applied.
pub async fn migrate(pool: &SqlitePool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::query(LEDGER_SCHEMA)
        .execute(pool)
        .await
        .with_context(|| "failed to create migration ledger")?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let recorded: Option<(String,)> =
            sqlx::query_as("SELECT id FROM _migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .with_context(|| "failed to read migration ledger")?;
        if recorded.is_some() {
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;
        sqlx::query("INSERT INTO _migrations (module, id, applied_at) VALUES (?, ?, ?)")
            .bind(module)
            .bind(migration.id)
            .bind(OffsetDateTime::now_utc())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(target: "biblio-db", module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

/// Core module owning the pool's lifetime: it closes the pool on shutdown.
pub struct DbModule {
    pool: SqlitePool,
}

impl DbModule {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Module for DbModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .with_context(|| "database ping failed")?;
        tracing::info!(
            module = self.name(),
            connections = self.pool.size(),
            "database module started"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.pool.close().await;
        tracing::info!(module = self.name(), "database pool closed");
        Ok(())
    }
}

/// Create the `db` core module for the given pool
pub fn create_module(pool: SqlitePool) -> Arc<dyn Module> {
    Arc::new(DbModule::new(pool))
}
