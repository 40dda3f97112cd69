use async_trait::async_trait;
use axum::Router;
use sqlx::SqlitePool;

/// What every module sees while it is wired up: settings and the shared pool.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub db: &'a SqlitePool,
}

/// One schema step. `id` is unique within its module and is recorded in the
/// ledger once `up` has run.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// A unit of the application with its own schema, routes and lifecycle.
///
/// Lifecycle: `init` → migrations → `start` → serving → `stop`.
#[async_trait]
pub trait Module: Sync + Send {
    /// Registry key; the ledger records migrations under it.
    fn name(&self) -> &'static str;

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes with state already applied, merged at the site root.
    fn routes(&self, _ctx: &InitCtx<'_>) -> Router {
        Router::new()
    }

    /// Applied in the order returned.
    fn migrations(&self) -> Vec<Migration> {
        Vec::new()
    }

    /// Runs once migrations are complete and before the listener binds.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
