//! Application assembly: pool, module registry, migrations, router, server.

use anyhow::Context;
use axum::Router;
use biblio_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sqlx::SqlitePool;

use crate::modules;

/// A fully wired application that has not started serving yet.
pub struct Application {
    settings: Settings,
    pool: SqlitePool,
    registry: ModuleRegistry,
}

impl Application {
    /// Validate settings, open the database and initialize every module.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        settings.validate()?;

        let pool = biblio_db::connect(&settings.database).await?;

        let mut registry = ModuleRegistry::new();
        registry.register_core(biblio_db::create_module(pool.clone()));
        registry.register_core(biblio_authz::create_module());
        modules::register_all(&mut registry);

        let app = Self {
            settings,
            pool,
            registry,
        };
        app.registry
            .init_all(&app.ctx())
            .await
            .with_context(|| "module initialization failed")?;

        Ok(app)
    }

    pub fn ctx(&self) -> InitCtx<'_> {
        InitCtx {
            settings: &self.settings,
            db: &self.pool,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply pending migrations from every module; returns how many ran.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let migrations = self.registry.collect_migrations();
        let applied = biblio_db::migrate(&self.pool, &migrations)
            .await
            .with_context(|| "database migration failed")?;
        tracing::info!(applied, total = migrations.len(), "migrations complete");
        Ok(applied)
    }

    /// The complete HTTP application.
    pub fn router(&self) -> Router {
        biblio_http::build_router(&self.registry, &self.ctx())
    }

    /// Start modules, serve until a shutdown signal, then stop modules.
    pub async fn serve(self) -> anyhow::Result<()> {
        self.registry.start_all(&self.ctx()).await?;

        let served = biblio_http::start_server(self.router(), &self.settings.server).await;

        self.registry.stop_all().await?;
        served
    }

    /// Stop every module without serving (closes the pool).
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.registry.stop_all().await
    }
}

/// Bootstrap, migrate and serve.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let app = Application::bootstrap(settings).await?;
    app.migrate().await?;
    app.serve().await?;
    tracing::info!("biblio-app shut down cleanly");
    Ok(())
}
