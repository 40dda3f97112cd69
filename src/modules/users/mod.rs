mod forms;
pub mod routes;
mod views;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use biblio_authz::Authority;
use biblio_kernel::{InitCtx, Module};

/// Login, registration and logout pages on top of the `authz` identity store
pub struct UsersModule;

impl UsersModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            registerable = ctx.settings.auth.registerable,
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        routes::router(Arc::new(Authority::from_pool(
            ctx.db.clone(),
            &ctx.settings.auth,
        )))
    }
}

/// Create a new instance of the users module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(UsersModule::new())
}
