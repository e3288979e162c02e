use anyhow::Context;
use axum::Router;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;
use crate::state::AppState;

/// A migrated database with every module initialized and started
pub struct App {
    pub state: AppState,
    pub registry: ModuleRegistry,
}

/// Connect, register modules, run their lifecycle hooks and migrations
pub async fn bootstrap(settings: Settings) -> anyhow::Result<App> {
    let db = bookshelf_db::connect(&settings.database).await?;
    let state = AppState::new(settings, db).context("failed to build application state")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &state)?;

    let ctx = InitCtx::new(&state.settings, &state.db);
    registry.init_all(&ctx).await?;

    let applied = bookshelf_db::migrate(&state.db, &registry.collect_migrations()).await?;
    tracing::info!(applied, modules = registry.len(), "database schema up to date");

    registry.start_all(&ctx).await?;

    Ok(App { state, registry })
}

impl App {
    /// Full HTTP surface with the default middleware stack
    pub fn router(&self) -> Router {
        bookshelf_http::build_router(&self.registry, &self.state.settings)
            .with_extension(self.state.jwt.clone())
            .with_default_layers(&self.state.settings)
            .build()
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.registry.stop_all().await?;
        self.state.db.close().await;
        Ok(())
    }
}
