use async_trait::async_trait;
use axum::Router;
use sqlx::SqlitePool;

use crate::settings::Settings;

/// What a module sees of the application while it boots
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
    pub db: &'a SqlitePool,
}

impl<'a> InitCtx<'a> {
    pub fn new(settings: &'a Settings, db: &'a SqlitePool) -> Self {
        Self { settings, db }
    }
}

/// One schema step. `(module name, id)` identifies it once applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub id: &'static str,
    /// One or more SQL statements, run in a single transaction
    pub up: &'static str,
}

impl Migration {
    pub const fn new(id: &'static str, up: &'static str) -> Self {
        Self { id, up }
    }
}

/// A unit of API surface: routes, docs, schema and lifecycle hooks.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name; also the last segment of [`Module::mount_path`]
    fn name(&self) -> &'static str;

    /// Where the router nests [`Module::routes`]
    fn mount_path(&self) -> String {
        format!("/api/{}", self.name())
    }

    /// Runs before migrations
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes relative to the mount path, with any state already attached
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` relative to the mount path, `components`)
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Runs once every migration is applied
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
