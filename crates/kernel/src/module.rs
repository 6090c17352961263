use async_trait::async_trait;
use axum::Router;

/// What a module sees while booting: the loaded settings.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// DDL a module needs applied to the book store before it serves requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// A piece of the bookshelf service: the `db` core module, the books
/// catalog, the external lookup.
///
/// Modules own their store handles and HTTP clients and hand out routers
/// that already carry their state.
#[async_trait]
pub trait Module: Sync + Send {
    /// Also the mount point: `/api/{name}`
    fn name(&self) -> &'static str;

    /// Check dependencies are reachable; runs before migrations.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
    }

    /// Paths are relative to the mount point; `/docs/openapi.json` prefixes them.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Applied sorted by module name, then id.
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Runs once the store schema is in place.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs on shutdown, in reverse start order.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
