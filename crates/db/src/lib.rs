//! Book persistence for bookshelf.
//!
//! [`connect`] picks a [`BookStore`] engine from the database URL, and
//! [`DatabaseModule`] ties the store into the module lifecycle as the `db`
//! core module.

use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use bookshelf_kernel::{settings::DatabaseSettings, InitCtx, Module};

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use error::{StoreError, UniqueField};
pub use memory::InMemoryBookStore;
pub use model::{Book, BookFilter, BookId, BookPatch, NewBook, Revision};
pub use postgres::PgBookStore;
pub use store::BookStore;

/// Open the store named by `settings.url`.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Arc<dyn BookStore>> {
    let store: Arc<dyn BookStore> = if settings.url.starts_with("memory:") {
        Arc::new(InMemoryBookStore::new())
    } else if settings.url.starts_with("postgres://") || settings.url.starts_with("postgresql://")
    {
        Arc::new(
            PgBookStore::connect(settings)
                .await
                .with_context(|| "failed to connect to PostgreSQL")?,
        )
    } else {
        bail!(
            "unsupported database url '{}'; expected memory:// or postgres://",
            settings.url
        );
    };

    tracing::info!(target: "bookshelf-db", engine = store.kind(), "book store ready");
    Ok(store)
}

/// Core module owning the store connection.
pub struct DatabaseModule {
    store: Arc<dyn BookStore>,
}

impl DatabaseModule {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for DatabaseModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.store
            .ping()
            .await
            .with_context(|| format!("{} store is not reachable", self.store.kind()))?;
        tracing::info!(module = self.name(), engine = self.store.kind(), "db module initialized");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.store.close().await;
        tracing::info!(module = self.name(), "db module stopped");
        Ok(())
    }
}

/// Create the `db` core module for `store`
pub fn create_module(store: Arc<dyn BookStore>) -> Arc<dyn Module> {
    Arc::new(DatabaseModule::new(store))
}
