//! Bookshelf: a book catalog service with a pass-through lookup against a
//! remote book-metadata provider.
#![recursion_limit = "256"]

pub mod modules;

use anyhow::Context;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Connect the store and build a registry holding every module.
pub async fn bootstrap(settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let store = bookshelf_db::connect(&settings.database).await?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings, store.clone())?;

    let ctx = InitCtx { settings };
    registry.init_all(&ctx).await?;

    let migrations = registry.collect_migrations();
    store
        .migrate(&migrations)
        .await
        .with_context(|| "failed to apply migrations")?;
    tracing::info!(count = migrations.len(), engine = store.kind(), "migrations applied");

    registry.start_all(&ctx).await?;
    Ok(registry)
}

/// Run the HTTP server until ctrl-c, then stop every module.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(env = ?settings.environment, "bookshelf bootstrap starting");

    let registry = bootstrap(&settings).await?;
    tracing::info!(
        modules = registry.modules().len(),
        "bookshelf bootstrap complete"
    );

    let served = bookshelf_http::start_server(&registry, &settings, shutdown_signal()).await;
    registry.stop_all().await?;
    served
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => {
            tracing::error!(error = %err, "unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
