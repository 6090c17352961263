pub mod books;
pub mod external_books;

use std::sync::Arc;

use bookshelf_db::BookStore;
use bookshelf_kernel::{settings::Settings, ModuleRegistry};

/// Register the `db` core module and the catalog modules over `store`
pub fn register_all(
    registry: &mut ModuleRegistry,
    settings: &Settings,
    store: Arc<dyn BookStore>,
) -> anyhow::Result<()> {
    registry.register_core(bookshelf_db::create_module(store.clone()));
    registry.register_custom(books::create_module(store));
    registry.register_custom(external_books::create_module(settings)?);
    Ok(())
}
