use async_trait::async_trait;
use bookshelf_kernel::Migration;

use crate::error::StoreError;
use crate::model::{Book, BookFilter, BookId, BookPatch, NewBook, Revision};

/// Query interface over persisted books.
///
/// Implementations must keep `name` and `isbn` unique and apply every write
/// atomically with respect to readers.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Short engine label for logs
    fn kind(&self) -> &'static str;

    /// Persist a new book and return it with its assigned id
    async fn insert(&self, book: NewBook) -> Result<Book, StoreError>;

    async fn get(&self, id: BookId) -> Result<Option<Book>, StoreError>;

    /// All books ordered by id, or the ones matching `filter`
    async fn query(&self, filter: Option<&BookFilter>) -> Result<Vec<Book>, StoreError>;

    /// Apply `patch` to an existing book; `None` when the id is unknown
    async fn update(&self, id: BookId, patch: BookPatch) -> Result<Option<Revision>, StoreError>;

    /// Remove a book, returning it if it existed
    async fn delete(&self, id: BookId) -> Result<Option<Book>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Apply module schema statements; engines without a schema ignore them
    async fn migrate(&self, _migrations: &[(String, Migration)]) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {}
}
