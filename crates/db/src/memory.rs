//! In-process book store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StoreError, UniqueField};
use crate::model::{Book, BookFilter, BookId, BookPatch, NewBook, Revision};
use crate::store::BookStore;

#[derive(Default)]
struct State {
    last_id: BookId,
    books: BTreeMap<BookId, Book>,
}

impl State {
    /// First unique field of `candidate` already held by another book.
    fn collision(&self, candidate: &Book) -> Option<StoreError> {
        self.books
            .values()
            .filter(|book| book.id != candidate.id)
            .find_map(|book| {
                if book.name == candidate.name {
                    Some(StoreError::duplicate(UniqueField::Name, &candidate.name))
                } else if book.isbn == candidate.isbn {
                    Some(StoreError::duplicate(UniqueField::Isbn, &candidate.isbn))
                } else {
                    None
                }
            })
    }
}

/// Books held in a `BTreeMap` behind one async lock; writers are serialized.
#[derive(Default)]
pub struct InMemoryBookStore {
    state: RwLock<State>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
        let mut state = self.state.write().await;

        let book = book.into_book(state.last_id + 1);
        if let Some(err) = state.collision(&book) {
            return Err(err);
        }

        state.last_id = book.id;
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn get(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn query(&self, filter: Option<&BookFilter>) -> Result<Vec<Book>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .filter(|book| filter.map_or(true, |filter| filter.matches(book)))
            .cloned()
            .collect())
    }

    async fn update(&self, id: BookId, patch: BookPatch) -> Result<Option<Revision>, StoreError> {
        let mut state = self.state.write().await;

        let Some(before) = state.books.get(&id).cloned() else {
            return Ok(None);
        };

        let after = patch.apply(&before);
        if let Some(err) = state.collision(&after) {
            return Err(err);
        }

        state.books.insert(id, after.clone());
        Ok(Some(Revision { before, after }))
    }

    async fn delete(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        Ok(self.state.write().await.books.remove(&id))
    }
}
