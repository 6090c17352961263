use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use bookshelf_db::{Book, BookId, BookStore};
use bookshelf_http::{AppError, Envelope};
use serde_json::Value;

use super::models::{self, CreatedBook};

/// Shared handler state: the injected store.
#[derive(Clone)]
pub struct BooksState {
    pub store: Arc<dyn BookStore>,
}

fn parse_id(raw: &str) -> Option<BookId> {
    raw.trim().parse().ok()
}

fn missing_book(id: &str) -> String {
    format!("No book exists for id {id}")
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

pub async fn health_check(State(state): State<BooksState>) -> (StatusCode, &'static str) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "books module is healthy"),
        Err(err) => {
            tracing::warn!(error = %err, "book store ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "book store is unavailable")
        }
    }
}

pub async fn create_book(
    State(state): State<BooksState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope<CreatedBook>, AppError> {
    let new_book = models::parse_new_book(&json_body(body)?)?;
    let book = state.store.insert(new_book).await?;

    tracing::info!(book_id = book.id, name = %book.name, "book created");
    Ok(Envelope::success(201, vec![CreatedBook { book }]))
}

pub async fn list_books(
    State(state): State<BooksState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Envelope<Book>, AppError> {
    let filter = models::parse_filter(&params)?;
    let books = state.store.query(filter.as_ref()).await?;

    tracing::debug!(count = books.len(), filtered = filter.is_some(), "listed books");
    Ok(Envelope::ok(books))
}

pub async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<Envelope<Book>, AppError> {
    let book = match parse_id(&id) {
        Some(id) => state.store.get(id).await?,
        None => None,
    };

    Ok(Envelope::ok(book.into_iter().collect()))
}

pub async fn update_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Envelope<Book>, AppError> {
    let book_id = parse_id(&id).ok_or_else(|| AppError::not_found(missing_book(&id)))?;
    let patch = models::parse_patch(&json_body(body)?)?;

    let revision = state
        .store
        .update(book_id, patch)
        .await?
        .ok_or_else(|| AppError::not_found(missing_book(&id)))?;

    tracing::info!(book_id, previous_name = %revision.before.name, "book updated");
    Ok(Envelope::ok(vec![revision.after]).with_message(format!(
        "The book {} was updated successfully",
        revision.before.name
    )))
}

pub async fn delete_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> Result<Envelope<Book>, AppError> {
    let removed = match parse_id(&id) {
        Some(book_id) => state.store.delete(book_id).await?,
        None => None,
    };

    let message = match removed {
        Some(book) => {
            tracing::info!(book_id = book.id, name = %book.name, "book deleted");
            format!("The book {} was deleted successfully", book.name)
        }
        None => missing_book(&id),
    };

    Ok(Envelope::ok(Vec::new()).with_message(message))
}
