//! PostgreSQL book store backed by a `sqlx` connection pool.

use std::time::Duration;

use async_trait::async_trait;
use bookshelf_kernel::{settings::DatabaseSettings, Migration};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::{StoreError, UniqueField};
use crate::model::{Book, BookFilter, BookId, BookPatch, NewBook, Revision};
use crate::store::BookStore;

const BOOK_COLUMNS: &str =
    "id, name, isbn, authors, country, number_of_pages, publisher, release_date";

pub struct PgBookStore {
    pool: PgPool,
}

impl PgBookStore {
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
            .connect(&settings.url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate unique-index violations into `ConstraintViolation`.
fn map_write_error(err: sqlx::Error, candidate_name: &str, candidate_isbn: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            return if constraint.contains("isbn") {
                StoreError::duplicate(UniqueField::Isbn, candidate_isbn)
            } else {
                StoreError::duplicate(UniqueField::Name, candidate_name)
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl BookStore for PgBookStore {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
        let sql = format!(
            "INSERT INTO books (name, isbn, authors, country, number_of_pages, publisher, release_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {BOOK_COLUMNS}"
        );

        sqlx::query_as::<_, Book>(&sql)
            .bind(&book.name)
            .bind(&book.isbn)
            .bind(&book.authors)
            .bind(&book.country)
            .bind(book.number_of_pages)
            .bind(&book.publisher)
            .bind(book.release_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_write_error(err, &book.name, &book.isbn))
    }

    async fn get(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");
        Ok(sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn query(&self, filter: Option<&BookFilter>) -> Result<Vec<Book>, StoreError> {
        let books = match filter {
            None => {
                let sql = format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY id");
                sqlx::query_as::<_, Book>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(filter) => {
                let sql = format!(
                    "SELECT {BOOK_COLUMNS} FROM books \
                     WHERE name = $1 AND country = $2 AND publisher = $3 \
                     AND EXTRACT(YEAR FROM release_date)::INTEGER = $4 \
                     ORDER BY id"
                );
                sqlx::query_as::<_, Book>(&sql)
                    .bind(&filter.name)
                    .bind(&filter.country)
                    .bind(&filter.publisher)
                    .bind(filter.release_year)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(books)
    }

    async fn update(&self, id: BookId, patch: BookPatch) -> Result<Option<Revision>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let select = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 FOR UPDATE");
        let Some(before) = sqlx::query_as::<_, Book>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let merged = patch.apply(&before);
        let update = format!(
            "UPDATE books SET name = $2, isbn = $3, country = $4, number_of_pages = $5, \
             publisher = $6, release_date = $7 WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        );
        let after = sqlx::query_as::<_, Book>(&update)
            .bind(id)
            .bind(&merged.name)
            .bind(&merged.isbn)
            .bind(&merged.country)
            .bind(merged.number_of_pages)
            .bind(&merged.publisher)
            .bind(merged.release_date)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| map_write_error(err, &merged.name, &merged.isbn))?;

        tx.commit().await?;
        Ok(Some(Revision { before, after }))
    }

    async fn delete(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        let sql = format!("DELETE FROM books WHERE id = $1 RETURNING {BOOK_COLUMNS}");
        Ok(sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn migrate(&self, migrations: &[(String, Migration)]) -> Result<(), StoreError> {
        for (module, migration) in migrations {
            tracing::info!(module = %module, migration = migration.id, "applying migration");
            sqlx::raw_sql(migration.up).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
