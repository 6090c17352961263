pub mod handlers;
pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookshelf_db::BookStore;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use handlers::BooksState;

/// The local book catalog: create, list, filter, fetch, update, delete.
pub struct BooksModule {
    store: Arc<dyn BookStore>,
}

impl BooksModule {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            engine = self.store.kind(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(handlers::list_books).post(handlers::create_book))
            .route("/health", get(handlers::health_check))
            .route(
                "/{id}",
                get(handlers::get_book)
                    .patch(handlers::update_book)
                    .delete(handlers::delete_book),
            )
            .with_state(BooksState {
                store: self.store.clone(),
            })
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let envelope = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Envelope" }
                    }
                }
            })
        };
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer" }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books, optionally filtered by name, country, publisher and release year",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "name", "in": "query", "schema": { "type": "string" } },
                            { "name": "country", "in": "query", "schema": { "type": "string" } },
                            { "name": "publisher", "in": "query", "schema": { "type": "string" } },
                            { "name": "release_date", "in": "query", "schema": { "type": "integer" } }
                        ],
                        "responses": { "200": envelope("Books in `data`") }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateBook" }
                                }
                            }
                        },
                        "responses": { "200": envelope("`status_code` 201 with `data: [{book}]`") }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Fetch a book; `data` is empty when it does not exist",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "responses": { "200": envelope("Zero or one book") }
                    },
                    "patch": {
                        "summary": "Update the supplied fields of a book",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/UpdateBook" }
                                }
                            }
                        },
                        "responses": { "200": envelope("Updated book and message") }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": { "200": envelope("Message only") }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": { "description": "OK" },
                            "503": { "description": "Book store unavailable" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "name": { "type": "string", "maxLength": 200 },
                            "isbn": { "type": "string", "maxLength": 80 },
                            "authors": { "type": "array", "items": { "type": "string" } },
                            "country": { "type": "string", "maxLength": 80 },
                            "number_of_pages": { "type": "integer" },
                            "publisher": { "type": "string", "maxLength": 80 },
                            "release_date": { "type": "string", "format": "date" }
                        },
                        "required": ["id", "name", "isbn", "authors", "country",
                                     "number_of_pages", "publisher", "release_date"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "isbn": { "type": "string" },
                            "authors": { "type": "array", "items": { "type": "string" } },
                            "country": { "type": "string" },
                            "number_of_pages": { "type": "integer" },
                            "publisher": { "type": "string" },
                            "release_date": { "type": "string", "format": "date" }
                        },
                        "required": ["name", "isbn", "authors", "country",
                                     "number_of_pages", "publisher", "release_date"]
                    },
                    "UpdateBook": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "isbn": { "type": "string" },
                            "country": { "type": "string" },
                            "number_of_pages": { "type": "integer" },
                            "publisher": { "type": "string" },
                            "release_date": { "type": "string", "format": "date" }
                        }
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id              BIGSERIAL PRIMARY KEY,
                    name            VARCHAR(200) NOT NULL UNIQUE,
                    isbn            VARCHAR(80)  NOT NULL UNIQUE,
                    authors         TEXT[]       NOT NULL,
                    country         VARCHAR(80)  NOT NULL,
                    number_of_pages INTEGER      NOT NULL,
                    publisher       VARCHAR(80)  NOT NULL,
                    release_date    DATE         NOT NULL
                );
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module over `store`
pub fn create_module(store: Arc<dyn BookStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}
