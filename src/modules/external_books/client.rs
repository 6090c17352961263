//! HTTP client for the remote book-metadata provider.

use std::time::Duration;

use bookshelf_http::AppError;
use bookshelf_kernel::settings::{CatalogSettings, CATALOG_RETRY_BACKOFF_MS};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const RETRY_BACKOFF: Duration = Duration::from_millis(CATALOG_RETRY_BACKOFF_MS);

/// One provider entry, reduced to the local summary shape.
///
/// Values are passed through as the provider typed them; missing keys become
/// null. The provider's `numberOfPages` and `released` keys are accepted
/// alongside the snake_case names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalBook {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub isbn: Option<Value>,
    #[serde(default)]
    pub authors: Option<Value>,
    #[serde(default, alias = "numberOfPages")]
    pub number_of_pages: Option<Value>,
    #[serde(default)]
    pub publisher: Option<Value>,
    #[serde(default)]
    pub country: Option<Value>,
    #[serde(default, alias = "released")]
    pub release_date: Option<Value>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to build catalog client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("book catalog is unreachable: {0}")]
    Unavailable(#[source] reqwest::Error),

    #[error("book catalog returned an unreadable body: {0}")]
    InvalidPayload(#[source] reqwest::Error),

    #[error("book catalog did not answer within {} ms", .0.as_millis())]
    DeadlineExceeded(Duration),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unavailable(_) | CatalogError::DeadlineExceeded(_) => {
                AppError::remote_unavailable(err.to_string())
            }
            CatalogError::InvalidPayload(_) => AppError::bad_gateway(err.to_string()),
            CatalogError::Client(_) => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}

/// What the provider answered: its status and, on 200, the mapped entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogResponse {
    pub status: u16,
    pub books: Vec<ExternalBook>,
}

pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
    deadline: Duration,
}

impl CatalogClient {
    /// `deadline` bounds a whole lookup, retries and body read included.
    pub fn new(settings: &CatalogSettings, deadline: Duration) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .user_agent(concat!("bookshelf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(CatalogError::Client)?;

        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            max_retries: settings.max_retries,
            deadline,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Look books up by name. Non-200 answers are returned, not raised.
    pub async fn search_by_name(&self, name: &str) -> Result<CatalogResponse, CatalogError> {
        match tokio::time::timeout(self.deadline, self.search(name)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    deadline_ms = self.deadline.as_millis() as u64,
                    name,
                    "book catalog lookup ran out of time"
                );
                Err(CatalogError::DeadlineExceeded(self.deadline))
            }
        }
    }

    async fn search(&self, name: &str) -> Result<CatalogResponse, CatalogError> {
        let response = self.send(name).await?;
        let status = response.status();

        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), name, "book catalog answered with an error");
            return Ok(CatalogResponse {
                status: status.as_u16(),
                books: Vec::new(),
            });
        }

        let books: Vec<ExternalBook> = response
            .json()
            .await
            .map_err(CatalogError::InvalidPayload)?;

        tracing::debug!(count = books.len(), name, "book catalog lookup complete");
        Ok(CatalogResponse {
            status: status.as_u16(),
            books,
        })
    }

    /// Transport failures are retried `max_retries` times with linear backoff.
    async fn send(&self, name: &str) -> Result<reqwest::Response, CatalogError> {
        let mut attempt = 0;
        loop {
            let result = self
                .http
                .get(&self.base_url)
                .query(&[("name", name)])
                .send()
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(err) if attempt < self.max_retries && is_transient(&err) => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %err, "book catalog request failed; retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) => return Err(CatalogError::Unavailable(err)),
            }
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::net::SocketAddr;

    /// Stand-in for the remote provider.
    pub(crate) async fn spawn_provider() -> SocketAddr {
        async fn books(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
            match params.get("name").map(String::as_str) {
                Some("A Game of Thrones") => Json(json!([{
                    "url": "https://www.anapioficeandfire.com/api/books/1",
                    "name": "A Game of Thrones",
                    "isbn": "978-0553103540",
                    "authors": ["George R. R. Martin"],
                    "numberOfPages": 694,
                    "publisher": "Bantam Books",
                    "country": "United States",
                    "mediaType": "Hardcover",
                    "released": "1996-08-01T00:00:00"
                }])),
                Some("Partial") => Json(json!([{ "name": "Partial" }])),
                Some("Loose") => Json(json!([{
                    "name": "Loose",
                    "isbn": 9780553103540_u64,
                    "authors": "a",
                    "numberOfPages": "694"
                }])),
                _ => Json(json!([])),
            }
        }

        let app = Router::new()
            .route("/api/books", get(books))
            .route(
                "/broken",
                get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/garbled", get(|| async { "this is not json" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!([]))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    pub(crate) fn client_for(base_url: String) -> CatalogClient {
        CatalogClient::new(
            &CatalogSettings {
                base_url,
                timeout_ms: 500,
                max_retries: 0,
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    /// An address nothing listens on.
    pub(crate) async fn closed_address() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    #[tokio::test]
    async fn maps_provider_entries() {
        let addr = spawn_provider().await;
        let client = client_for(format!("http://{addr}/api/books"));

        let response = client.search_by_name("A Game of Thrones").await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(
            response.books,
            vec![ExternalBook {
                name: Some(json!("A Game of Thrones")),
                isbn: Some(json!("978-0553103540")),
                authors: Some(json!(["George R. R. Martin"])),
                number_of_pages: Some(json!(694)),
                publisher: Some(json!("Bantam Books")),
                country: Some(json!("United States")),
                release_date: Some(json!("1996-08-01T00:00:00")),
            }]
        );
    }

    #[tokio::test]
    async fn missing_fields_become_none() {
        let addr = spawn_provider().await;
        let client = client_for(format!("http://{addr}/api/books"));

        let response = client.search_by_name("Partial").await.unwrap();
        assert_eq!(
            response.books,
            vec![ExternalBook {
                name: Some(json!("Partial")),
                ..ExternalBook::default()
            }]
        );

        let serialized = serde_json::to_value(&response.books[0]).unwrap();
        assert_eq!(serialized["isbn"], Value::Null);
        assert_eq!(serialized["number_of_pages"], Value::Null);
    }

    #[tokio::test]
    async fn unexpected_value_types_pass_through() {
        let addr = spawn_provider().await;
        let client = client_for(format!("http://{addr}/api/books"));

        let response = client.search_by_name("Loose").await.unwrap();
        assert_eq!(response.status, 200);

        let book = &response.books[0];
        assert_eq!(book.isbn, Some(json!(9780553103540_u64)));
        assert_eq!(book.authors, Some(json!("a")));
        assert_eq!(book.number_of_pages, Some(json!("694")));
        assert_eq!(book.country, None);
    }

    #[tokio::test]
    async fn non_200_is_reported_with_status() {
        let addr = spawn_provider().await;
        let client = client_for(format!("http://{addr}/broken"));

        let response = client.search_by_name("anything").await.unwrap();
        assert_eq!(response.status, 500);
        assert!(response.books.is_empty());
    }

    #[tokio::test]
    async fn unparseable_body_is_invalid_payload() {
        let addr = spawn_provider().await;
        let client = client_for(format!("http://{addr}/garbled"));

        let err = client.search_by_name("anything").await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_unavailable_after_retries() {
        let addr = closed_address().await;
        let client = CatalogClient::new(
            &CatalogSettings {
                base_url: format!("http://{addr}/api/books"),
                timeout_ms: 500,
                max_retries: 2,
            },
            Duration::from_secs(5),
        )
        .unwrap();

        let err = client.search_by_name("anything").await.unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable(_)));
    }

    #[tokio::test]
    async fn retries_stop_at_the_deadline() {
        let addr = spawn_provider().await;
        let client = CatalogClient::new(
            &CatalogSettings {
                base_url: format!("http://{addr}/slow"),
                timeout_ms: 500,
                max_retries: 2,
            },
            Duration::from_millis(800),
        )
        .unwrap();

        let started = std::time::Instant::now();
        let err = client.search_by_name("anything").await.unwrap_err();

        assert!(matches!(err, CatalogError::DeadlineExceeded(_)));
        assert!(started.elapsed() < Duration::from_millis(1500));
        let app_error: AppError = err.into();
        assert_eq!(app_error.status_code(), 503);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let addr = spawn_provider().await;
        let client = client_for(format!("http://{addr}/slow"));

        let err = client.search_by_name("anything").await.unwrap_err();
        match err {
            CatalogError::Unavailable(source) => assert!(source.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_provider_maps_to_503() {
        let addr = closed_address().await;
        let err = client_for(format!("http://{addr}/"))
            .search_by_name("x")
            .await
            .unwrap_err();

        let app_error: AppError = err.into();
        assert_eq!(app_error.status_code(), 503);
    }
}
