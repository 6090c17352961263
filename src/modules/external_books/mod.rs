pub mod client;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use bookshelf_http::{AppError, Envelope};
use bookshelf_kernel::{settings::Settings, InitCtx, Module};
use serde::Deserialize;
use serde_json::json;

pub use client::{CatalogClient, CatalogError, ExternalBook};

pub const MISSING_NAME_MESSAGE: &str = "Please provide book name in URL parameters.";

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub name: Option<String>,
}

/// Look `name` up in the remote catalog and shape the envelope.
///
/// A non-200 provider answer is a failure envelope carrying the provider's
/// status; transport problems surface as `AppError`.
pub async fn lookup_by_name(
    client: &CatalogClient,
    name: Option<&str>,
) -> Result<Envelope<ExternalBook>, AppError> {
    let name = name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::validation(MISSING_NAME_MESSAGE))?;

    let response = client.search_by_name(name).await?;

    Ok(if response.status == 200 {
        Envelope::success(response.status, response.books)
    } else {
        Envelope::failure(response.status)
    })
}

async fn lookup_books(
    State(client): State<Arc<CatalogClient>>,
    Query(params): Query<LookupParams>,
) -> Result<Envelope<ExternalBook>, AppError> {
    lookup_by_name(&client, params.name.as_deref()).await
}

/// Pass-through lookup against the remote book-metadata provider.
pub struct ExternalBooksModule {
    client: Arc<CatalogClient>,
}

impl ExternalBooksModule {
    pub fn new(client: CatalogClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl Module for ExternalBooksModule {
    fn name(&self) -> &'static str {
        "external-books"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            provider = self.client.base_url(),
            deadline_ms = self.client.deadline().as_millis() as u64,
            "external books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(lookup_books))
            .with_state(self.client.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Look books up by name in the external catalog",
                        "tags": ["External books"],
                        "parameters": [
                            { "name": "name", "in": "query", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "`status_code` mirrors the provider; 400 without a name, 503 when unreachable",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Envelope" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "ExternalBook": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "nullable": true },
                            "isbn": { "type": "string", "nullable": true },
                            "authors": { "type": "array", "items": { "type": "string" }, "nullable": true },
                            "number_of_pages": { "type": "integer", "nullable": true },
                            "publisher": { "type": "string", "nullable": true },
                            "country": { "type": "string", "nullable": true },
                            "release_date": { "type": "string", "nullable": true }
                        }
                    }
                }
            }
        }))
    }
}

/// Create the external books module; lookups are bounded by the server's request budget
pub fn create_module(settings: &Settings) -> anyhow::Result<Arc<dyn Module>> {
    let client = CatalogClient::new(&settings.catalog, settings.lookup_deadline())
        .with_context(|| "failed to build catalog client")?;
    Ok(Arc::new(ExternalBooksModule::new(client)))
}

#[cfg(test)]
mod tests {
    use super::client::tests::{client_for, closed_address, spawn_provider};
    use super::*;
    use axum::body::Body;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get_json(router: Router, uri: &str) -> Value {
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn router_for(base_url: String) -> Router {
        ExternalBooksModule::new(client_for(base_url)).routes()
    }

    #[tokio::test]
    async fn lookup_by_name_returns_mapped_books() {
        let addr = spawn_provider().await;
        let router = router_for(format!("http://{addr}/api/books"));

        let body = get_json(router, "/?name=A%20Game%20of%20Thrones").await;

        assert_eq!(body["status"], "success");
        assert_eq!(body["status_code"], 200);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["name"], "A Game of Thrones");
        assert_eq!(body["data"][0]["number_of_pages"], 694);
        assert!(body["data"][0].get("url").is_none());
    }

    #[tokio::test]
    async fn missing_or_empty_name_is_rejected() {
        let router = router_for("http://127.0.0.1:9/".to_string());

        for uri in ["/", "/?name="] {
            let body = get_json(router.clone(), uri).await;
            assert_eq!(body["status"], "failure");
            assert_eq!(body["status_code"], 400);
            assert_eq!(body["message"], MISSING_NAME_MESSAGE);
            assert_eq!(body["data"], serde_json::json!([]));
        }
    }

    #[tokio::test]
    async fn provider_error_status_is_passed_through() {
        let addr = spawn_provider().await;
        let router = router_for(format!("http://{addr}/broken"));

        let body = get_json(router, "/?name=anything").await;
        assert_eq!(body["status"], "failure");
        assert_eq!(body["status_code"], 500);
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn unreachable_provider_is_remote_unavailable() {
        let addr = closed_address().await;
        let router = router_for(format!("http://{addr}/api/books"));

        let body = get_json(router, "/?name=anything").await;
        assert_eq!(body["status"], "failure");
        assert_eq!(body["status_code"], 503);
        assert!(body["message"].as_str().unwrap().contains("unreachable"));
    }

    #[tokio::test]
    async fn garbled_provider_body_is_bad_gateway() {
        let addr = spawn_provider().await;
        let router = router_for(format!("http://{addr}/garbled"));

        let body = get_json(router, "/?name=anything").await;
        assert_eq!(body["status_code"], 502);
    }
}
