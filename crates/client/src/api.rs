//! HTTP access to the catalog API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use mousedeck_core::{Mouse, MouseId, MousePatch, NewMouse};

use crate::error::ApiError;

/// The subset of the catalog API the sync engine needs.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// `true` when the backend answers at all.
    async fn probe(&self) -> bool;
    async fn list_mice(&self) -> Result<Vec<Mouse>, ApiError>;
    async fn create_mouse(&self, new: &NewMouse) -> Result<Mouse, ApiError>;
    async fn update_mouse(&self, id: MouseId, patch: &MousePatch) -> Result<Mouse, ApiError>;
    async fn delete_mouse(&self, id: MouseId) -> Result<(), ApiError>;
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpCatalogApi {
    api_url: String,
    client: Client,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

impl HttpCatalogApi {
    /// `api_url` is the server origin, e.g. `http://localhost:5002`.
    pub fn new(api_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Transient(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.api_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        Err(classify(status, body))
    }
}

fn classify(status: StatusCode, body: ErrorBody) -> ApiError {
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound;
    }
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        return ApiError::Transient(format!("server answered {status}"));
    }

    let errors = if body.errors.is_empty() {
        body.message.into_iter().collect()
    } else {
        body.errors
    };
    ApiError::Rejected {
        status: status.as_u16(),
        errors,
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    response
        .json()
        .await
        .map_err(|e| ApiError::Transient(format!("failed to decode response: {e}")))
}

#[async_trait]
impl CatalogApi for HttpCatalogApi {
    async fn probe(&self) -> bool {
        match self
            .client
            .head(self.url("/mice"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "backend probe failed");
                false
            }
        }
    }

    async fn list_mice(&self) -> Result<Vec<Mouse>, ApiError> {
        let response = self.send(self.client.get(self.url("/mice"))).await?;
        decode(response).await
    }

    async fn create_mouse(&self, new: &NewMouse) -> Result<Mouse, ApiError> {
        let response = self
            .send(self.client.post(self.url("/mice")).json(new))
            .await?;
        decode(response).await
    }

    async fn update_mouse(&self, id: MouseId, patch: &MousePatch) -> Result<Mouse, ApiError> {
        let response = self
            .send(self.client.patch(self.url(&format!("/mice/{id}"))).json(patch))
            .await?;
        decode(response).await
    }

    async fn delete_mouse(&self, id: MouseId) -> Result<(), ApiError> {
        self.send(self.client.delete(self.url(&format!("/mice/{id}"))))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_classified_for_retry() {
        assert_eq!(classify(StatusCode::NOT_FOUND, ErrorBody::default()), ApiError::NotFound);
        assert!(classify(StatusCode::BAD_GATEWAY, ErrorBody::default()).is_transient());
        assert!(classify(StatusCode::TOO_MANY_REQUESTS, ErrorBody::default()).is_transient());

        let rejected = classify(
            StatusCode::BAD_REQUEST,
            ErrorBody {
                message: Some("Validation failed".into()),
                errors: vec!["price must be a positive number".into()],
            },
        );
        assert_eq!(
            rejected,
            ApiError::Rejected {
                status: 400,
                errors: vec!["price must be a positive number".into()],
            }
        );

        let conflict = classify(
            StatusCode::CONFLICT,
            ErrorBody { message: Some("already exists".into()), errors: vec![] },
        );
        assert!(!conflict.is_transient());
    }

    #[test]
    fn urls_are_rooted_under_api() {
        let api = HttpCatalogApi::new("http://localhost:5002/").unwrap();
        assert_eq!(api.url("/mice/3"), "http://localhost:5002/api/mice/3");
    }

    #[tokio::test]
    async fn unreachable_backend_is_transient() {
        // Port 9 (discard) is closed on test hosts.
        let api = HttpCatalogApi::new("http://127.0.0.1:9").unwrap();
        assert!(!api.probe().await);
        assert!(api.list_mice().await.unwrap_err().is_transient());
    }

    async fn serve(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn probe_requires_a_success_status() {
        use axum::routing::get;

        let missing = serve(axum::Router::new().route("/elsewhere", get(|| async { "ok" }))).await;
        let api = HttpCatalogApi::new(&missing).unwrap();
        assert!(!api.probe().await);

        let forbidden = serve(
            axum::Router::new().route("/api/mice", get(|| async { StatusCode::FORBIDDEN })),
        )
        .await;
        assert!(!HttpCatalogApi::new(&forbidden).unwrap().probe().await);

        let healthy =
            serve(axum::Router::new().route("/api/mice", get(|| async { "[]" }))).await;
        assert!(HttpCatalogApi::new(&healthy).unwrap().probe().await);
    }
}
