//! REST client for the catalog HTTP endpoints.

use reqwest::header::USER_AGENT;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::models::{CatalogCreator, CatalogModel, CatalogTag, ModelVersion, SearchPage};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Base URL of the catalog API.
pub const BASE_URL: &str = "https://civitai.com/api/v1";

/// Client identifier sent with every request.
pub const CLIENT_IDENTIFIER: &str = "CivitaiLink:Automatic1111";

/// Maximum number of hashes the batch-lookup endpoint accepts per call.
/// Larger payloads are rejected upstream, so the client refuses them locally.
pub const MAX_HASH_BATCH: usize = 100;

const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_SORT: &str = "Most Downloaded";
const DEFAULT_PERIOD: &str = "AllTime";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the catalog client.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The catalog returned a non-2xx status code.
    #[error("Catalog API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for diagnostics.
        body: String,
    },

    /// The request was rejected before leaving the client.
    #[error("Validation failed: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Search query
// ---------------------------------------------------------------------------

/// Parameters for the paginated model search endpoint.
#[derive(Debug, Clone)]
pub struct ModelSearchQuery {
    pub query: Option<String>,
    pub creator: Option<String>,
    pub tag: Option<String>,
    pub model_type: Option<String>,
    pub sort: String,
    pub period: String,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ModelSearchQuery {
    fn default() -> Self {
        Self {
            query: None,
            creator: None,
            tag: None,
            model_type: None,
            sort: DEFAULT_SORT.to_string(),
            period: DEFAULT_PERIOD.to_string(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ModelSearchQuery {
    /// Render the query as URL parameters, omitting unset filters.
    fn as_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(query) = &self.query {
            params.push(("query", query.clone()));
        }
        if let Some(creator) = &self.creator {
            params.push(("username", creator.clone()));
        }
        if let Some(tag) = &self.tag {
            params.push(("tag", tag.clone()));
        }
        if let Some(model_type) = &self.model_type {
            params.push(("type", model_type.clone()));
        }
        params.push(("sort", self.sort.clone()));
        params.push(("period", self.period.clone()));
        params.push(("page", self.page.to_string()));
        params.push(("pageSize", self.page_size.to_string()));
        params
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the remote model catalog.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CatalogClient {
    /// Create a client against the production catalog.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(BASE_URL.to_string(), api_key)
    }

    /// Create a client against an arbitrary base URL. Tests point this at a
    /// local server.
    pub fn with_base_url(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Look up model versions for up to [`MAX_HASH_BATCH`] file hashes.
    ///
    /// Sends `POST /model-versions/by-hash` with the hashes as a JSON
    /// array. Hashes with no upstream match are simply absent from the
    /// response; the reconciliation engine owns chunking and caching.
    pub async fn versions_by_hash(
        &self,
        hashes: &[String],
    ) -> Result<Vec<ModelVersion>, CatalogError> {
        if hashes.len() > MAX_HASH_BATCH {
            return Err(CatalogError::Validation(format!(
                "Hash batch of {} exceeds the upstream limit of {MAX_HASH_BATCH}",
                hashes.len()
            )));
        }

        tracing::debug!(batch = hashes.len(), "Looking up model versions by hash");
        let response = self
            .request(Method::POST, "/model-versions/by-hash")
            .json(&hashes)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Fetch a single model version by its id (`GET /model-versions/{id}`).
    pub async fn version(&self, id: i64) -> Result<ModelVersion, CatalogError> {
        let response = self
            .request(Method::GET, &format!("/model-versions/{id}"))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Fetch a single model version by file hash
    /// (`GET /model-versions/by-hash/{hash}`).
    pub async fn version_by_hash(&self, hash: &str) -> Result<ModelVersion, CatalogError> {
        let response = self
            .request(Method::GET, &format!("/model-versions/by-hash/{hash}"))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Search catalog models (`GET /models`).
    pub async fn search_models(
        &self,
        query: &ModelSearchQuery,
    ) -> Result<SearchPage<CatalogModel>, CatalogError> {
        let response = self
            .request(Method::GET, "/models")
            .query(&query.as_params())
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Search creators (`GET /creators`).
    pub async fn search_creators(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchPage<CatalogCreator>, CatalogError> {
        let response = self
            .request(Method::GET, "/creators")
            .query(&[
                ("query", query.to_string()),
                ("page", page.to_string()),
                ("pageSize", page_size.to_string()),
            ])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Search tags (`GET /tags`).
    pub async fn search_tags(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchPage<CatalogTag>, CatalogError> {
        let response = self
            .request(Method::GET, "/tags")
            .query(&[
                ("query", query.to_string()),
                ("page", page.to_string()),
                ("pageSize", page_size.to_string()),
            ])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Build a request with the fixed client identifier and, when an API
    /// key is configured, a bearer authorization header.
    fn request(&self, method: Method, endpoint: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{endpoint}", self.base_url))
            .header(USER_AGENT, CLIENT_IDENTIFIER);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`CatalogError::Api`] containing the
    /// status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CatalogError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CatalogError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
