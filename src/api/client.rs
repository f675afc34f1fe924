//! HTTP client for the back-office REST API

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::auth::{EnvToken, NoAuth, TokenSource};
use super::error::ApiError;
use crate::config::ApiConfig;

/// List payload: either paginated (`{"count": n, "results": [...]}`) or a bare array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Paginated {
        results: Vec<T>,
        #[serde(default)]
        count: Option<u64>,
    },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListEnvelope::Paginated { results, .. } => results,
            ListEnvelope::Bare(items) => items,
        }
    }
}

/// Back-office API client
///
/// Cheap to clone; clones share the connection pool and token source.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    auth: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        auth: Arc<dyn TokenSource>,
    ) -> Result<Self, ApiError> {
        if base_url.trim().is_empty() {
            return Err(ApiError::not_configured("api.base_url"));
        }
        let http = Client::builder()
            .user_agent(concat!("backoffice/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            http,
            auth,
        })
    }

    /// Build from config; an empty `token_env` disables authentication
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let auth: Arc<dyn TokenSource> = if config.token_env.is_empty() {
            Arc::new(NoAuth)
        } else {
            Arc::new(EnvToken::new(&config.token_env))
        };
        Self::new(&config.base_url, config.timeout(), auth)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .header("Accept", "application/json");
        match self.auth.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and return the raw body of a successful response
    async fn execute(
        &self,
        method: Method,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<String, ApiError> {
        debug!("{} {}", method, path);

        let response = builder.send().await.map_err(|e| {
            warn!("{} {} failed: {}", method, path, e);
            ApiError::network(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        if status.is_success() {
            Ok(body)
        } else {
            warn!("{} {} returned {}", method, path, status.as_u16());
            Err(ApiError::from_response(status.as_u16(), path, &body))
        }
    }

    fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
        serde_json::from_str(body).map_err(|e| ApiError::decode(path, e.to_string()))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self
            .execute(Method::GET, path, self.request(Method::GET, path))
            .await?;
        Self::decode(path, &body)
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::GET, path).query(query);
        let body = self.execute(Method::GET, path, builder).await?;
        Self::decode(path, &body)
    }

    /// GET a collection, unwrapping either list envelope
    pub async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ApiError> {
        let envelope: ListEnvelope<T> = self.get_with_query(path, query).await?;
        Ok(envelope.into_items())
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).json(body);
        let body = self.execute(Method::POST, path, builder).await?;
        Self::decode(path, &body)
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path).json(body);
        let body = self.execute(Method::PUT, path, builder).await?;
        Self::decode(path, &body)
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PATCH, path).json(body);
        let body = self.execute(Method::PATCH, path, builder).await?;
        Self::decode(path, &body)
    }

    /// POST to a detail action (`.../{id}/activar/`); an empty reply reads as null
    pub async fn post_action<B>(&self, path: &str, body: &B) -> Result<serde_json::Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, path).json(body);
        let body = self.execute(Method::POST, path, builder).await?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Self::decode(path, &body)
    }

    /// DELETE; the response body (usually empty, 204) is ignored
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Method::DELETE, path, self.request(Method::DELETE, path))
            .await?;
        Ok(())
    }
}
