//! Database client for the Realtime Database REST API.
//!
//! Every node is addressed as `{base}{path}.json`. Requests carry the
//! client's bearer token and are retried with exponential back-off when the
//! transport fails. HTTP error statuses are returned without retrying.

use std::time::Duration;

use reqwest::{Client, Method, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::Credentials;
use crate::backoff::RetryPolicy;

use super::{ApiError, NodePath};

/// Body returned by a POST, naming the generated child key.
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// Database client bound to one database URL.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct DatabaseClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
    retry_policy: RetryPolicy,
}

impl DatabaseClient {
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self {
            client,
            base_url,
            credentials,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy used for I/O failures.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Read the value stored at `path`. Absent nodes read as `None`.
    pub async fn fetch(&self, path: &NodePath) -> Result<Option<Value>, ApiError> {
        let response = self.send(Method::GET, path, None).await?;
        let value: Value = Self::parse_json(response).await?;
        Ok(match value {
            Value::Null => None,
            value => Some(value),
        })
    }

    /// Overwrite the node at `path` with `value`.
    pub async fn set(&self, path: &NodePath, value: &Value) -> Result<(), ApiError> {
        self.send(Method::PUT, path, Some(value)).await?;
        Ok(())
    }

    /// Merge the children of `value` into the node at `path`.
    pub async fn update(&self, path: &NodePath, value: &Value) -> Result<(), ApiError> {
        if !value.is_object() {
            return Err(ApiError::InvalidRequest(
                "update value must be a JSON object".to_string(),
            ));
        }
        self.send(Method::PATCH, path, Some(value)).await?;
        Ok(())
    }

    /// Append `value` under `path` with a generated key and return that key.
    pub async fn push(&self, path: &NodePath, value: &Value) -> Result<String, ApiError> {
        let response = self.send(Method::POST, path, Some(value)).await?;
        let pushed: PushResponse = Self::parse_json(response).await?;
        debug!(path = %path, key = %pushed.name, "Pushed child node");
        Ok(pushed.name)
    }

    /// Remove the node at `path`.
    pub async fn delete(&self, path: &NodePath) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// URL of the REST resource for `path`.
    pub fn resource_url(&self, path: &NodePath) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty();
            match path.segments().split_last() {
                Some((last, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{last}.json"));
                }
                None => {
                    segments.push(".json");
                }
            }
        }
        Ok(url)
    }

    /// Send a request, retrying transport failures per the retry policy.
    async fn send(
        &self,
        method: Method,
        path: &NodePath,
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        let url = self.resource_url(path)?;
        let mut backoff = self.retry_policy.start();
        let mut retries = 0;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .bearer_auth(self.credentials.bearer_token());
            if let Some(body) = body {
                request = request.json(body);
            }

            let error = match request.send().await {
                Ok(response) => return Self::check_response(response).await,
                Err(error) => error,
            };

            if !is_io_failure(&error) || retries >= self.retry_policy.max_retries {
                return Err(error.into());
            }
            let Some(delay) = backoff.next_backoff() else {
                return Err(error.into());
            };

            retries += 1;
            warn!(
                method = %method,
                url = %url,
                retry = retries,
                backoff_ms = delay.as_millis() as u64,
                error = %error,
                "Request failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let url = response.url().clone();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {url}: {e}"))
        })
    }
}

/// Failures below HTTP: connecting, timing out, or the connection dropping
/// mid-request.
fn is_io_failure(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request() || error.is_body()
}
