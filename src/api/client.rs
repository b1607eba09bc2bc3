use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::envelope::{extract_message, normalize};
use super::{ApiError, AuthToken};

/// Thin JSON client for the marketplace REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &AuthToken,
        collection_keys: &[&str],
    ) -> Result<T, ApiError> {
        let body = self.send(Method::GET, path, token, None::<&()>).await?;
        normalize(body, collection_keys)
    }

    pub async fn get_query<T, Q>(
        &self,
        path: &str,
        token: &AuthToken,
        query: &Q,
        collection_keys: &[&str],
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.request(Method::GET, path, token)?.query(query);
        let body = self.execute(Method::GET, path, request).await?;
        normalize(body, collection_keys)
    }

    pub async fn post<T, B>(&self, path: &str, token: &AuthToken, payload: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = self.send(Method::POST, path, token, Some(payload)).await?;
        normalize(body, &[])
    }

    pub async fn put<T, B>(&self, path: &str, token: &AuthToken, payload: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = self.send(Method::PUT, path, token, Some(payload)).await?;
        normalize(body, &[])
    }

    /// Whether the marketplace answers at all. Any HTTP status counts as reachable.
    pub async fn probe(&self) -> Result<(), ApiError> {
        let url = format!("{}/plans", self.base_url);
        self.http.head(url).send().await?;
        Ok(())
    }

    /// DELETE whose body only matters when it reports failure.
    pub async fn delete(&self, path: &str, token: &AuthToken) -> Result<(), ApiError> {
        let body = self.send(Method::DELETE, path, token, None::<&()>).await?;
        normalize::<Value>(body, &[]).map(|_| ())
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: &AuthToken,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let auth = HeaderValue::from_str(&token.bearer())
            .map_err(|_| ApiError::Unauthorized)?;
        Ok(self.http.request(method, url).header(AUTHORIZATION, auth))
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        token: &AuthToken,
        payload: Option<&B>,
    ) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.request(method.clone(), path, token)?;
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        self.execute(method, path, request).await
    }

    #[instrument(name = "upstream_request", skip(self, request), fields(base = %self.base_url))]
    async fn execute(
        &self,
        method: Method,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        debug!(status = status.as_u16(), "Upstream responded");
        classify(status, body)
    }
}

fn classify(status: StatusCode, body: Value) -> Result<Value, ApiError> {
    match status.as_u16() {
        s if (200..300).contains(&s) => Ok(body),
        401 | 403 => Err(ApiError::Unauthorized),
        402 => Err(ApiError::PaymentRequired {
            message: extract_message(&body),
            details: body,
        }),
        s @ (400 | 409 | 422) => Err(ApiError::Rejected {
            status: s,
            message: extract_message(&body),
        }),
        s => {
            let message = extract_message(&body);
            warn!(status = s, %message, "Upstream request failed");
            Err(ApiError::Status { status: s, message })
        }
    }
}
