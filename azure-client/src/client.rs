use crate::metrics_defs::{UPSTREAM_DURATION, UPSTREAM_REQUESTS};
use http::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

/// Response header carrying the pagination cursor for list endpoints.
pub const CONTINUATION_TOKEN_HEADER: &str = "x-ms-continuationtoken";

// Upstream error bodies can be whole HTML pages.
const MAX_REASON_LEN: usize = 512;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned {status}: {reason}")]
    Status {
        url: String,
        status: StatusCode,
        reason: String,
    },
    #[error("could not parse response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// One page of a paginated list endpoint.
#[derive(Debug)]
pub struct Page<T> {
    pub body: T,
    pub continuation_token: Option<String>,
}

/// Authenticated client for the Azure DevOps REST API.
///
/// Every request uses basic auth with an empty username and the personal
/// access token as password. Non-2xx responses are returned as
/// `ClientError::Status`; there are no retries.
#[derive(Clone)]
pub struct DevOpsClient {
    client: reqwest::Client,
    token: Arc<str>,
}

impl DevOpsClient {
    pub fn new(token: impl Into<String>) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(DevOpsClient {
            client,
            token: Arc::from(token.into()),
        })
    }

    pub async fn get_json<T>(&self, endpoint: &str, url: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let url = parse_url(url)?;
        let response = self.send(endpoint, self.client.get(url.clone())).await?;
        decode(&url, response).await
    }

    pub async fn get_json_with_query<T, Q>(
        &self,
        endpoint: &str,
        url: &str,
        query: &Q,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = parse_url(url)?;
        let response = self
            .send(endpoint, self.client.get(url.clone()).query(query))
            .await?;
        decode(&url, response).await
    }

    /// GET one page of a list endpoint, returning the continuation token the
    /// upstream sent back, if any.
    pub async fn get_page<T, Q>(
        &self,
        endpoint: &str,
        url: &str,
        query: &Q,
    ) -> Result<Page<T>, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = parse_url(url)?;
        let response = self
            .send(endpoint, self.client.get(url.clone()).query(query))
            .await?;

        let continuation_token = response
            .headers()
            .get(CONTINUATION_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(String::from);

        let body = decode(&url, response).await?;
        Ok(Page {
            body,
            continuation_token,
        })
    }

    pub async fn post_json<T, B>(&self, endpoint: &str, url: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = parse_url(url)?;
        let response = self
            .send(endpoint, self.client.post(url.clone()).json(body))
            .await?;
        decode(&url, response).await
    }

    async fn send(
        &self,
        endpoint: &str,
        builder: RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let start = Instant::now();
        let result = builder
            .basic_auth("", Some(self.token.as_ref()))
            .send()
            .await;
        histogram!(UPSTREAM_DURATION, "endpoint" => endpoint.to_string())
            .record(start.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(source) => {
                counter!(UPSTREAM_REQUESTS, "endpoint" => endpoint.to_string(), "outcome" => "error")
                    .increment(1);
                let url = source.url().map(|u| u.to_string()).unwrap_or_default();
                tracing::warn!(endpoint, error = %source, "Upstream request failed");
                return Err(ClientError::Request { url, source });
            }
        };

        let status = response.status();
        if !status.is_success() {
            counter!(UPSTREAM_REQUESTS, "endpoint" => endpoint.to_string(), "outcome" => "status")
                .increment(1);
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            let reason = failure_reason(status, &body);
            tracing::warn!(endpoint, %url, status = status.as_u16(), "Upstream returned an error");
            return Err(ClientError::Status {
                url,
                status,
                reason,
            });
        }

        counter!(UPSTREAM_REQUESTS, "endpoint" => endpoint.to_string(), "outcome" => "ok")
            .increment(1);
        tracing::debug!(endpoint, url = %response.url(), "Upstream request succeeded");
        Ok(response)
    }
}

fn parse_url(url: &str) -> Result<Url, ClientError> {
    // Hand-edited template files sometimes carry stray whitespace.
    let url = url.trim();
    Url::parse(url).map_err(|e| ClientError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

async fn decode<T: DeserializeOwned>(url: &Url, response: reqwest::Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await.map_err(|source| ClientError::Request {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}

fn failure_reason(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();
    }

    // Azure DevOps error payloads carry a human readable "message" field.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }

    body.chars().take(MAX_REASON_LEN).collect()
}
