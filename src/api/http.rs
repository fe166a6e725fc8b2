//! Deadline-bounded HTTP exchange shared by the service clients.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::FetchError;

/// Everything needed to issue one request
#[derive(Debug, Clone)]
pub struct TimedRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl TimedRequest {
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            timeout,
        }
    }

    pub fn post(url: Url, body: String, timeout: Duration) -> Self {
        Self {
            url,
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Some(body),
            timeout,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Result<Self, FetchError> {
        let value = value
            .parse::<HeaderValue>()
            .map_err(|_| FetchError::InvalidRequest(format!("bad value for header {name}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

/// Status and body of a completed exchange, uninterpreted
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Send `request` and wait for its full response until the deadline passes.
///
/// The deadline covers connecting, headers and the body. When it expires the
/// request future is dropped, which tears down the connection, and
/// [`FetchError::Timeout`] is returned. Non-2xx statuses come back as a
/// normal [`RawResponse`].
pub async fn fetch_with_deadline(
    client: &Client,
    request: TimedRequest,
) -> Result<RawResponse, FetchError> {
    let TimedRequest {
        url,
        method,
        headers,
        body,
        timeout,
    } = request;

    tracing::debug!(%method, %url, ?timeout, "sending request");

    let mut builder = client.request(method, url).headers(headers);
    if let Some(body) = body {
        builder = builder.body(body);
    }

    let exchange = async {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok::<_, reqwest::Error>(RawResponse {
            status,
            body: body.to_vec(),
        })
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(Ok(response)) => {
            tracing::debug!(
                status = %response.status,
                bytes = response.body.len(),
                "response received"
            );
            Ok(response)
        }
        Ok(Err(err)) if err.is_timeout() => Err(FetchError::Timeout(timeout)),
        Ok(Err(err)) => Err(FetchError::Transport(err)),
        Err(_elapsed) => Err(FetchError::Timeout(timeout)),
    }
}
