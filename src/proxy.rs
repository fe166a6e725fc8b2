//! Attribution-injecting relay in front of Nominatim's `/reverse`.
//!
//! Browsers and other clients that cannot set a contact address call the
//! relay instead; it forwards their query with `format` and `email` forced to
//! the values the upstream usage policy requires, and hands the upstream
//! answer back with an open CORS header. One route, no state beyond the
//! shared HTTP client.

use axum::{
    Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::any,
};
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;

pub const REVERSE_PATH: &str = "/reverse";

#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Upstream base, e.g. `https://nominatim.openstreetmap.org`
    pub upstream: String,
    /// Contact address sent as `email` on every request
    pub email: String,
    pub user_agent: String,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct ProxyState {
    client: Client,
    reverse_url: Arc<Url>,
    email: Arc<str>,
    user_agent: Arc<str>,
}

impl ProxyState {
    /// # Errors
    /// Returns [`ConfigError`] if the upstream URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(settings: &ProxySettings) -> Result<Self, ConfigError> {
        let base = format!("{}/", settings.upstream.trim_end_matches('/'));
        let reverse_url = Url::parse(&base)
            .and_then(|url| url.join("reverse"))
            .map_err(|e| ConfigError::Invalid(format!("proxy upstream '{base}': {e}")))?;

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            reverse_url: Arc::new(reverse_url),
            email: Arc::from(settings.email.as_str()),
            user_agent: Arc::from(settings.user_agent.as_str()),
        })
    }

    /// Upstream URL for an incoming query: caller parameters first, with a
    /// repeated key keeping its last value, then the forced ones.
    fn upstream_url(&self, incoming: Vec<(String, String)>) -> Url {
        let mut params: Vec<(String, String)> = Vec::with_capacity(incoming.len() + 2);
        for (key, value) in incoming {
            set_param(&mut params, key, value);
        }
        set_param(&mut params, "format".to_string(), "jsonv2".to_string());
        set_param(&mut params, "email".to_string(), self.email.to_string());

        let mut url = (*self.reverse_url).clone();
        url.query_pairs_mut().extend_pairs(params);
        url
    }
}

fn set_param(params: &mut Vec<(String, String)>, key: String, value: String) {
    match params.iter_mut().find(|(k, _)| *k == key) {
        Some(existing) => existing.1 = value,
        None => params.push((key, value)),
    }
}

/// Any method on `/reverse` is relayed as an upstream GET; every other path
/// is a plain 404.
pub fn build_router(state: ProxyState) -> Router {
    Router::new()
        .route(REVERSE_PATH, any(reverse))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

async fn reverse(
    State(state): State<ProxyState>,
    Query(incoming): Query<Vec<(String, String)>>,
) -> Response {
    let target = state.upstream_url(incoming);
    tracing::debug!(url = %target, "forwarding reverse lookup");

    let upstream = state
        .client
        .get(target)
        .header(reqwest::header::ACCEPT, "application/json")
        .header(reqwest::header::USER_AGENT, &*state.user_agent)
        .send()
        .await;

    match upstream {
        Ok(res) => {
            let status = res.status();
            tracing::info!(%status, "upstream answered");
            relay_response(status, Body::from_stream(res.bytes_stream()))
        }
        Err(err) => {
            tracing::warn!(error = %err, "upstream request failed");
            let body = serde_json::json!({ "error": "upstream unavailable" }).to_string();
            relay_response(StatusCode::BAD_GATEWAY, Body::from(body))
        }
    }
}

fn relay_response(status: StatusCode, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}
