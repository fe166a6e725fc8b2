use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::http::{TimedRequest, fetch_with_deadline};
use crate::domain::{AddressRecord, Coordinate};
use crate::error::{ConfigError, GeocodeError};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const USER_AGENT: &str = concat!("whereabouts/", env!("CARGO_PKG_VERSION"));
pub const FIRST_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(8);
pub const RETRY_TIMEOUT: Duration = Duration::from_secs(12);

/// Where reverse-geocoding requests are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodingEndpoint {
    /// Nominatim itself; the contact address is sent as `email`
    Direct { base_url: String, email: String },
    /// A relay that injects the contact address on our behalf
    Proxy { base_url: String },
}

impl GeocodingEndpoint {
    fn base_url(&self) -> &str {
        match self {
            Self::Direct { base_url, .. } | Self::Proxy { base_url } => base_url,
        }
    }

    fn provider(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "Nominatim",
            Self::Proxy { .. } => "Nominatim (via proxy)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeocodingSettings {
    pub endpoint: GeocodingEndpoint,
    pub user_agent: String,
    pub first_timeout: Duration,
    pub retry_timeout: Duration,
}

impl GeocodingSettings {
    pub fn new(endpoint: GeocodingEndpoint) -> Self {
        Self {
            endpoint,
            user_agent: USER_AGENT.to_string(),
            first_timeout: FIRST_ATTEMPT_TIMEOUT,
            retry_timeout: RETRY_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResult {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: HashMap<String, String>,
}

/// Reverse-geocoding client with a single retry
pub struct GeocodingClient {
    client: Client,
    settings: GeocodingSettings,
    reverse_url: Url,
}

impl GeocodingClient {
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the endpoint base URL does not parse.
    pub fn new(client: Client, settings: GeocodingSettings) -> Result<Self, ConfigError> {
        let base = format!("{}/", settings.endpoint.base_url().trim_end_matches('/'));
        let reverse_url = Url::parse(&base)
            .and_then(|url| url.join("reverse"))
            .map_err(|e| ConfigError::Invalid(format!("geocoding base URL '{base}': {e}")))?;

        Ok(Self {
            client,
            settings,
            reverse_url,
        })
    }

    /// Resolve `coordinate` to a postal address.
    ///
    /// The first attempt gets [`GeocodingSettings::first_timeout`]. A timeout,
    /// transport failure or non-2xx status triggers exactly one retry with
    /// [`GeocodingSettings::retry_timeout`]; whatever the retry produces is
    /// returned. Unparseable bodies are not retried.
    pub async fn reverse(&self, coordinate: Coordinate) -> Result<AddressRecord, GeocodeError> {
        match self.attempt(coordinate, self.settings.first_timeout).await {
            Err(err) if is_retriable(&err) => {
                tracing::warn!(
                    error = %err,
                    timeout = ?self.settings.retry_timeout,
                    "reverse geocoding failed, retrying once"
                );
                self.attempt(coordinate, self.settings.retry_timeout).await
            }
            result => result,
        }
    }

    async fn attempt(
        &self,
        coordinate: Coordinate,
        timeout: Duration,
    ) -> Result<AddressRecord, GeocodeError> {
        let request = TimedRequest::get(self.build_url(coordinate), timeout)
            .with_header("accept", "application/json")?
            .with_header("user-agent", &self.settings.user_agent)?;

        let response = fetch_with_deadline(&self.client, request).await?;
        if !response.is_success() {
            return Err(GeocodeError::Http {
                status: response.status,
            });
        }

        let result: ReverseResult = response.json().map_err(GeocodeError::Parse)?;
        Ok(AddressRecord::from_fields(
            self.settings.endpoint.provider(),
            result.display_name,
            &result.address,
        ))
    }

    fn build_url(&self, coordinate: Coordinate) -> Url {
        let mut url = self.reverse_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("format", "jsonv2");
            pairs.append_pair("lat", &coordinate.latitude.to_string());
            pairs.append_pair("lon", &coordinate.longitude.to_string());
            pairs.append_pair("addressdetails", "1");
            pairs.append_pair("zoom", "18");
            if let GeocodingEndpoint::Direct { email, .. } = &self.settings.endpoint
                && !email.is_empty()
            {
                pairs.append_pair("email", email);
            }
        }
        url
    }
}

fn is_retriable(err: &GeocodeError) -> bool {
    match err {
        GeocodeError::Timeout(_) | GeocodeError::Http { .. } | GeocodeError::Transport(_) => true,
        GeocodeError::Parse(_) => false,
    }
}
