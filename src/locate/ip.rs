use reqwest::{Client, Url};
use serde::Deserialize;

use super::{LocationPlatform, OnPosition, OnPositionError, PositionOptions};
use crate::api::http::{TimedRequest, fetch_with_deadline};
use crate::domain::{Coordinate, PositionSample};

pub const IP_API_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";

/// IP geolocation is city-level at best
const IP_ACCURACY_M: f64 = 5_000.0;

#[derive(Debug, Deserialize)]
struct IpApiAnswer {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

/// Approximates the position from the public IP address via an
/// ip-api compatible endpoint. Never caches, so every request is fresh.
#[derive(Debug, Clone)]
pub struct IpPlatform {
    client: Client,
    url: Url,
}

impl IpPlatform {
    pub fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    async fn locate(
        client: Client,
        url: Url,
        options: PositionOptions,
    ) -> Result<PositionSample, String> {
        tracing::debug!(
            %url,
            high_accuracy = options.enable_high_accuracy,
            "requesting IP geolocation"
        );

        let request = TimedRequest::get(url, options.timeout);
        let response = fetch_with_deadline(&client, request)
            .await
            .map_err(|e| format!("IP geolocation unavailable: {e}"))?;
        if !response.is_success() {
            return Err(format!("IP geolocation returned HTTP {}", response.status));
        }

        let answer: IpApiAnswer = response
            .json()
            .map_err(|e| format!("unreadable IP geolocation answer: {e}"))?;
        sample_from_answer(answer)
    }
}

fn sample_from_answer(answer: IpApiAnswer) -> Result<PositionSample, String> {
    if answer.status != "success" {
        return Err(answer
            .message
            .unwrap_or_else(|| format!("IP geolocation status '{}'", answer.status)));
    }

    match (answer.lat, answer.lon) {
        (Some(lat), Some(lon)) => Ok(PositionSample::at(Coordinate::new(lat, lon), IP_ACCURACY_M)),
        _ => Err("IP geolocation answer has no coordinates".to_string()),
    }
}

impl LocationPlatform for IpPlatform {
    fn get_current_position(
        &self,
        on_position: OnPosition,
        on_error: OnPositionError,
        options: &PositionOptions,
    ) {
        let client = self.client.clone();
        let url = self.url.clone();
        let options = *options;

        tokio::spawn(async move {
            match Self::locate(client, url, options).await {
                Ok(sample) => on_position(sample),
                Err(reason) => on_error(reason),
            }
        });
    }
}
