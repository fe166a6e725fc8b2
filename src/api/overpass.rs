use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::http::{TimedRequest, fetch_with_deadline};
use crate::domain::{Coordinate, PointOfInterest};
use crate::error::{ConfigError, PoiError};

pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_RADIUS_M: u32 = 600;
pub const DEFAULT_LIMIT: usize = 5;
pub const DEFAULT_TAGS: &[&str] = &["amenity", "shop", "tourism", "leisure"];
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Raw Overpass API response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// A single element from Overpass
#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// Knobs for the nearby search
///
/// The tag list and the result cap are policy, not protocol, so both are
/// exposed here rather than baked into the query.
#[derive(Debug, Clone)]
pub struct PoiSettings {
    pub url: String,
    pub radius_m: u32,
    pub limit: usize,
    pub tags: Vec<String>,
    pub timeout: Duration,
    /// `[timeout:N]` passed to the Overpass server
    pub server_timeout_secs: u32,
    /// `out N` cap on candidates returned by the server
    pub max_candidates: u32,
    pub user_agent: String,
}

impl Default for PoiSettings {
    fn default() -> Self {
        Self {
            url: OVERPASS_URL.to_string(),
            radius_m: DEFAULT_RADIUS_M,
            limit: DEFAULT_LIMIT,
            tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            timeout: REQUEST_TIMEOUT,
            server_timeout_secs: 25,
            max_candidates: 50,
            user_agent: super::nominatim::USER_AGENT.to_string(),
        }
    }
}

/// Build the Overpass QL payload for tagged nodes around `origin`
///
/// One `node(around:...)` clause per tag, unioned, e.g. for two tags:
/// ```text
/// [out:json][timeout:25];
/// (
///   node(around:600,31.2304,121.4737)["amenity"];
///   node(around:600,31.2304,121.4737)["shop"];
/// );
/// out 50;
/// ```
pub fn build_query(origin: Coordinate, settings: &PoiSettings) -> String {
    let around = format!(
        "around:{},{},{}",
        settings.radius_m, origin.latitude, origin.longitude
    );
    let clauses: String = settings
        .tags
        .iter()
        .map(|tag| format!("  node({around})[\"{tag}\"];\n"))
        .collect();

    format!(
        "[out:json][timeout:{timeout}];\n(\n{clauses});\nout {max};",
        timeout = settings.server_timeout_secs,
        max = settings.max_candidates,
    )
}

/// Turn raw elements into the nearest named points
///
/// # Algorithm
/// 1. Keep nodes that have a non-empty `name` tag and both coordinates
/// 2. Measure distance from `origin`
/// 3. Stable sort by distance so equal distances keep server order
/// 4. Truncate to `limit` and round distances to whole meters
pub fn rank_points(
    response: OverpassResponse,
    origin: Coordinate,
    tags: &[String],
    limit: usize,
) -> Vec<PointOfInterest> {
    let mut candidates: Vec<(f64, PointOfInterest)> = response
        .elements
        .into_iter()
        .filter(|e| e.type_ == "node")
        .filter_map(|e| {
            let lat = e.lat?;
            let lon = e.lon?;
            let tags_map = e.tags?;
            let name = tags_map.get("name").filter(|n| !n.is_empty())?.clone();
            let category = tags
                .iter()
                .find_map(|tag| tags_map.get(tag).filter(|v| !v.is_empty()))
                .cloned();

            let distance = origin.distance_to(&Coordinate::new(lat, lon));
            Some((
                distance,
                PointOfInterest {
                    name,
                    category,
                    lat,
                    lon,
                    distance_m: 0,
                },
            ))
        })
        .collect();

    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    candidates
        .into_iter()
        .take(limit)
        .map(|(distance, mut poi)| {
            poi.distance_m = distance.round() as u64;
            poi
        })
        .collect()
}

/// Nearby points-of-interest client (single attempt, no retry)
pub struct PoiClient {
    client: Client,
    settings: PoiSettings,
    url: Url,
}

impl PoiClient {
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the service URL does not parse.
    pub fn new(client: Client, settings: PoiSettings) -> Result<Self, ConfigError> {
        let url = Url::parse(&settings.url)
            .map_err(|e| ConfigError::Invalid(format!("POI service URL '{}': {e}", settings.url)))?;

        Ok(Self {
            client,
            settings,
            url,
        })
    }

    pub fn settings(&self) -> &PoiSettings {
        &self.settings
    }

    /// Fetch the nearest named points around `origin` within the configured radius
    pub async fn nearby(&self, origin: Coordinate) -> Result<Vec<PointOfInterest>, PoiError> {
        let query = build_query(origin, &self.settings);
        let request = TimedRequest::post(self.url.clone(), query, self.settings.timeout)
            .with_header("content-type", "text/plain;charset=UTF-8")?
            .with_header("user-agent", &self.settings.user_agent)?;

        let response = fetch_with_deadline(&self.client, request).await?;
        if !response.is_success() {
            return Err(PoiError::Http {
                status: response.status,
            });
        }

        let parsed: OverpassResponse = response.json().map_err(PoiError::Parse)?;
        tracing::debug!(elements = parsed.elements.len(), "Overpass elements received");

        Ok(rank_points(
            parsed,
            origin,
            &self.settings.tags,
            self.settings.limit,
        ))
    }
}
