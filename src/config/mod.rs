use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::nominatim::{self, GeocodingEndpoint, GeocodingSettings};
use crate::api::overpass::{self, PoiSettings};
use crate::error::ConfigError;
use crate::locate::PositionOptions;
use crate::locate::ip::IP_API_URL;
use crate::proxy::ProxySettings;

fn default_true() -> bool {
    true
}
fn default_ip_url() -> String {
    IP_API_URL.to_string()
}
fn default_locate_timeout_ms() -> u64 {
    12_000
}
fn default_nominatim_url() -> String {
    nominatim::NOMINATIM_URL.to_string()
}
fn default_user_agent() -> String {
    nominatim::USER_AGENT.to_string()
}
fn default_first_timeout_ms() -> u64 {
    8_000
}
fn default_retry_timeout_ms() -> u64 {
    12_000
}
fn default_overpass_url() -> String {
    overpass::OVERPASS_URL.to_string()
}
fn default_radius() -> u32 {
    overpass::DEFAULT_RADIUS_M
}
fn default_limit() -> usize {
    overpass::DEFAULT_LIMIT
}
fn default_tags() -> Vec<String> {
    overpass::DEFAULT_TAGS.iter().map(|t| t.to_string()).collect()
}
fn default_poi_timeout_ms() -> u64 {
    15_000
}
fn default_server_timeout_secs() -> u32 {
    25
}
fn default_max_candidates() -> u32 {
    50
}
fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}
fn default_proxy_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    /// Fixed position; skips platform geolocation when both are set
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub locate: LocateConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub poi: PoiConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocateConfig {
    #[serde(default = "default_true")]
    pub ip_lookup: bool,
    #[serde(default = "default_ip_url")]
    pub ip_url: String,
    #[serde(default = "default_locate_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            ip_lookup: default_true(),
            ip_url: default_ip_url(),
            timeout_ms: default_locate_timeout_ms(),
        }
    }
}

impl LocateConfig {
    pub fn options(&self) -> PositionOptions {
        PositionOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            ..PositionOptions::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocodingConfig {
    #[serde(default = "default_nominatim_url")]
    pub base_url: String,
    /// When set, requests go to this relay instead of `base_url`
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// Contact address Nominatim asks direct callers to send
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_first_timeout_ms")]
    pub first_timeout_ms: u64,
    #[serde(default = "default_retry_timeout_ms")]
    pub retry_timeout_ms: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_nominatim_url(),
            proxy_url: None,
            email: String::new(),
            user_agent: default_user_agent(),
            first_timeout_ms: default_first_timeout_ms(),
            retry_timeout_ms: default_retry_timeout_ms(),
        }
    }
}

impl GeocodingConfig {
    pub fn settings(&self) -> GeocodingSettings {
        let endpoint = match &self.proxy_url {
            Some(proxy) => GeocodingEndpoint::Proxy {
                base_url: proxy.clone(),
            },
            None => GeocodingEndpoint::Direct {
                base_url: self.base_url.clone(),
                email: self.email.clone(),
            },
        };

        GeocodingSettings {
            endpoint,
            user_agent: self.user_agent.clone(),
            first_timeout: Duration::from_millis(self.first_timeout_ms),
            retry_timeout: Duration::from_millis(self.retry_timeout_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_overpass_url")]
    pub url: String,
    #[serde(default = "default_radius")]
    pub radius_m: u32,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
    #[serde(default = "default_poi_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_server_timeout_secs")]
    pub server_timeout_secs: u32,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: u32,
}

impl Default for PoiConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            url: default_overpass_url(),
            radius_m: default_radius(),
            limit: default_limit(),
            tags: default_tags(),
            timeout_ms: default_poi_timeout_ms(),
            server_timeout_secs: default_server_timeout_secs(),
            max_candidates: default_max_candidates(),
        }
    }
}

impl PoiConfig {
    pub fn settings(&self, user_agent: &str) -> Result<PoiSettings, ConfigError> {
        if self.tags.is_empty() {
            return Err(ConfigError::Invalid(
                "poi.tags must name at least one tag".to_string(),
            ));
        }

        Ok(PoiSettings {
            url: self.url.clone(),
            radius_m: self.radius_m,
            limit: self.limit,
            tags: self.tags.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            server_timeout_secs: self.server_timeout_secs,
            max_candidates: self.max_candidates,
            user_agent: user_agent.to_string(),
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_nominatim_url")]
    pub upstream: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_proxy_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            upstream: default_nominatim_url(),
            email: String::new(),
            user_agent: None,
            timeout_ms: default_proxy_timeout_ms(),
        }
    }
}

impl ProxyConfig {
    pub fn settings(&self) -> Result<ProxySettings, ConfigError> {
        if self.email.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "proxy.email is required: Nominatim's usage policy asks for a contact address"
                    .to_string(),
            ));
        }

        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("whereabouts-proxy ({})", self.email));

        Ok(ProxySettings {
            upstream: self.upstream.clone(),
            email: self.email.clone(),
            user_agent,
            timeout: Duration::from_millis(self.timeout_ms),
        })
    }
}

impl FileConfig {
    /// First config file that exists in the standard locations.
    pub fn find() -> Option<PathBuf> {
        first_existing(get_config_paths())
    }

    /// Load an explicitly named config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("whereabouts.toml"));
    paths.push(PathBuf::from(".whereabouts.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("whereabouts").join("config.toml"));
        paths.push(config_dir.join("whereabouts.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".whereabouts.toml"));
        paths.push(home.join(".config").join("whereabouts").join("config.toml"));
    }

    paths
}

fn first_existing(paths: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    paths.into_iter().find(|path| path.exists())
}
