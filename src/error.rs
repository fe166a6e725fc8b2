use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single deadline-bounded HTTP exchange.
///
/// HTTP status codes are not errors at this layer; callers inspect
/// [`crate::api::http::RawResponse::status`] themselves.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No complete response arrived before the deadline. The in-flight
    /// request was dropped, which closes its connection.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Network, TLS or protocol failure from the underlying client.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request description itself could not be turned into a request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors returned by the reverse-geocoding client.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("geocoding service returned HTTP {status}")]
    Http { status: StatusCode },

    #[error("geocoding transport error: {0}")]
    Transport(#[source] FetchError),

    /// The body was not the JSON shape Nominatim answers with.
    #[error("failed to parse geocoding response: {0}")]
    Parse(#[source] serde_json::Error),
}

impl From<FetchError> for GeocodeError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout(after) => Self::Timeout(after),
            other => Self::Transport(other),
        }
    }
}

/// Errors returned by the points-of-interest client.
#[derive(Debug, Error)]
pub enum PoiError {
    #[error("POI request timed out after {0:?}")]
    Timeout(Duration),

    #[error("POI service returned HTTP {status}")]
    Http { status: StatusCode },

    #[error("POI transport error: {0}")]
    Transport(#[source] FetchError),

    #[error("failed to parse POI response: {0}")]
    Parse(#[source] serde_json::Error),
}

impl From<FetchError> for PoiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout(after) => Self::Timeout(after),
            other => Self::Transport(other),
        }
    }
}

/// Why a position could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    /// There is no location facility to ask.
    #[error("geolocation is not supported on this platform")]
    Unsupported,

    /// The facility answered with an error, or never answered at all.
    #[error("{0}")]
    Failed(String),
}

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
