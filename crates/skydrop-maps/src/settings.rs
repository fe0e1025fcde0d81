//! Map widget configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default Google geocoding endpoint.
pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Default Google directions endpoint.
pub const DEFAULT_DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Which map backend the widget uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapProviderKind {
    /// Static image, no network calls.
    #[default]
    Static,
    /// Google Maps web services.
    Google,
}

impl std::fmt::Display for MapProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Google => write!(f, "google"),
        }
    }
}

/// Settings for the delivery map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// Backend to use.
    pub provider: MapProviderKind,
    /// API credential for the live provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Image shown by the static fallback.
    pub static_image: String,
    /// Geocoding endpoint.
    pub geocode_url: String,
    /// Directions endpoint.
    pub directions_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            provider: MapProviderKind::Static,
            api_key: None,
            static_image: "maps.jpg".to_string(),
            geocode_url: DEFAULT_GEOCODE_URL.to_string(),
            directions_url: DEFAULT_DIRECTIONS_URL.to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl MapSettings {
    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The API key, if one is set and non-blank.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
