//! Google Maps web services provider.

use serde::Deserialize;
use tracing::debug;

use crate::error::{MapError, Result};
use crate::provider::{Coordinates, MapProvider};
use crate::settings::MapSettings;

const STATUS_OK: &str = "OK";
const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";

/// Decimal places encoded in overview polylines.
const POLYLINE_PRECISION: u32 = 5;

/// Geocoding and directions over the Google Maps HTTP APIs.
#[derive(Debug, Clone)]
pub struct GoogleMapsProvider {
    client: reqwest::Client,
    api_key: String,
    geocode_url: String,
    directions_url: String,
}

impl GoogleMapsProvider {
    /// Build a provider from settings.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NotConfigured`] if no API key is set, or an HTTP
    /// error if the client cannot be built.
    pub fn from_settings(settings: &MapSettings) -> Result<Self> {
        let api_key = settings
            .api_key()
            .ok_or_else(|| MapError::not_configured("no maps api key set"))?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_key,
            geocode_url: settings.geocode_url.clone(),
            directions_url: settings.directions_url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl MapProvider for GoogleMapsProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    #[tracing::instrument(skip(self, address), err)]
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>> {
        let response: GeocodeResponse = self
            .client
            .get(&self.geocode_url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_coordinates()
    }

    #[tracing::instrument(skip(self), err)]
    async fn route(&self, from: Coordinates, to: Coordinates) -> Result<Vec<Coordinates>> {
        let origin = from.to_string();
        let destination = to.to_string();
        let response: DirectionsResponse = self
            .client
            .get(&self.directions_url)
            .query(&[
                ("origin", origin.as_str()),
                ("destination", destination.as_str()),
                ("mode", "driving"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_path()
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinates,
}

impl GeocodeResponse {
    fn into_coordinates(self) -> Result<Option<Coordinates>> {
        match self.status.as_str() {
            STATUS_OK => Ok(self.results.into_iter().next().map(|r| r.geometry.location)),
            STATUS_ZERO_RESULTS => {
                debug!("Geocoder returned no results");
                Ok(None)
            }
            _ => Err(MapError::Provider {
                status: self.status,
                message: self.error_message.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Route {
    overview_polyline: EncodedPolyline,
}

#[derive(Debug, Deserialize)]
struct EncodedPolyline {
    points: String,
}

impl DirectionsResponse {
    fn into_path(self) -> Result<Vec<Coordinates>> {
        match self.status.as_str() {
            STATUS_OK => match self.routes.into_iter().next() {
                Some(route) => decode_route(&route.overview_polyline.points),
                None => Ok(Vec::new()),
            },
            STATUS_ZERO_RESULTS => Ok(Vec::new()),
            _ => Err(MapError::Provider {
                status: self.status,
                message: self.error_message.unwrap_or_default(),
            }),
        }
    }
}

fn decode_route(encoded: &str) -> Result<Vec<Coordinates>> {
    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map_err(|e| MapError::InvalidPolyline {
            reason: e.to_string(),
        })?;
    Ok(line
        .into_iter()
        .map(|point| Coordinates::new(point.y, point.x))
        .collect())
}
