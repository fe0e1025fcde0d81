//! The delivery map widget.
//!
//! A [`DeliveryMap`] is built once from [`MapSettings`] and loaded with the
//! pickup and drop-off addresses of a booking. Loading either yields a
//! complete [`MapView`] or an error; markers are never returned for only
//! one of the two endpoints.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{MapError, Result};
use crate::google::GoogleMapsProvider;
use crate::provider::{Coordinates, MapProvider};
use crate::settings::{MapProviderKind, MapSettings};

/// What a marker represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Sender location.
    Pickup,
    /// Receiver location.
    Dropoff,
    /// Current drone position.
    Drone,
}

/// A point plotted on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Marker {
    /// What the marker represents.
    pub kind: MarkerKind,
    /// Where it sits.
    pub position: Coordinates,
}

/// A fully loaded map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapView {
    /// Live map with both endpoints, the route and the drone.
    Live {
        /// Pickup marker.
        pickup: Marker,
        /// Drop-off marker.
        dropoff: Marker,
        /// Drone marker at the route midpoint.
        drone: Marker,
        /// Route path from pickup to drop-off.
        path: Vec<Coordinates>,
    },
    /// Static fallback image.
    Static {
        /// Image reference.
        image: String,
    },
}

impl MapView {
    /// All markers on the map, empty for the static image.
    #[must_use]
    pub fn markers(&self) -> Vec<Marker> {
        match self {
            Self::Live {
                pickup,
                dropoff,
                drone,
                ..
            } => vec![*pickup, *dropoff, *drone],
            Self::Static { .. } => Vec::new(),
        }
    }
}

/// Observable state of a map load.
#[derive(Debug, Clone, PartialEq)]
pub enum MapState {
    /// Load in progress.
    Loading,
    /// Map ready to render.
    Loaded(MapView),
    /// Load failed; the message is shown inline instead of the map.
    Failed {
        /// Inline error message.
        message: String,
    },
}

impl MapState {
    /// Check if the load has finished, successfully or not.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Loading)
    }
}

impl From<Result<MapView>> for MapState {
    fn from(result: Result<MapView>) -> Self {
        match result {
            Ok(view) => Self::Loaded(view),
            Err(err) => Self::Failed {
                message: err.user_message().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
enum Source {
    Live(Arc<dyn MapProvider>),
    Static { image: String },
    Unavailable { reason: String },
}

/// Map widget plotting a delivery between two addresses.
#[derive(Debug, Clone)]
pub struct DeliveryMap {
    source: Source,
}

impl DeliveryMap {
    /// Build the widget from settings.
    ///
    /// Configuration problems are not reported here; they surface as a
    /// [`MapError::NotConfigured`] when the map is loaded.
    #[must_use]
    pub fn from_settings(settings: &MapSettings) -> Self {
        let source = match settings.provider {
            MapProviderKind::Static => Source::Static {
                image: settings.static_image.clone(),
            },
            MapProviderKind::Google => match GoogleMapsProvider::from_settings(settings) {
                Ok(provider) => Source::Live(Arc::new(provider)),
                Err(err) => {
                    warn!(error = %err, "Live map unavailable");
                    Source::Unavailable {
                        reason: err.to_string(),
                    }
                }
            },
        };
        Self { source }
    }

    /// Build a live widget over a specific provider.
    #[must_use]
    pub fn with_provider(provider: Arc<dyn MapProvider>) -> Self {
        Self {
            source: Source::Live(provider),
        }
    }

    /// Build a static-image widget.
    #[must_use]
    pub fn fallback(image: impl Into<String>) -> Self {
        Self {
            source: Source::Static {
                image: image.into(),
            },
        }
    }

    /// Check if this widget performs network calls.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self.source, Source::Live(_))
    }

    /// Load the map for a pickup and drop-off address.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NotConfigured`] when the live provider has no
    /// credential, [`MapError::AddressNotFound`] when either address does
    /// not resolve, or the provider's error otherwise.
    pub async fn load(&self, pickup: &str, dropoff: &str) -> Result<MapView> {
        match &self.source {
            Source::Static { image } => {
                debug!("Using static map image {}", image);
                Ok(MapView::Static {
                    image: image.clone(),
                })
            }
            Source::Unavailable { reason } => Err(MapError::not_configured(reason.clone())),
            Source::Live(provider) => load_live(provider.as_ref(), pickup, dropoff).await,
        }
    }
}

async fn load_live(provider: &dyn MapProvider, pickup: &str, dropoff: &str) -> Result<MapView> {
    let from = provider.geocode(pickup).await?;
    let to = provider.geocode(dropoff).await?;
    let (Some(from), Some(to)) = (from, to) else {
        warn!(provider = provider.name(), "Could not geocode delivery addresses");
        return Err(MapError::AddressNotFound);
    };

    let mut path = provider.route(from, to).await?;
    if path.is_empty() {
        debug!("No route found, using a straight flight path");
        path = vec![from, to];
    }

    let drone = path_midpoint(&path).unwrap_or_else(|| from.midpoint(&to));
    info!(provider = provider.name(), points = path.len(), "Delivery map loaded");

    Ok(MapView::Live {
        pickup: Marker {
            kind: MarkerKind::Pickup,
            position: from,
        },
        dropoff: Marker {
            kind: MarkerKind::Dropoff,
            position: to,
        },
        drone: Marker {
            kind: MarkerKind::Drone,
            position: drone,
        },
        path,
    })
}

/// Midpoint of a path by point count.
///
/// For an even number of points the two middle points are averaged.
#[must_use]
pub fn path_midpoint(path: &[Coordinates]) -> Option<Coordinates> {
    let mid = path.len() / 2;
    match path.len() {
        0 => None,
        n if n % 2 == 1 => Some(path[mid]),
        _ => Some(path[mid - 1].midpoint(&path[mid])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct FakeProvider {
        places: HashMap<String, Coordinates>,
        route: Vec<Coordinates>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn with_places(places: &[(&str, Coordinates)]) -> Self {
            Self {
                places: places
                    .iter()
                    .map(|(name, c)| ((*name).to_string(), *c))
                    .collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl MapProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn geocode(&self, address: &str) -> Result<Option<Coordinates>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.places.get(address).copied())
        }

        async fn route(&self, _from: Coordinates, _to: Coordinates) -> Result<Vec<Coordinates>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.route.clone())
        }
    }

    const L1: Coordinates = Coordinates::new(12.0, 77.0);
    const L2: Coordinates = Coordinates::new(13.0, 78.0);

    #[tokio::test]
    async fn test_static_fallback_skips_network() {
        let map = DeliveryMap::fallback("maps.jpg");
        assert!(!map.is_live());

        let view = map.load("anywhere", "nowhere").await.unwrap();
        assert_eq!(
            view,
            MapView::Static {
                image: "maps.jpg".to_string()
            }
        );
        assert!(view.markers().is_empty());
    }

    #[tokio::test]
    async fn test_live_map_places_three_markers() {
        let mut provider = FakeProvider::with_places(&[("L1", L1), ("L2", L2)]);
        provider.route = vec![L1, Coordinates::new(12.5, 77.5), L2];
        let map = DeliveryMap::with_provider(Arc::new(provider));

        let view = map.load("L1", "L2").await.unwrap();
        let markers = view.markers();
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].position, L1);
        assert_eq!(markers[1].position, L2);
        assert_eq!(markers[2].kind, MarkerKind::Drone);
        assert_eq!(markers[2].position, Coordinates::new(12.5, 77.5));
    }

    #[tokio::test]
    async fn test_unresolvable_address_has_no_markers() {
        let provider = Arc::new(FakeProvider::with_places(&[("L1", L1)]));
        let map = DeliveryMap::with_provider(provider.clone());

        let result = map.load("L1", "Atlantis").await;
        let state = MapState::from(result);
        assert_eq!(
            state,
            MapState::Failed {
                message: "Could not find one or more addresses".to_string()
            }
        );
        // Two geocode calls, no route request.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unresolvable_pickup() {
        let map = DeliveryMap::with_provider(Arc::new(FakeProvider::with_places(&[("L2", L2)])));
        let err = map.load("Atlantis", "L2").await.unwrap_err();
        assert!(err.is_address_not_found());
    }

    #[tokio::test]
    async fn test_missing_route_uses_straight_path() {
        let map = DeliveryMap::with_provider(Arc::new(FakeProvider::with_places(&[
            ("L1", L1),
            ("L2", L2),
        ])));

        let MapView::Live { path, drone, .. } = map.load("L1", "L2").await.unwrap() else {
            panic!("expected live map");
        };
        assert_eq!(path, vec![L1, L2]);
        assert_eq!(drone.position, Coordinates::new(12.5, 77.5));
    }

    #[tokio::test]
    async fn test_google_without_key_reports_not_configured() {
        let settings = MapSettings {
            provider: MapProviderKind::Google,
            ..MapSettings::default()
        };
        let map = DeliveryMap::from_settings(&settings);
        assert!(!map.is_live());

        let state = MapState::from(map.load("L1", "L2").await);
        assert_eq!(
            state,
            MapState::Failed {
                message: "Map service is not configured".to_string()
            }
        );
    }

    #[test]
    fn test_path_midpoint() {
        assert_eq!(path_midpoint(&[]), None);
        assert_eq!(path_midpoint(&[L1]), Some(L1));
        assert_eq!(path_midpoint(&[L1, L2]), Some(L1.midpoint(&L2)));
    }

    #[test]
    fn test_map_state_settled() {
        assert!(!MapState::Loading.is_settled());
        assert!(MapState::Failed {
            message: String::new()
        }
        .is_settled());
    }
}
