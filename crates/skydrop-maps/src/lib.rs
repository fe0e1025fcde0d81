//! `skydrop-maps` - map widget for delivery tracking
//!
//! Resolves the pickup and drop-off addresses of a booking to coordinates,
//! fetches a route between them and places a drone marker at the route
//! midpoint. When no live provider is configured the widget falls back to a
//! static image and never touches the network.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod error;
pub mod google;
pub mod provider;
pub mod settings;
pub mod widget;

pub use error::{MapError, Result};
pub use google::GoogleMapsProvider;
pub use provider::{Coordinates, MapProvider};
pub use settings::{MapProviderKind, MapSettings};
pub use widget::{DeliveryMap, MapState, MapView, Marker, MarkerKind};
