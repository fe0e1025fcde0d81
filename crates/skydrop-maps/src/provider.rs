//! Provider abstraction for geocoding and routing.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl Coordinates {
    /// Create a coordinate pair.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Point halfway between `self` and `other`.
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new((self.lat + other.lat) / 2.0, (self.lng + other.lng) / 2.0)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

/// A live geocoding and routing backend.
#[async_trait::async_trait]
pub trait MapProvider: Send + Sync + std::fmt::Debug {
    /// Name of the provider (for logging).
    fn name(&self) -> &'static str;

    /// Resolve a free-text address.
    ///
    /// Returns `Ok(None)` when the provider found no match.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>>;

    /// Fetch the route path between two points.
    ///
    /// An empty path means no route was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    async fn route(&self, from: Coordinates, to: Coordinates) -> Result<Vec<Coordinates>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint() {
        let a = Coordinates::new(10.0, 20.0);
        let b = Coordinates::new(12.0, 24.0);
        assert_eq!(a.midpoint(&b), Coordinates::new(11.0, 22.0));
    }

    #[test]
    fn test_display() {
        let c = Coordinates::new(12.971_59, 77.594_56);
        assert_eq!(c.to_string(), "12.97159,77.59456");
    }
}
