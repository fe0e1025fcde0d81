//! Error types for the map widget.

use thiserror::Error;

/// Errors raised while loading the delivery map.
#[derive(Error, Debug)]
pub enum MapError {
    /// No API credential is available for the live provider.
    #[error("map service is not configured: {reason}")]
    NotConfigured {
        /// What is missing.
        reason: String,
    },

    /// At least one of the two addresses could not be geocoded.
    #[error("could not find one or more addresses")]
    AddressNotFound,

    /// The provider answered with a non-success status.
    #[error("map provider returned {status}: {message}")]
    Provider {
        /// Status string reported by the provider.
        status: String,
        /// Provider supplied message, if any.
        message: String,
    },

    /// An encoded route polyline could not be decoded.
    #[error("invalid route polyline: {reason}")]
    InvalidPolyline {
        /// Decoder message.
        reason: String,
    },

    /// The HTTP request failed.
    #[error("map request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for map operations.
pub type Result<T> = std::result::Result<T, MapError>;

impl MapError {
    /// Create a not-configured error.
    #[must_use]
    pub fn not_configured(reason: impl Into<String>) -> Self {
        Self::NotConfigured {
            reason: reason.into(),
        }
    }

    /// The message shown inline in place of the map.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotConfigured { .. } => "Map service is not configured",
            Self::AddressNotFound => "Could not find one or more addresses",
            Self::Provider { .. } | Self::InvalidPolyline { .. } | Self::Http(_) => {
                "Failed to load map"
            }
        }
    }

    /// Check if this error means an address did not resolve.
    #[must_use]
    pub fn is_address_not_found(&self) -> bool {
        matches!(self, Self::AddressNotFound)
    }
}
