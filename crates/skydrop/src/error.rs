//! Error types for skydrop.
//!
//! This module defines all error types used throughout the skydrop crate,
//! covering storage and configuration failures as well as the user-facing
//! booking, tracking and map errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::Notice;

/// The main error type for skydrop operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored order log could not be parsed.
    #[error("order log '{key}' is corrupt: {source}")]
    CorruptOrderLog {
        /// Storage key of the log.
        key: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Booking Errors ===
    /// A wizard step is missing required information.
    #[error("{0}")]
    Validation(Notice),

    /// Confirmation was requested before reaching the payment step.
    #[error("cannot confirm from the {step} step")]
    NotOnPaymentStep {
        /// Label of the active step.
        step: &'static str,
    },

    /// A submission is already being processed.
    #[error("booking is already being processed")]
    SubmissionInProgress,

    /// The wizard already produced a booking.
    #[error("booking {booking_id} has already been submitted")]
    AlreadySubmitted {
        /// Id of the existing booking.
        booking_id: String,
    },

    // === Tracking Errors ===
    /// The tracking view was opened without a booking.
    #[error("{0}")]
    NoBooking(Notice),

    /// The map widget failed.
    #[error("map error: {0}")]
    Map(#[from] skydrop_maps::MapError),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read an identity proof file.
    #[error("failed to read proof file {path}: {source}")]
    ProofFile {
        /// Path of the proof file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for skydrop operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a user-recoverable validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error comes from the map provider.
    #[must_use]
    pub fn is_external_service(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// Check if this error means a view was reached without its context.
    #[must_use]
    pub fn is_missing_context(&self) -> bool {
        matches!(self, Self::NoBooking(_))
    }

    /// The user-facing notice carried by this error, if any.
    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Self::Validation(notice) | Self::NoBooking(notice) => Some(notice),
            _ => None,
        }
    }
}
