//! `skydrop` - Drone delivery booking and tracking
//!
//! This library provides the booking wizard, the per-user order log, the
//! delivery tracking timeline and the dashboard with its auto-delivery
//! sweep. The map widget lives in the `skydrop-maps` crate.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod model;
pub mod orders;
pub mod privacy;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod tracking;
pub mod wizard;

pub use config::Config;
pub use dashboard::{Dashboard, DashboardSnapshot, DeliverySweeper, SweeperHandle};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{BookingId, BookingRecord, BookingStatus, DeliveryPhase, Notice};
pub use orders::{MemoryOrderLog, OrderLog, SqliteOrderLog};
pub use session::{SessionProvider, StaticSession, UserIdentity};
pub use skydrop_maps::{DeliveryMap, MapState};
pub use storage::{Storage, StorageStats};
pub use tracking::{TrackingEvent, TrackingHandoff, TrackingView};
pub use wizard::{BookingContext, BookingWizard};
