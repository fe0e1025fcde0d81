//! The delivery tracking view.
//!
//! A view is mounted from the [`TrackingHandoff`] the wizard returns. It
//! starts at [`DeliveryPhase::Dispatched`] and two one-shot timers raise the
//! phase to in-transit and delivered. The map widget loads in the
//! background. Unmounting the view aborts all of it.
//!
//! The phase shown here is a local simulation; it is never written to the
//! order log, whose statuses are advanced by the dashboard sweep instead.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use skydrop_maps::{DeliveryMap, MapState};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::TrackingConfig;
use crate::error::{Error, Result};
use crate::model::{BookingId, BookingRecord, DeliveryPhase, Notice, PersonDetails};
use crate::scheduler::{ScheduledTask, TaskSet};

/// Navigation state passed from the wizard to the tracking view.
///
/// Lives only in memory for the duration of one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingHandoff {
    /// The booking just stored.
    pub record: BookingRecord,
    /// Confirmation shown on arrival.
    pub notice: Notice,
}

impl TrackingHandoff {
    /// Hand off a freshly confirmed booking.
    #[must_use]
    pub fn new(record: BookingRecord) -> Self {
        Self {
            record,
            notice: Notice::booking_confirmed(),
        }
    }
}

/// When the simulated delivery moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingSchedule {
    /// Time after mount at which the parcel is in transit.
    pub in_transit_after: Duration,
    /// Time after mount at which the parcel is delivered.
    pub delivered_after: Duration,
}

impl Default for TrackingSchedule {
    fn default() -> Self {
        Self {
            in_transit_after: Duration::from_secs(15),
            delivered_after: Duration::from_secs(30),
        }
    }
}

impl From<&TrackingConfig> for TrackingSchedule {
    fn from(config: &TrackingConfig) -> Self {
        Self {
            in_transit_after: Duration::from_secs(config.in_transit_after_secs),
            delivered_after: Duration::from_secs(config.delivered_after_secs),
        }
    }
}

impl TrackingSchedule {
    /// Time after mount at which `phase` is reached, if it is timed.
    #[must_use]
    pub fn reached_after(&self, phase: DeliveryPhase) -> Option<Duration> {
        match phase {
            DeliveryPhase::OrderConfirmed | DeliveryPhase::Dispatched => None,
            DeliveryPhase::InTransit => Some(self.in_transit_after),
            DeliveryPhase::Delivered => Some(self.delivered_after),
        }
    }
}

/// Something a tracking screen should redraw for.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    /// The delivery is in this phase.
    Phase(DeliveryPhase),
    /// The map finished loading or failed.
    Map(MapState),
}

/// How a timeline entry is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Already reached.
    Completed,
    /// The current phase.
    InProgress,
    /// Not reached yet.
    Pending,
}

/// One row of the tracking timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    /// The phase this row stands for.
    pub phase: DeliveryPhase,
    /// Row label.
    pub label: &'static str,
    /// Drawing state.
    pub status: StepStatus,
    /// Whether the row's marker pulses.
    pub pulsing: bool,
    /// Secondary text, e.g. "In progress" or "Estimated 15 secs".
    pub time_label: String,
}

/// Build the timeline for `current`, `elapsed` after mount.
///
/// Once the final phase is reached every row is completed.
#[must_use]
pub fn build_timeline(
    current: DeliveryPhase,
    elapsed: Duration,
    schedule: &TrackingSchedule,
) -> Vec<TimelineEntry> {
    DeliveryPhase::ALL
        .iter()
        .map(|&phase| {
            let status = if phase < current || (phase == current && current.is_final()) {
                StepStatus::Completed
            } else if phase == current {
                StepStatus::InProgress
            } else {
                StepStatus::Pending
            };

            let time_label = match status {
                StepStatus::Completed if phase == DeliveryPhase::OrderConfirmed => {
                    "Just now".to_string()
                }
                StepStatus::Completed => "Completed".to_string(),
                StepStatus::InProgress => "In progress".to_string(),
                StepStatus::Pending => schedule.reached_after(phase).map_or_else(
                    || "Pending".to_string(),
                    |at| estimate_label(at.saturating_sub(elapsed)),
                ),
            };

            TimelineEntry {
                phase,
                label: phase.label(),
                status,
                pulsing: status == StepStatus::InProgress,
                time_label,
            }
        })
        .collect()
}

fn estimate_label(remaining: Duration) -> String {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    if secs >= 120 {
        format!("Estimated {} mins", secs.div_ceil(60))
    } else if secs == 1 {
        "Estimated 1 sec".to_string()
    } else {
        format!("Estimated {secs} secs")
    }
}

/// Contact card for one end of the delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationCard {
    /// Card heading.
    pub heading: &'static str,
    /// Contact name.
    pub name: String,
    /// Address.
    pub location: String,
    /// Contact phone.
    pub phone: String,
}

impl LocationCard {
    fn new(heading: &'static str, person: &PersonDetails) -> Self {
        Self {
            heading,
            name: person.full_name.clone(),
            location: person.location.clone(),
            phone: person.phone.clone(),
        }
    }
}

/// A mounted tracking view.
#[derive(Debug)]
pub struct TrackingView {
    record: BookingRecord,
    notice: Notice,
    schedule: TrackingSchedule,
    mounted_at: Instant,
    phase_tx: Arc<watch::Sender<DeliveryPhase>>,
    map_rx: watch::Receiver<MapState>,
    tasks: TaskSet,
}

impl TrackingView {
    /// Mount the view for a booking and start its timers and map load.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBooking`] if there is no handoff, meaning the view
    /// was reached without booking first.
    pub fn mount(
        handoff: Option<TrackingHandoff>,
        schedule: TrackingSchedule,
        map: DeliveryMap,
    ) -> Result<Self> {
        let Some(TrackingHandoff { record, notice }) = handoff else {
            debug!("Tracking view opened without a booking");
            return Err(Error::NoBooking(Notice::no_booking()));
        };

        let (phase_tx, _) = watch::channel(DeliveryPhase::Dispatched);
        let phase_tx = Arc::new(phase_tx);
        let (map_tx, map_rx) = watch::channel(MapState::Loading);
        let mut tasks = TaskSet::new();

        for (name, phase) in [
            ("tracking-in-transit", DeliveryPhase::InTransit),
            ("tracking-delivered", DeliveryPhase::Delivered),
        ] {
            let Some(delay) = schedule.reached_after(phase) else {
                continue;
            };
            let tx = Arc::clone(&phase_tx);
            let booking_id = record.id.clone();
            tasks.add(ScheduledTask::once(name, delay, move || {
                if raise_phase(&tx, phase) {
                    info!(%booking_id, %phase, "Delivery phase advanced");
                }
            }));
        }

        let pickup = record.sender.location.clone();
        let dropoff = record.receiver.location.clone();
        tasks.add(ScheduledTask::spawn("tracking-map", async move {
            let state = MapState::from(map.load(&pickup, &dropoff).await);
            if let MapState::Failed { message } = &state {
                debug!(%message, "Map failed to load");
            }
            let _ = map_tx.send(state);
        }));

        info!(booking_id = %record.id, "Tracking view mounted");
        Ok(Self {
            record,
            notice,
            schedule,
            mounted_at: Instant::now(),
            phase_tx,
            map_rx,
            tasks,
        })
    }

    /// The booking being tracked.
    #[must_use]
    pub fn record(&self) -> &BookingRecord {
        &self.record
    }

    /// Booking id shown in the header.
    #[must_use]
    pub fn booking_id(&self) -> &BookingId {
        &self.record.id
    }

    /// Header line, e.g. `Booking ID: DRN-…`.
    #[must_use]
    pub fn header(&self) -> String {
        format!("Booking ID: {}", self.record.id)
    }

    /// Notice shown on arrival.
    #[must_use]
    pub fn notice(&self) -> &Notice {
        &self.notice
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> DeliveryPhase {
        *self.phase_tx.borrow()
    }

    /// Watch phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DeliveryPhase> {
        self.phase_tx.subscribe()
    }

    /// Time since the view was mounted.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.mounted_at.elapsed()
    }

    /// Timeline rows for the current phase.
    #[must_use]
    pub fn timeline(&self) -> Vec<TimelineEntry> {
        build_timeline(self.phase(), self.elapsed(), &self.schedule)
    }

    /// Current map state.
    #[must_use]
    pub fn map_state(&self) -> MapState {
        self.map_rx.borrow().clone()
    }

    /// Follow the delivery until it is delivered.
    ///
    /// `on_event` gets the current phase first, then every later phase, and
    /// the map once it settles. A delivery that finished before the call
    /// still ends it, and a slow map never holds back phase updates.
    /// Returns the last phase seen.
    pub async fn follow<F>(&self, mut on_event: F) -> DeliveryPhase
    where
        F: FnMut(&Self, TrackingEvent),
    {
        let mut phases = self.subscribe();
        let mut maps = self.map_rx.clone();

        let mut phase = *phases.borrow_and_update();
        on_event(self, TrackingEvent::Phase(phase));

        let initial = maps.borrow_and_update().clone();
        let mut map_pending = !initial.is_settled();
        if !map_pending {
            on_event(self, TrackingEvent::Map(initial));
        }

        while !phase.is_final() {
            tokio::select! {
                changed = phases.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    phase = *phases.borrow_and_update();
                    on_event(self, TrackingEvent::Phase(phase));
                }
                changed = maps.changed(), if map_pending => {
                    if changed.is_err() {
                        map_pending = false;
                        continue;
                    }
                    let state = maps.borrow_and_update().clone();
                    if state.is_settled() {
                        map_pending = false;
                        on_event(self, TrackingEvent::Map(state));
                    }
                }
            }
        }
        phase
    }

    /// Pickup card.
    #[must_use]
    pub fn pickup_card(&self) -> LocationCard {
        LocationCard::new("Pickup", &self.record.sender)
    }

    /// Drop-off card.
    #[must_use]
    pub fn dropoff_card(&self) -> LocationCard {
        LocationCard::new("Drop-off", &self.record.receiver)
    }

    /// Number of timers and loads still running.
    #[must_use]
    pub fn active_tasks(&self) -> usize {
        self.tasks.active_count()
    }

    /// Stop every timer and discard any pending map result.
    pub fn unmount(&mut self) {
        if !self.tasks.is_empty() {
            debug!(booking_id = %self.record.id, "Tracking view unmounted");
        }
        self.tasks.cancel_all();
    }
}

impl Drop for TrackingView {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Raise the published phase. Lower or equal phases are ignored.
fn raise_phase(tx: &watch::Sender<DeliveryPhase>, phase: DeliveryPhase) -> bool {
    tx.send_if_modified(|current| {
        if phase > *current {
            *current = phase;
            true
        } else {
            false
        }
    })
}
