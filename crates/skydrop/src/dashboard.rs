//! The dashboard and its auto-delivery sweep.
//!
//! The sweep marks every order older than a threshold as delivered and
//! writes the log back when something changed. It runs on a fixed interval
//! while the dashboard is open.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::error::Result;
use crate::model::{BookingRecord, BookingStatus};
use crate::orders::OrderLog;
use crate::scheduler::ScheduledTask;
use crate::session::{SessionProvider, UserIdentity};

/// Mark old orders as delivered.
///
/// Every order that is not delivered and was created at least
/// `deliver_after` before `now` becomes delivered. Returns how many orders
/// changed.
pub fn sweep_orders(
    orders: &mut [BookingRecord],
    now: DateTime<Utc>,
    deliver_after: Duration,
) -> usize {
    let mut changed = 0;
    for order in orders.iter_mut().filter(|o| !o.is_delivered()) {
        // A negative age means a clock skew, never old enough.
        let old_enough = order
            .age(now)
            .to_std()
            .is_ok_and(|age| age >= deliver_after);
        if old_enough {
            order.status = BookingStatus::Delivered;
            changed += 1;
        }
    }
    changed
}

/// Sweep the log stored under `key`, saving it only if something changed.
///
/// # Errors
///
/// Returns an error if the log cannot be read or written.
pub fn sweep_user_orders(
    log: &dyn OrderLog,
    key: &str,
    now: DateTime<Utc>,
    deliver_after: Duration,
) -> Result<usize> {
    let mut orders = log.load(key)?;
    let changed = sweep_orders(&mut orders, now, deliver_after);
    if changed > 0 {
        log.save(key, &orders)?;
        info!(key, changed, "Marked orders as delivered");
    }
    Ok(changed)
}

/// Recurring sweep over one user's order log.
#[derive(Debug, Clone)]
pub struct DeliverySweeper {
    orders: Arc<dyn OrderLog>,
    key: String,
    deliver_after: Duration,
}

impl DeliverySweeper {
    /// Create a sweeper for the log stored under `key`.
    #[must_use]
    pub fn new(orders: Arc<dyn OrderLog>, key: impl Into<String>, deliver_after: Duration) -> Self {
        Self {
            orders,
            key: key.into(),
            deliver_after,
        }
    }

    /// Sweep once at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or written.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> Result<usize> {
        sweep_user_orders(self.orders.as_ref(), &self.key, now, self.deliver_after)
    }

    /// Sweep every `interval` until the returned handle is dropped.
    ///
    /// Failed sweeps are logged and retried on the next tick.
    #[must_use]
    pub fn start(self, interval: Duration) -> SweeperHandle {
        debug!(key = %self.key, ?interval, "Starting delivery sweeper");
        let (sweeps_tx, sweeps) = watch::channel(0_u64);
        let task = ScheduledTask::every("dashboard-sweep", interval, move || {
            if let Err(e) = self.sweep_at(Utc::now()) {
                warn!(key = %self.key, error = %e, "Delivery sweep failed");
            }
            sweeps_tx.send_modify(|count| *count += 1);
        });
        SweeperHandle { task, sweeps }
    }
}

/// A running sweeper. Dropping it stops the sweep.
#[derive(Debug)]
pub struct SweeperHandle {
    task: ScheduledTask,
    sweeps: watch::Receiver<u64>,
}

impl SweeperHandle {
    /// Wait until the next sweep has run.
    ///
    /// Returns `false` once the sweeper has stopped.
    pub async fn next_sweep(&mut self) -> bool {
        self.sweeps.changed().await.is_ok()
    }

    /// Sweeps run so far.
    #[must_use]
    pub fn sweeps(&self) -> u64 {
        *self.sweeps.borrow()
    }

    /// Stop sweeping.
    pub fn stop(&self) {
        self.task.cancel();
    }
}

/// Order counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrderStats {
    /// All orders.
    pub total: usize,
    /// Pending orders.
    pub pending: usize,
    /// Orders in transit.
    pub in_transit: usize,
    /// Delivered orders.
    pub delivered: usize,
}

impl OrderStats {
    /// Count the given orders.
    #[must_use]
    pub fn from_orders(orders: &[BookingRecord]) -> Self {
        orders.iter().fold(Self::default(), |mut stats, order| {
            stats.total += 1;
            match order.status {
                BookingStatus::Pending => stats.pending += 1,
                BookingStatus::InTransit => stats.in_transit += 1,
                BookingStatus::Delivered => stats.delivered += 1,
            }
            stats
        })
    }
}

/// Orders placed on one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyOrders {
    /// Short weekday name.
    pub day: &'static str,
    /// Order count.
    pub orders: u32,
}

/// Fleet-wide figures shown to operators.
///
/// There is no telemetry behind these; they are fixed sample figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetStats {
    /// Orders across all customers.
    pub total_orders: u32,
    /// Drones flying.
    pub running: u32,
    /// Drones ready on the ground.
    pub standby: u32,
    /// Drones in maintenance.
    pub in_repair: u32,
    /// Orders per weekday, Monday first.
    pub weekly_orders: Vec<DailyOrders>,
}

impl FleetStats {
    /// The sample figures.
    #[must_use]
    pub fn canned() -> Self {
        let weekly_orders = [
            ("Mon", 45),
            ("Tue", 62),
            ("Wed", 58),
            ("Thu", 71),
            ("Fri", 89),
            ("Sat", 95),
            ("Sun", 67),
        ]
        .into_iter()
        .map(|(day, orders)| DailyOrders { day, orders })
        .collect();

        Self {
            total_orders: 1247,
            running: 35,
            standby: 22,
            in_repair: 8,
            weekly_orders,
        }
    }

    /// Size of the fleet.
    #[must_use]
    pub fn total_drones(&self) -> u32 {
        self.running + self.standby + self.in_repair
    }
}

/// Everything the dashboard shows at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSnapshot {
    /// Greeting line.
    pub greeting: String,
    /// Who the dashboard belongs to.
    pub user: UserIdentity,
    /// Counts of the user's orders.
    pub stats: OrderStats,
    /// The user's orders, newest first.
    pub orders: Vec<BookingRecord>,
    /// Fleet figures, operators only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleet: Option<FleetStats>,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

/// The dashboard of the signed-in user.
#[derive(Debug, Clone)]
pub struct Dashboard {
    session: Arc<dyn SessionProvider>,
    orders: Arc<dyn OrderLog>,
    sweep_interval: Duration,
    deliver_after: Duration,
}

impl Dashboard {
    /// Create a dashboard.
    #[must_use]
    pub fn new(
        session: Arc<dyn SessionProvider>,
        orders: Arc<dyn OrderLog>,
        config: &DashboardConfig,
    ) -> Self {
        Self {
            session,
            orders,
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
            deliver_after: Duration::from_secs(config.auto_deliver_after_secs),
        }
    }

    fn user(&self) -> UserIdentity {
        self.session.current_user_or_guest()
    }

    /// Read the current state without sweeping.
    ///
    /// # Errors
    ///
    /// Returns an error if the order log cannot be read.
    pub fn snapshot(&self) -> Result<DashboardSnapshot> {
        let user = self.user();
        let mut orders = self.orders.load(&user.order_log_key())?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(DashboardSnapshot {
            greeting: format!("Welcome back, {}", user.display_name),
            stats: OrderStats::from_orders(&orders),
            fleet: user.is_admin().then(FleetStats::canned),
            orders,
            user,
            taken_at: Utc::now(),
        })
    }

    /// Sweep once, then read the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the order log cannot be read or written.
    pub fn refresh(&self) -> Result<DashboardSnapshot> {
        self.sweeper().sweep_at(Utc::now())?;
        self.snapshot()
    }

    /// Sweeper for the signed-in user's log.
    #[must_use]
    pub fn sweeper(&self) -> DeliverySweeper {
        DeliverySweeper::new(
            Arc::clone(&self.orders),
            self.user().order_log_key(),
            self.deliver_after,
        )
    }

    /// Start sweeping on the configured interval.
    #[must_use]
    pub fn start_sweeper(&self) -> SweeperHandle {
        self.sweeper().start(self.sweep_interval)
    }

    /// Keep the dashboard open: sweep on the configured interval and pass a
    /// fresh snapshot to `on_snapshot` after every sweep.
    ///
    /// Runs until the returned future is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the order log cannot be read.
    pub async fn watch<F>(&self, mut on_snapshot: F) -> Result<()>
    where
        F: FnMut(&DashboardSnapshot),
    {
        let mut sweeper = self.start_sweeper();
        while sweeper.next_sweep().await {
            on_snapshot(&self.snapshot()?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;
    use crate::orders::MemoryOrderLog;
    use crate::session::{Role, StaticSession};

    const THRESHOLD: Duration = Duration::from_secs(60);

    fn seconds_ago(now: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        now - chrono::Duration::seconds(secs)
    }

    fn dashboard(role: Role, orders: Arc<dyn OrderLog>) -> Dashboard {
        let session = StaticSession::new(Some(UserIdentity::new("a@example.com", "A", role)));
        Dashboard::new(Arc::new(session), orders, &DashboardConfig::default())
    }

    const KEY: &str = "drone_orders_a@example.com";

    #[test]
    fn test_sweep_marks_old_orders_delivered() {
        let now = Utc::now();
        let mut orders = vec![
            fixtures::record("DRN-OLD", seconds_ago(now, 61)),
            fixtures::record("DRN-NEW", seconds_ago(now, 30)),
        ];

        assert_eq!(sweep_orders(&mut orders, now, THRESHOLD), 1);
        assert_eq!(orders[0].status, BookingStatus::Delivered);
        assert_eq!(orders[1].status, BookingStatus::Pending);
    }

    #[test]
    fn test_sweep_threshold_is_inclusive() {
        let now = Utc::now();
        let mut orders = vec![fixtures::record("DRN-1", seconds_ago(now, 60))];
        assert_eq!(sweep_orders(&mut orders, now, THRESHOLD), 1);
    }

    #[test]
    fn test_sweep_ignores_future_and_delivered() {
        let now = Utc::now();
        let mut delivered = fixtures::record("DRN-D", seconds_ago(now, 600));
        delivered.status = BookingStatus::Delivered;
        let mut orders = vec![delivered, fixtures::record("DRN-F", seconds_ago(now, -120))];

        assert_eq!(sweep_orders(&mut orders, now, THRESHOLD), 0);
        assert_eq!(orders[1].status, BookingStatus::Pending);
    }

    #[test]
    fn test_sweep_in_transit_orders() {
        let now = Utc::now();
        let mut order = fixtures::record("DRN-T", seconds_ago(now, 90));
        order.status = BookingStatus::InTransit;
        let mut orders = vec![order];

        assert_eq!(sweep_orders(&mut orders, now, THRESHOLD), 1);
        assert!(orders[0].is_delivered());
    }

    #[test]
    fn test_sweep_user_orders_writes_back() {
        let log = MemoryOrderLog::new();
        let now = Utc::now();
        log.save(
            KEY,
            &[
                fixtures::record("DRN-OLD", seconds_ago(now, 61)),
                fixtures::record("DRN-NEW", seconds_ago(now, 30)),
            ],
        )
        .unwrap();

        assert_eq!(sweep_user_orders(&log, KEY, now, THRESHOLD).unwrap(), 1);
        let stored = log.load(KEY).unwrap();
        assert!(stored[0].is_delivered());
        assert!(!stored[1].is_delivered());

        assert_eq!(sweep_user_orders(&log, KEY, now, THRESHOLD).unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_on_interval() {
        let log: Arc<dyn OrderLog> = Arc::new(MemoryOrderLog::new());
        log.save(KEY, &[fixtures::record("DRN-OLD", seconds_ago(Utc::now(), 120))])
            .unwrap();

        let mut sweeper = dashboard(Role::User, Arc::clone(&log)).start_sweeper();
        assert!(!log.load(KEY).unwrap()[0].is_delivered());

        assert!(sweeper.next_sweep().await);
        assert_eq!(sweeper.sweeps(), 1);
        assert!(log.load(KEY).unwrap()[0].is_delivered());

        sweeper.stop();
        assert!(!sweeper.next_sweep().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_redraws_after_each_sweep() {
        let log: Arc<dyn OrderLog> = Arc::new(MemoryOrderLog::new());
        log.save(KEY, &[fixtures::record("DRN-OLD", seconds_ago(Utc::now(), 120))])
            .unwrap();
        let dashboard = dashboard(Role::User, Arc::clone(&log));

        let mut snapshots = Vec::new();
        let watched = tokio::time::timeout(
            Duration::from_secs(25),
            dashboard.watch(|snapshot| snapshots.push(snapshot.stats)),
        )
        .await;

        assert!(watched.is_err());
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].delivered, 1);
        assert_eq!(snapshots[0].pending, 0);
    }

    #[test]
    fn test_snapshot_for_user() {
        let log: Arc<dyn OrderLog> = Arc::new(MemoryOrderLog::new());
        let now = Utc::now();
        log.save(
            KEY,
            &[
                fixtures::record("DRN-1", seconds_ago(now, 300)),
                fixtures::record("DRN-2", seconds_ago(now, 10)),
            ],
        )
        .unwrap();

        let snapshot = dashboard(Role::User, log).snapshot().unwrap();
        assert_eq!(snapshot.greeting, "Welcome back, A");
        assert_eq!(snapshot.orders[0].id.as_str(), "DRN-2");
        assert_eq!(snapshot.stats.total, 2);
        assert_eq!(snapshot.stats.pending, 2);
        assert!(snapshot.fleet.is_none());
    }

    #[test]
    fn test_refresh_sweeps_first() {
        let log: Arc<dyn OrderLog> = Arc::new(MemoryOrderLog::new());
        log.save(KEY, &[fixtures::record("DRN-1", seconds_ago(Utc::now(), 61))])
            .unwrap();

        let snapshot = dashboard(Role::User, log).refresh().unwrap();
        assert_eq!(snapshot.stats.delivered, 1);
        assert_eq!(snapshot.stats.pending, 0);
    }

    #[test]
    fn test_admin_sees_fleet() {
        let snapshot = dashboard(Role::Admin, Arc::new(MemoryOrderLog::new()))
            .snapshot()
            .unwrap();
        let fleet = snapshot.fleet.unwrap();
        assert_eq!(fleet.total_orders, 1247);
        assert_eq!(fleet.total_drones(), 65);
        assert_eq!(fleet.weekly_orders.len(), 7);
        assert_eq!(fleet.weekly_orders[5].day, "Sat");
        assert_eq!(fleet.weekly_orders[5].orders, 95);
    }

    #[test]
    fn test_snapshot_json_omits_fleet_for_users() {
        let snapshot = dashboard(Role::User, Arc::new(MemoryOrderLog::new()))
            .snapshot()
            .unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("fleet").is_none());
        assert_eq!(json["stats"]["total"], 0);
    }
}
