//! `skydrop` - CLI for drone delivery booking
//!
//! This binary drives the booking wizard, follows a delivery on the tracking
//! timeline and shows the order dashboard.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};

use skydrop::cli::{BookCommand, Cli, Command, ConfigCommand, DashboardCommand, OrdersCommand};
use skydrop::dashboard::{Dashboard, DashboardSnapshot};
use skydrop::model::PaymentMethod;
use skydrop::orders::{OrderLog, SqliteOrderLog};
use skydrop::session::{SessionProvider, StaticSession};
use skydrop::tracking::{StepStatus, TrackingEvent, TrackingSchedule, TrackingView};
use skydrop::wizard::{BookingContext, BookingWizard, StepIndicator};
use skydrop::{init_logging, Config, DeliveryMap, MapState, Storage};
use skydrop_maps::MapView;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;
    let session: Arc<dyn SessionProvider> = Arc::new(StaticSession::from_config(
        &cli.session_overrides(config.session.clone()),
    ));

    match cli.command {
        Command::Book(cmd) => handle_book(&config, session, &cmd).await,
        Command::Dashboard(cmd) => handle_dashboard(&config, session, &cmd).await,
        Command::Orders(cmd) => handle_orders(&config, session.as_ref(), &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_orders(config: &Config) -> Result<Arc<SqliteOrderLog>> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open order database at {}", path.display()))?;
    Ok(Arc::new(SqliteOrderLog::new(storage)))
}

async fn handle_book(
    config: &Config,
    session: Arc<dyn SessionProvider>,
    cmd: &BookCommand,
) -> Result<()> {
    let orders = open_orders(config)?;
    let context = BookingContext::new(session, orders);
    let mut wizard = BookingWizard::new(context, config.processing_delay());

    *wizard.sender_mut() = cmd.sender()?;
    *wizard.receiver_mut() = cmd.receiver()?;
    *wizard.payment_mut() = cmd.payment();

    print_steps(&wizard)?;
    wizard.next()?;
    print_steps(&wizard)?;
    wizard.next()?;
    print_steps(&wizard)?;

    let fare = wizard.fare();
    println!();
    println!("Order Summary");
    println!("  Delivery fee:  ₹{}", fare.delivery_fee);
    println!("  Service tax:   ₹{}", fare.service_tax);
    println!("  Total:         ₹{}", fare.total());
    if let Some(method) = wizard.form().payment.method {
        println!("  Payment:       {}", method.label());
    } else {
        println!(
            "  Payment:       (choose one of: {})",
            PaymentMethod::ALL.map(|m| m.to_string()).join(", ")
        );
    }
    println!();
    println!("{}...", wizard.confirm_label());

    let handoff = wizard.confirm().await?;
    println!("{}", handoff.notice);
    println!("Booking ID: {}", handoff.record.id);

    if cmd.no_track {
        return Ok(());
    }

    let map = DeliveryMap::from_settings(&config.maps);
    let view = TrackingView::mount(
        Some(handoff),
        TrackingSchedule::from(&config.tracking),
        map,
    )?;
    follow_delivery(view).await
}

fn print_steps(wizard: &BookingWizard) -> Result<()> {
    let line = wizard
        .step_indicators()?
        .into_iter()
        .map(|(step, indicator)| {
            let mark = match indicator {
                StepIndicator::Completed => "✓",
                StepIndicator::Active => "●",
                StepIndicator::Pending => "○",
            };
            format!("{mark} {}. {}", step.number(), step.label())
        })
        .collect::<Vec<_>>()
        .join("   ");
    println!("{line}");
    Ok(())
}

async fn follow_delivery(mut view: TrackingView) -> Result<()> {
    println!();
    println!("Track Your Delivery");
    println!("{}", view.header());

    for card in [view.pickup_card(), view.dropoff_card()] {
        println!("  {}: {} ({}) {}", card.heading, card.name, card.phone, card.location);
    }

    let follow = view.follow(|view, event| match event {
        TrackingEvent::Phase(_) => print_timeline(view),
        TrackingEvent::Map(state) => print_map(&state),
    });

    tokio::select! {
        phase = follow => debug!(%phase, "Stopped following delivery"),
        _ = tokio::signal::ctrl_c() => debug!("Interrupted, leaving tracking view"),
    }

    view.unmount();
    Ok(())
}

fn print_map(state: &MapState) {
    match state {
        MapState::Loaded(MapView::Static { image }) => println!("Map: {image}"),
        MapState::Loaded(map) => {
            for marker in map.markers() {
                println!("  {:?} at {}", marker.kind, marker.position);
            }
        }
        MapState::Failed { message } => println!("Map: {message}"),
        MapState::Loading => {}
    }
}

fn print_timeline(view: &TrackingView) {
    println!();
    println!("Delivery Status");
    for entry in view.timeline() {
        let mark = match entry.status {
            StepStatus::Completed => "✓",
            StepStatus::InProgress => "●",
            StepStatus::Pending => "○",
        };
        println!("  {mark} {:<18} {}", entry.label, entry.time_label);
    }
}

async fn handle_dashboard(
    config: &Config,
    session: Arc<dyn SessionProvider>,
    cmd: &DashboardCommand,
) -> Result<()> {
    let orders: Arc<dyn OrderLog> = open_orders(config)?;
    let dashboard = Dashboard::new(session, orders, &config.dashboard);

    print_snapshot(&dashboard.refresh()?, cmd.json)?;
    if !cmd.watch {
        return Ok(());
    }

    let json = cmd.json;
    tokio::select! {
        watched = dashboard.watch(|snapshot| {
            if let Err(e) = print_snapshot(snapshot, json) {
                warn!(error = %e, "Failed to draw dashboard");
            }
        }) => watched?,
        _ = tokio::signal::ctrl_c() => debug!("Interrupted, closing dashboard"),
    }
    Ok(())
}

fn print_snapshot(snapshot: &DashboardSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }

    println!("Dashboard");
    println!("{}", snapshot.greeting);
    println!();
    println!(
        "Orders: {} total, {} pending, {} in transit, {} delivered",
        snapshot.stats.total,
        snapshot.stats.pending,
        snapshot.stats.in_transit,
        snapshot.stats.delivered
    );

    for order in &snapshot.orders {
        println!(
            "  {:<14} {:<10} {} -> {}  ({})",
            order.id,
            order.status,
            order.sender.location,
            order.receiver.location,
            order.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    if let Some(fleet) = &snapshot.fleet {
        println!();
        println!("Fleet");
        println!("  Total orders:  {}", fleet.total_orders);
        println!("  Total drones:  {}", fleet.total_drones());
        println!("  Running:       {}", fleet.running);
        println!("  Standby:       {}", fleet.standby);
        println!("  In Repair:     {}", fleet.in_repair);
        let weekly = fleet
            .weekly_orders
            .iter()
            .map(|d| format!("{} {}", d.day, d.orders))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  Weekly orders: {weekly}");
    }
    println!();
    Ok(())
}

fn handle_orders(config: &Config, session: &dyn SessionProvider, cmd: &OrdersCommand) -> Result<()> {
    let orders = open_orders(config)?;
    let user = session.current_user_or_guest();
    let key = user.order_log_key();

    match cmd {
        OrdersCommand::List { json } => {
            let log = orders.load(&key)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&log)?);
            } else if log.is_empty() {
                println!("No orders for {}.", user.id);
            } else {
                for order in &log {
                    println!(
                        "{:<14} {:<10} {} -> {}",
                        order.id, order.status, order.sender.location, order.receiver.location
                    );
                }
            }
        }
        OrdersCommand::Clear { yes } => {
            if !*yes {
                println!("This will delete every order of {}.", user.id);
                println!("Use --yes to confirm.");
                return Ok(());
            }
            if orders.clear(&key)? {
                println!("Cleared orders of {}.", user.id);
            } else {
                println!("No orders for {}.", user.id);
            }
        }
        OrdersCommand::Stats => {
            let stats = orders.with_storage(Storage::stats)?;
            println!("Database:      {}", config.database_path().display());
            println!("Order logs:    {}", stats.user_logs);
            println!("Total orders:  {}", stats.total_orders);
            println!("Size (bytes):  {}", stats.db_size_bytes);
            if let Some(updated) = stats.last_updated {
                println!("Last updated:  {}", updated.to_rfc3339());
            }
            if user.is_admin() {
                for log_key in orders.with_storage(Storage::user_keys)? {
                    println!("  {log_key}");
                }
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Booking]");
                println!("  Processing delay:   {:?}", config.processing_delay());
                println!();
                println!("[Tracking]");
                println!("  In transit after:   {:?}", config.in_transit_after());
                println!("  Delivered after:    {:?}", config.delivered_after());
                println!();
                println!("[Dashboard]");
                println!("  Sweep interval:     {:?}", config.sweep_interval());
                println!("  Deliver after:      {:?}", config.auto_deliver_after());
                println!();
                println!("[Maps]");
                println!("  Provider:           {}", config.maps.provider);
                println!(
                    "  API key:            {}",
                    if config.maps.api_key().is_some() { "set" } else { "not set" }
                );
                println!();
                println!("[Session]");
                println!(
                    "  User:               {}",
                    config.session.user_id.as_deref().unwrap_or("(guest)")
                );
                println!("  Role:               {}", config.session.role);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
