//! Command-line interface for skydrop.
//!
//! This module provides the CLI structure for the `skydrop` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    BookCommand, ConfigCommand, DashboardCommand, OrdersCommand, PaymentMethodArg,
};

use crate::config::SessionConfig;
use crate::logging::{verbosity_from_flags, Verbosity};
use crate::session::Role;

/// skydrop - Book and track drone deliveries
///
/// Books a delivery through the sender, receiver and payment steps, follows
/// it on the tracking timeline, and shows your orders on the dashboard.
#[derive(Debug, Parser)]
#[command(name = "skydrop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Act as this user instead of the configured one
    #[arg(short, long, global = true, value_name = "ID")]
    pub user: Option<String>,

    /// Act with the operator role
    #[arg(long, global = true)]
    pub admin: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Book a drone delivery
    Book(BookCommand),

    /// Show your orders and mark old ones delivered
    Dashboard(DashboardCommand),

    /// Manage your order log
    #[command(subcommand)]
    Orders(OrdersCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        verbosity_from_flags(self.verbose, self.quiet)
    }

    /// Apply the `--user` and `--admin` overrides to a session configuration.
    #[must_use]
    pub fn session_overrides(&self, mut session: SessionConfig) -> SessionConfig {
        if let Some(user) = &self.user {
            session.user_id = Some(user.clone());
            session.display_name = None;
        }
        if self.admin {
            session.role = Role::Admin;
        }
        session
    }
}
