//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Card-scan attendance system.
///
/// Runs time-boxed attendance sessions against a proximity-card reader and
/// manages the card-to-identity roster.
#[derive(Debug, Parser)]
#[command(name = "rollcall", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run or inspect attendance sessions.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage card-to-identity bindings.
    Cards {
        #[command(subcommand)]
        action: CardsAction,
    },

    /// Show a recorded session's attendance.
    Report {
        /// Session date (YYYY-MM-DD). Defaults to the most recent session.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

/// Session subcommands.
#[derive(Debug, Subcommand)]
pub enum SessionAction {
    /// Run one attendance-capture session.
    Run {
        /// Session length in seconds. Defaults from config.
        #[arg(long)]
        duration_secs: Option<u64>,

        /// On-time window in seconds. Defaults from config.
        #[arg(long)]
        cutoff_secs: Option<u64>,

        /// Session date column to record under. Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Output the final report as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Card registration subcommands.
#[derive(Debug, Subcommand)]
pub enum CardsAction {
    /// Bind a card to a registrant. Scans the reader unless --uid is given.
    Enroll {
        /// Assigned registrant ID.
        #[arg(long)]
        id: String,

        /// Registrant display name.
        #[arg(long)]
        name: String,

        /// Card UID, bypassing the reader.
        #[arg(long)]
        uid: Option<String>,
    },

    /// Show the binding for a card.
    Show {
        /// Card UID, bypassing the reader.
        #[arg(long)]
        uid: Option<String>,
    },

    /// Delete the binding for a card.
    Remove {
        /// Card UID, bypassing the reader.
        #[arg(long)]
        uid: Option<String>,
    },

    /// List all enrolled cards.
    List {
        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}
