//! Attendance CLI library.
//!
//! This crate provides the CLI interface for the attendance system.

mod cli;
pub mod commands;
mod config;

pub use cli::{CardsAction, Cli, Commands, SessionAction};
pub use config::{Config, NotifyConfig, SessionDefaults, SignalBackend, SignalsConfig};
