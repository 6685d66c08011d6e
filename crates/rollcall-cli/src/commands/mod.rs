//! CLI subcommand implementations.

pub mod cards;
pub mod report;
pub mod session;
pub mod util;
