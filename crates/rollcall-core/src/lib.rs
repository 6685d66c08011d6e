//! Core domain logic for the attendance system.
//!
//! This crate contains the fundamental types and logic for:
//! - Roster: the card-to-identity bindings and per-session statuses
//! - Session: the time-boxed attendance-capture state machine
//! - Report: finalization, persistence, and notification dispatch
//!
//! All I/O happens behind the collaborator traits ([`CardReader`],
//! [`SignalSink`], [`RosterStore`], [`Notifier`]); the session loop itself
//! is synchronous and single-owner.

pub mod report;
pub mod roster;
pub mod session;
pub mod signal;
pub mod traits;
mod types;

pub use report::{
    DispatchOutcome, ReportEntry, ReportWindow, SessionReport, StatusCounts, UnfinalizedRoster,
    dispatch, finalize,
};
pub use roster::{RegistrantRecord, Roster, RosterError};
pub use session::{
    DedupLedger, ScanEvent, SessionConfig, SessionConfigError, SessionController, SessionError,
    SessionOutcome, SessionSummary, classify,
};
pub use signal::SignalKind;
pub use traits::{CardReader, Clock, MonotonicClock, Notifier, RosterStore, SignalSink};
pub use types::{AttendanceStatus, CardUid, RegistrantId, UnknownStatus, ValidationError};
