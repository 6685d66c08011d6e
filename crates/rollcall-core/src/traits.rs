//! Collaborator contracts the core depends on.
//!
//! The session controller owns the roster and the dedup ledger; everything
//! with a wire, a pin, or a file behind it comes in through these traits.
//! Adapters live in `rollcall-hal`, `rollcall-db`, and `rollcall-notify`.

use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::report::SessionReport;
use crate::roster::Roster;
use crate::signal::SignalKind;
use crate::types::CardUid;

/// A physical card reader.
///
/// One UID per physical tap; the adapter must not return duplicate
/// in-flight reads for a single tap.
pub trait CardReader {
    type Error: std::error::Error;

    /// Blocks up to `timeout` for the next tap.
    ///
    /// `Ok(None)` means no card was presented within the timeout; the
    /// caller re-checks its deadline and polls again. Errors are transient
    /// from the session's point of view and never end the loop.
    fn read_next(&mut self, timeout: Duration) -> Result<Option<CardUid>, Self::Error>;
}

/// Indicator lights and buzzer.
pub trait SignalSink {
    /// Presents a cue. Fire-and-forget: failures are the sink's problem,
    /// and any cue sleep counts as session wall-clock time.
    fn signal(&mut self, kind: SignalKind);
}

/// The roster store: load at session start, save at session end.
pub trait RosterStore {
    type Error: std::error::Error;

    /// Loads the full roster in enrollment order.
    ///
    /// A missing or corrupt source must fail here so the session aborts
    /// before the loop begins, never runs against a partial roster.
    fn load_roster(&self) -> Result<Roster, Self::Error>;

    /// Persists one session's statuses keyed by session date.
    ///
    /// Re-running a session for the same date overwrites that date's
    /// column. Called with a fully finalized roster (no unset statuses).
    fn save_session(&mut self, date: NaiveDate, roster: &Roster) -> Result<(), Self::Error>;
}

/// Notification dispatch for the finalized report.
pub trait Notifier {
    type Error: std::error::Error;

    /// Sends the report to the recipient. Invoked exactly once per
    /// session, after persistence; a failure is non-fatal to the session.
    fn send(&mut self, report: &SessionReport, recipient: &str) -> Result<(), Self::Error>;
}

/// Monotonic elapsed-time source for the session.
///
/// Injected so tests can script the clock alongside scripted taps.
pub trait Clock {
    /// Time elapsed since session start.
    fn elapsed(&self) -> Duration;
}

/// Production clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    started: Instant,
}

impl MonotonicClock {
    /// Starts the clock now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
