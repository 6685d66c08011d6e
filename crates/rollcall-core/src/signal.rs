//! Indicator cues emitted by the session loop and registration surface.

use std::fmt;

/// The cue to present on the indicator hardware.
///
/// Fire-and-forget: the core never consumes a return value from the sink,
/// and a slow sink only costs wall-clock session time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Card accepted within the on-time window.
    AcceptedOnTime,
    /// Card accepted within the late window.
    AcceptedLate,
    /// Card not present in the roster.
    RejectedUnregistered,
    /// Card already accepted this session.
    RejectedDuplicate,
    /// The session deadline passed or the operator cancelled.
    SessionEnded,
}

impl SignalKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AcceptedOnTime => "accepted_on_time",
            Self::AcceptedLate => "accepted_late",
            Self::RejectedUnregistered => "rejected_unregistered",
            Self::RejectedDuplicate => "rejected_duplicate",
            Self::SessionEnded => "session_ended",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
