//! Console stand-in for the indicator hardware.

use rollcall_core::{SignalKind, SignalSink};

/// Logs cues instead of driving GPIO. For development hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSignaler;

impl SignalSink for ConsoleSignaler {
    fn signal(&mut self, kind: SignalKind) {
        match kind {
            SignalKind::AcceptedOnTime => tracing::info!("cue: accepted, on time"),
            SignalKind::AcceptedLate => tracing::info!("cue: accepted, late"),
            SignalKind::RejectedUnregistered => tracing::info!("cue: card not registered"),
            SignalKind::RejectedDuplicate => tracing::info!("cue: already took attendance"),
            SignalKind::SessionEnded => tracing::info!("cue: session ended"),
        }
    }
}
