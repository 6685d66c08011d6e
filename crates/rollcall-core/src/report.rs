//! Report finalization, persistence, and notification dispatch.
//!
//! Finalization is the unconditional pass that resolves every unset status
//! to absent, guaranteeing that exactly one final status exists per roster
//! entry. Persistence and notification are independent, non-transactional
//! steps: a save failure is fatal-at-end, a notify failure is not.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roster::Roster;
use crate::session::SessionConfig;
use crate::traits::{Notifier, RosterStore};
use crate::types::{AttendanceStatus, CardUid, RegistrantId};

/// Marks every registrant without a status as absent.
///
/// Total and unconditional; returns how many records were resolved. After
/// this pass no record's status is unset, whether the session ran to its
/// deadline or was cancelled after a single scan.
pub fn finalize(roster: &mut Roster) -> usize {
    let mut marked = 0;
    for record in roster.iter_mut() {
        if record.status.is_none() {
            record.status = Some(AttendanceStatus::Absent);
            tracing::info!(name = %record.display_name, "marked absent");
            marked += 1;
        }
    }
    marked
}

/// The session windows echoed into the report artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub total_secs: u64,
    pub on_time_cutoff_secs: u64,
}

impl From<&SessionConfig> for ReportWindow {
    fn from(config: &SessionConfig) -> Self {
        Self {
            total_secs: config.total_duration().as_secs(),
            on_time_cutoff_secs: config.on_time_cutoff().as_secs(),
        }
    }
}

/// One registrant's line in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub uid: CardUid,
    pub registrant_id: RegistrantId,
    pub display_name: String,
    pub status: AttendanceStatus,
}

/// Per-status totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub on_time: usize,
    pub late: usize,
    pub absent: usize,
}

/// The finalized, serializable session artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<ReportWindow>,
    pub entries: Vec<ReportEntry>,
    pub counts: StatusCounts,
}

/// The roster still had unset statuses when a report was requested.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("roster not finalized: {unset} registrant(s) still have no status")]
pub struct UnfinalizedRoster {
    pub unset: usize,
}

impl SessionReport {
    /// Builds the report from a finalized roster.
    ///
    /// Fails if any status is still unset; callers run [`finalize`] first.
    pub fn from_roster(
        session_date: NaiveDate,
        window: Option<&SessionConfig>,
        roster: &Roster,
    ) -> Result<Self, UnfinalizedRoster> {
        let unset = roster.iter().filter(|r| r.status.is_none()).count();
        if unset > 0 {
            return Err(UnfinalizedRoster { unset });
        }
        let entries = roster
            .iter()
            .map(|record| ReportEntry {
                uid: record.uid.clone(),
                registrant_id: record.registrant_id.clone(),
                display_name: record.display_name.clone(),
                status: record.status.unwrap_or(AttendanceStatus::Absent),
            })
            .collect();
        Ok(Self::from_entries(session_date, window.map(Into::into), entries))
    }

    /// Builds the report from pre-resolved entries (e.g. a stored session).
    #[must_use]
    pub fn from_entries(
        session_date: NaiveDate,
        window: Option<ReportWindow>,
        entries: Vec<ReportEntry>,
    ) -> Self {
        let mut counts = StatusCounts::default();
        for entry in &entries {
            match entry.status {
                AttendanceStatus::OnTime => counts.on_time += 1,
                AttendanceStatus::Late => counts.late += 1,
                AttendanceStatus::Absent => counts.absent += 1,
            }
        }
        Self {
            session_date,
            window,
            entries,
            counts,
        }
    }

    /// Renders the report as a plain-text table for the terminal.
    #[must_use]
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Attendance for {}\n", self.session_date));
        let name_width = self
            .entries
            .iter()
            .map(|e| e.display_name.len())
            .max()
            .unwrap_or(4)
            .max(4);
        for entry in &self.entries {
            out.push_str(&format!(
                "{:<name_width$}  {:<6}  {}\n",
                entry.display_name,
                entry.registrant_id.as_str(),
                entry.status.mark(),
            ));
        }
        out.push_str(&format!(
            "on time: {}  late: {}  absent: {}\n",
            self.counts.on_time, self.counts.late, self.counts.absent
        ));
        out
    }
}

/// Result of the persist-then-notify pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Whether a notification was attempted at all.
    pub notify_attempted: bool,
    /// The notify failure, if any. Non-fatal: persisted state stands.
    pub notify_error: Option<String>,
}

/// Persists the finalized roster, then attempts one notification.
///
/// A store failure propagates (fatal-at-end); a notifier failure is
/// captured in the outcome and logged. Neither step is retried, and a
/// notify failure never rolls back the save.
pub fn dispatch<St, N>(
    store: &mut St,
    date: NaiveDate,
    roster: &Roster,
    report: &SessionReport,
    notifier: Option<&mut N>,
    recipient: &str,
) -> Result<DispatchOutcome, St::Error>
where
    St: RosterStore,
    N: Notifier,
{
    store.save_session(date, roster)?;
    tracing::info!(%date, "attendance saved");

    let Some(notifier) = notifier else {
        return Ok(DispatchOutcome {
            notify_attempted: false,
            notify_error: None,
        });
    };

    let notify_error = match notifier.send(report, recipient) {
        Ok(()) => {
            tracing::info!(recipient, "report dispatched");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, recipient, "report dispatch failed");
            Some(err.to_string())
        }
    };
    Ok(DispatchOutcome {
        notify_attempted: true,
        notify_error,
    })
}
