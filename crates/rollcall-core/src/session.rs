//! The time-boxed attendance session state machine.
//!
//! A session is a fixed-duration loop over card-read events: each event is
//! deduplicated, classified against elapsed time, and recorded on the
//! roster. The loop observes the deadline and the operator cancel flag only
//! at iteration boundaries, so a record mutation always completes atomically
//! with respect to cancellation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::roster::Roster;
use crate::signal::SignalKind;
use crate::traits::{CardReader, Clock, SignalSink};
use crate::types::{AttendanceStatus, CardUid};

/// Upper bound on a single blocking read, so the deadline and the cancel
/// flag are observed promptly even when nobody taps a card.
const POLL_TIMEOUT_CAP: Duration = Duration::from_millis(500);

/// Session window configuration.
///
/// Both durations are relative to session start. Construction enforces
/// `0 < on_time_cutoff < total_duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    total_duration: Duration,
    on_time_cutoff: Duration,
}

/// Invalid session window configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionConfigError {
    #[error("on-time cutoff must be greater than zero")]
    ZeroCutoff,
    #[error("on-time cutoff ({cutoff:?}) must be less than total duration ({total:?})")]
    CutoffNotBeforeDeadline { cutoff: Duration, total: Duration },
}

impl SessionConfig {
    pub fn new(
        total_duration: Duration,
        on_time_cutoff: Duration,
    ) -> Result<Self, SessionConfigError> {
        if on_time_cutoff.is_zero() {
            return Err(SessionConfigError::ZeroCutoff);
        }
        if on_time_cutoff >= total_duration {
            return Err(SessionConfigError::CutoffNotBeforeDeadline {
                cutoff: on_time_cutoff,
                total: total_duration,
            });
        }
        Ok(Self {
            total_duration,
            on_time_cutoff,
        })
    }

    #[must_use]
    pub const fn total_duration(&self) -> Duration {
        self.total_duration
    }

    #[must_use]
    pub const fn on_time_cutoff(&self) -> Duration {
        self.on_time_cutoff
    }
}

/// Classifies an accepted scan against the session windows.
///
/// A half-open partition of `[0, total_duration]`: `[0, cutoff]` is
/// on-time (boundary inclusive), `(cutoff, total_duration]` is late.
///
/// Precondition: the controller never classifies past the deadline, so
/// `elapsed <= total_duration` is not re-checked here.
#[must_use]
pub fn classify(elapsed: Duration, config: &SessionConfig) -> AttendanceStatus {
    if elapsed <= config.on_time_cutoff {
        AttendanceStatus::OnTime
    } else {
        AttendanceStatus::Late
    }
}

/// Set of card UIDs already accepted this session.
///
/// Grows monotonically; cleared only by starting a new session. Hash-set
/// backed so duplicate checks stay O(1) regardless of roster size.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashSet<CardUid>,
}

impl DedupLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, uid: &CardUid) -> bool {
        self.seen.contains(uid)
    }

    /// Records a UID; returns `false` if it was already present.
    pub fn insert(&mut self, uid: CardUid) -> bool {
        self.seen.insert(uid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// One card tap, stamped with session-relative time.
///
/// Ephemeral: built from a reader poll plus the session clock and consumed
/// immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub uid: CardUid,
    /// Elapsed time since session start when the tap was observed.
    pub observed_at: Duration,
}

/// How the session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The deadline passed.
    DeadlineReached,
    /// The operator cancelled; whatever state accumulated is valid.
    Cancelled,
}

/// Counters for one session run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub outcome: SessionOutcome,
    pub accepted: usize,
    pub rejected_duplicate: usize,
    pub rejected_unregistered: usize,
    pub reader_errors: usize,
    /// Elapsed time when the loop ended.
    pub ended_at: Duration,
}

/// Session startup errors. Per-event errors never surface here; they are
/// absorbed inside the loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("roster is empty; enroll at least one card before running a session")]
    EmptyRoster,
}

/// Runs the bounded-time attendance loop and produces a fully-scanned
/// (but not yet finalized) roster.
#[derive(Debug, Clone)]
pub struct SessionController {
    config: SessionConfig,
}

impl SessionController {
    #[must_use]
    pub const fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Runs the session to its deadline or cancellation.
    ///
    /// Mutates `roster` in place and drives `signals`; never touches
    /// persistent storage. The cancel flag is observed at each iteration
    /// boundary, never mid-event.
    pub fn run<R, S, C>(
        &self,
        roster: &mut Roster,
        reader: &mut R,
        signals: &mut S,
        clock: &C,
        cancel: &AtomicBool,
    ) -> Result<SessionSummary, SessionError>
    where
        R: CardReader,
        S: SignalSink,
        C: Clock,
    {
        if roster.is_empty() {
            return Err(SessionError::EmptyRoster);
        }

        let total = self.config.total_duration;
        let mut ledger = DedupLedger::new();
        let mut accepted = 0usize;
        let mut rejected_duplicate = 0usize;
        let mut rejected_unregistered = 0usize;
        let mut reader_errors = 0usize;

        tracing::info!(
            total_secs = total.as_secs(),
            cutoff_secs = self.config.on_time_cutoff.as_secs(),
            registrants = roster.len(),
            "session started"
        );

        let outcome = loop {
            let elapsed = clock.elapsed();
            if elapsed > total {
                break SessionOutcome::DeadlineReached;
            }
            if cancel.load(Ordering::SeqCst) {
                tracing::info!("session cancelled by operator");
                break SessionOutcome::Cancelled;
            }

            let timeout = (total - elapsed).min(POLL_TIMEOUT_CAP);
            let uid = match reader.read_next(timeout) {
                Ok(Some(uid)) => uid,
                Ok(None) => continue,
                Err(err) => {
                    // Transient hardware errors never end the session.
                    tracing::warn!(error = %err, "card read failed, retrying");
                    reader_errors += 1;
                    continue;
                }
            };

            // Re-read the clock: the deadline check is authoritative and a
            // tap observed past it is never classified.
            let observed_at = clock.elapsed();
            if observed_at > total {
                tracing::debug!(%uid, "tap observed after deadline, discarding");
                continue;
            }

            let event = ScanEvent { uid, observed_at };
            match self.handle_event(roster, &mut ledger, signals, event) {
                ScanDisposition::Accepted => accepted += 1,
                ScanDisposition::Duplicate => rejected_duplicate += 1,
                ScanDisposition::Unregistered => rejected_unregistered += 1,
            }
        };

        signals.signal(SignalKind::SessionEnded);
        let ended_at = clock.elapsed();
        let summary = SessionSummary {
            outcome,
            accepted,
            rejected_duplicate,
            rejected_unregistered,
            reader_errors,
            ended_at,
        };
        tracing::info!(?summary, "session loop ended");
        Ok(summary)
    }

    fn handle_event<S: SignalSink>(
        &self,
        roster: &mut Roster,
        ledger: &mut DedupLedger,
        signals: &mut S,
        event: ScanEvent,
    ) -> ScanDisposition {
        if !roster.contains(&event.uid) {
            // Unknown cards never enter the ledger and never touch a record.
            tracing::info!(uid = %event.uid, "card not registered");
            signals.signal(SignalKind::RejectedUnregistered);
            return ScanDisposition::Unregistered;
        }

        if !ledger.insert(event.uid.clone()) {
            tracing::info!(uid = %event.uid, "card already took attendance");
            signals.signal(SignalKind::RejectedDuplicate);
            return ScanDisposition::Duplicate;
        }

        let status = classify(event.observed_at, &self.config);
        match roster.mark(&event.uid, status) {
            Some(record) => {
                tracing::info!(
                    uid = %event.uid,
                    name = %record.display_name,
                    %status,
                    at_secs = event.observed_at.as_secs(),
                    "attendance recorded"
                );
                signals.signal(match status {
                    AttendanceStatus::OnTime => SignalKind::AcceptedOnTime,
                    AttendanceStatus::Late | AttendanceStatus::Absent => SignalKind::AcceptedLate,
                });
                ScanDisposition::Accepted
            }
            None => {
                // Unreachable while the ledger is the sole writer, but a
                // set-once roster must still refuse the overwrite.
                tracing::warn!(uid = %event.uid, "status already set, treating as duplicate");
                signals.signal(SignalKind::RejectedDuplicate);
                ScanDisposition::Duplicate
            }
        }
    }
}

enum ScanDisposition {
    Accepted,
    Duplicate,
    Unregistered,
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::roster::test_roster;

    fn config(total_secs: u64, cutoff_secs: u64) -> SessionConfig {
        SessionConfig::new(
            Duration::from_secs(total_secs),
            Duration::from_secs(cutoff_secs),
        )
        .unwrap()
    }

    #[test]
    fn config_rejects_zero_cutoff() {
        let err = SessionConfig::new(Duration::from_secs(240), Duration::ZERO).unwrap_err();
        assert_eq!(err, SessionConfigError::ZeroCutoff);
    }

    #[test]
    fn config_rejects_cutoff_at_or_past_deadline() {
        for cutoff in [240, 300] {
            let result =
                SessionConfig::new(Duration::from_secs(240), Duration::from_secs(cutoff));
            assert!(matches!(
                result,
                Err(SessionConfigError::CutoffNotBeforeDeadline { .. })
            ));
        }
    }

    #[test]
    fn classify_boundary_is_on_time() {
        let config = config(240, 120);
        assert_eq!(
            classify(Duration::from_secs(120), &config),
            AttendanceStatus::OnTime
        );
        assert_eq!(
            classify(Duration::from_secs(120) + Duration::from_millis(1), &config),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn classify_windows() {
        let config = config(240, 120);
        assert_eq!(
            classify(Duration::ZERO, &config),
            AttendanceStatus::OnTime
        );
        assert_eq!(
            classify(Duration::from_secs(30), &config),
            AttendanceStatus::OnTime
        );
        assert_eq!(
            classify(Duration::from_secs(150), &config),
            AttendanceStatus::Late
        );
        assert_eq!(
            classify(Duration::from_secs(240), &config),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn ledger_is_insert_only() {
        let mut ledger = DedupLedger::new();
        let uid = CardUid::new("a").unwrap();
        assert!(!ledger.contains(&uid));
        assert!(ledger.insert(uid.clone()));
        assert!(ledger.contains(&uid));
        assert!(!ledger.insert(uid));
        assert_eq!(ledger.len(), 1);
    }

    /// One scripted step for the fake reader.
    enum Step {
        /// Advance the shared clock and produce a tap.
        Tap(u64, &'static str),
        /// Produce a transient reader error.
        Fail,
        /// Set the cancel flag.
        Cancel,
    }

    #[derive(Debug, Error)]
    #[error("scripted reader error")]
    struct FakeReadError;

    /// Replays scripted taps, advancing a shared clock as it goes. When the
    /// script runs out the clock jumps past the deadline.
    struct ScriptedReader {
        steps: RefCell<VecDeque<Step>>,
        clock: Rc<Cell<Duration>>,
        deadline_secs: u64,
        cancel: &'static AtomicBool,
    }

    impl CardReader for ScriptedReader {
        type Error = FakeReadError;

        fn read_next(&mut self, _timeout: Duration) -> Result<Option<CardUid>, Self::Error> {
            match self.steps.borrow_mut().pop_front() {
                Some(Step::Tap(at_secs, uid)) => {
                    self.clock.set(Duration::from_secs(at_secs));
                    Ok(Some(CardUid::new(uid).unwrap()))
                }
                Some(Step::Fail) => Err(FakeReadError),
                Some(Step::Cancel) => {
                    self.cancel.store(true, Ordering::SeqCst);
                    Ok(None)
                }
                None => {
                    self.clock.set(Duration::from_secs(self.deadline_secs + 1));
                    Ok(None)
                }
            }
        }
    }

    struct SharedClock(Rc<Cell<Duration>>);

    impl Clock for SharedClock {
        fn elapsed(&self) -> Duration {
            self.0.get()
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        cues: Vec<SignalKind>,
    }

    impl SignalSink for CollectingSink {
        fn signal(&mut self, kind: SignalKind) {
            self.cues.push(kind);
        }
    }

    fn leaked_flag() -> &'static AtomicBool {
        Box::leak(Box::new(AtomicBool::new(false)))
    }

    fn run_script(
        roster: &mut Roster,
        config: SessionConfig,
        steps: Vec<Step>,
    ) -> (SessionSummary, Vec<SignalKind>) {
        let cancel = leaked_flag();
        let clock = Rc::new(Cell::new(Duration::ZERO));
        let mut reader = ScriptedReader {
            steps: RefCell::new(steps.into()),
            clock: Rc::clone(&clock),
            deadline_secs: config.total_duration().as_secs(),
            cancel,
        };
        let mut sink = CollectingSink::default();
        let controller = SessionController::new(config);
        let summary = controller
            .run(roster, &mut reader, &mut sink, &SharedClock(clock), cancel)
            .unwrap();
        (summary, sink.cues)
    }

    #[test]
    fn empty_roster_fails_before_the_loop() {
        let mut roster = test_roster(&[]);
        let err = run_empty(&mut roster);
        assert_eq!(err, SessionError::EmptyRoster);
    }

    fn run_empty(roster: &mut Roster) -> SessionError {
        let cancel = leaked_flag();
        let clock = Rc::new(Cell::new(Duration::ZERO));
        let mut reader = ScriptedReader {
            steps: RefCell::new(VecDeque::new()),
            clock: Rc::clone(&clock),
            deadline_secs: 240,
            cancel,
        };
        let mut sink = CollectingSink::default();
        SessionController::new(config(240, 120))
            .run(roster, &mut reader, &mut sink, &SharedClock(clock), cancel)
            .unwrap_err()
    }

    #[test]
    fn end_to_end_scenario_on_time_late_duplicate_absent() {
        // Roster [A, B, C], total 240s, cutoff 120s.
        let mut roster = test_roster(&["A", "B", "C"]);
        let (summary, cues) = run_script(
            &mut roster,
            config(240, 120),
            vec![
                Step::Tap(30, "A"),
                Step::Tap(150, "B"),
                Step::Tap(200, "A"),
            ],
        );

        assert_eq!(summary.outcome, SessionOutcome::DeadlineReached);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected_duplicate, 1);
        assert_eq!(summary.rejected_unregistered, 0);

        let status = |uid: &str| {
            roster
                .get(&CardUid::new(uid).unwrap())
                .unwrap()
                .status
        };
        assert_eq!(status("A"), Some(AttendanceStatus::OnTime));
        assert_eq!(status("B"), Some(AttendanceStatus::Late));
        assert_eq!(status("C"), None); // resolved to Absent by finalization

        assert_eq!(
            cues,
            vec![
                SignalKind::AcceptedOnTime,
                SignalKind::AcceptedLate,
                SignalKind::RejectedDuplicate,
                SignalKind::SessionEnded,
            ]
        );
    }

    #[test]
    fn unregistered_card_never_mutates_roster() {
        let mut roster = test_roster(&["A"]);
        let (summary, cues) = run_script(
            &mut roster,
            config(240, 120),
            vec![Step::Tap(10, "XYZ"), Step::Tap(20, "XYZ")],
        );

        // Not in the ledger either: both taps reject as unregistered, not
        // as duplicates.
        assert_eq!(summary.rejected_unregistered, 2);
        assert_eq!(summary.rejected_duplicate, 0);
        assert!(roster.iter().all(|r| r.status.is_none()));
        assert_eq!(
            cues,
            vec![
                SignalKind::RejectedUnregistered,
                SignalKind::RejectedUnregistered,
                SignalKind::SessionEnded,
            ]
        );
    }

    #[test]
    fn duplicate_scan_never_changes_status() {
        let mut roster = test_roster(&["A"]);
        let (summary, _) = run_script(
            &mut roster,
            config(240, 120),
            vec![Step::Tap(30, "A"), Step::Tap(200, "A")],
        );

        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected_duplicate, 1);
        // The late re-scan must not downgrade the on-time status.
        assert_eq!(
            roster.get(&CardUid::new("A").unwrap()).unwrap().status,
            Some(AttendanceStatus::OnTime)
        );
    }

    #[test]
    fn boundary_tap_at_cutoff_is_on_time() {
        let mut roster = test_roster(&["A"]);
        let (_, cues) = run_script(
            &mut roster,
            config(240, 120),
            vec![Step::Tap(120, "A")],
        );
        assert_eq!(
            roster.get(&CardUid::new("A").unwrap()).unwrap().status,
            Some(AttendanceStatus::OnTime)
        );
        assert_eq!(cues[0], SignalKind::AcceptedOnTime);
    }

    #[test]
    fn tap_at_deadline_is_still_late_not_discarded() {
        let mut roster = test_roster(&["A"]);
        let (summary, _) = run_script(
            &mut roster,
            config(240, 120),
            vec![Step::Tap(240, "A")],
        );
        assert_eq!(summary.accepted, 1);
        assert_eq!(
            roster.get(&CardUid::new("A").unwrap()).unwrap().status,
            Some(AttendanceStatus::Late)
        );
    }

    #[test]
    fn tap_past_deadline_is_never_classified() {
        let mut roster = test_roster(&["A"]);
        let (summary, cues) = run_script(
            &mut roster,
            config(240, 120),
            vec![Step::Tap(241, "A")],
        );
        assert_eq!(summary.accepted, 0);
        assert!(roster.iter().all(|r| r.status.is_none()));
        assert_eq!(cues, vec![SignalKind::SessionEnded]);
    }

    #[test]
    fn reader_errors_are_swallowed_and_counted() {
        let mut roster = test_roster(&["A"]);
        let (summary, _) = run_script(
            &mut roster,
            config(240, 120),
            vec![Step::Fail, Step::Fail, Step::Tap(60, "A")],
        );
        assert_eq!(summary.reader_errors, 2);
        assert_eq!(summary.accepted, 1);
    }

    #[test]
    fn cancellation_ends_the_loop_with_partial_state() {
        let mut roster = test_roster(&["A", "B"]);
        let (summary, cues) = run_script(
            &mut roster,
            config(240, 120),
            vec![Step::Tap(30, "A"), Step::Cancel, Step::Tap(60, "B")],
        );

        assert_eq!(summary.outcome, SessionOutcome::Cancelled);
        assert_eq!(summary.accepted, 1);
        assert_eq!(
            roster.get(&CardUid::new("A").unwrap()).unwrap().status,
            Some(AttendanceStatus::OnTime)
        );
        // B was never processed; finalization will mark it absent.
        assert_eq!(roster.get(&CardUid::new("B").unwrap()).unwrap().status, None);
        assert_eq!(*cues.last().unwrap(), SignalKind::SessionEnded);
    }
}
