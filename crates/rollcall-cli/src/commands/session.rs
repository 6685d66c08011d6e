//! Session command: the time-boxed attendance-capture run.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

use rollcall_core::{
    MonotonicClock, RosterStore, SessionConfig, SessionController, SessionReport, dispatch,
    finalize,
};
use rollcall_db::Database;
use rollcall_notify::BlockingNotifier;

use crate::Config;
use crate::commands::util::{build_reader, build_signaler};

/// Options for one session run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub duration_secs: Option<u64>,
    pub cutoff_secs: Option<u64>,
    pub date: Option<NaiveDate>,
    pub json: bool,
}

/// Runs an attendance session end to end: load roster, capture scans
/// until the deadline or Ctrl-C, finalize, persist, dispatch, print.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, config: &Config, opts: RunOptions) -> Result<()> {
    let total = Duration::from_secs(opts.duration_secs.unwrap_or(config.session.total_secs));
    let cutoff =
        Duration::from_secs(opts.cutoff_secs.unwrap_or(config.session.on_time_cutoff_secs));
    let session_config =
        SessionConfig::new(total, cutoff).context("invalid session windows")?;
    let date = opts.date.unwrap_or_else(|| Local::now().date_naive());

    // Fatal-at-start: an unreadable or empty roster aborts before the loop.
    let mut roster = db.load_roster().context("failed to load roster")?;

    let mut reader = build_reader(config)?;
    let mut signals = build_signaler(config)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
        .context("failed to install cancellation handler")?;

    let controller = SessionController::new(session_config);
    let clock = MonotonicClock::start();
    let summary = controller
        .run(&mut roster, &mut reader, &mut signals, &clock, &cancel)
        .context("session failed to start")?;

    let absent = finalize(&mut roster);
    tracing::debug!(absent, "finalization complete");

    let report = SessionReport::from_roster(date, Some(&session_config), &roster)
        .context("finalization left unresolved registrants")?;

    let outcome = match &config.notify {
        Some(notify) => {
            let mut notifier =
                BlockingNotifier::new(notify.endpoint.clone(), notify.auth_token.clone())
                    .context("failed to initialize notifier")?;
            dispatch(
                db,
                date,
                &roster,
                &report,
                Some(&mut notifier),
                &notify.recipient,
            )
        }
        None => dispatch::<_, BlockingNotifier>(db, date, &roster, &report, None, ""),
    }
    .context("failed to save attendance")?;

    if opts.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write!(writer, "{}", report.render_table())?;
        writeln!(
            writer,
            "session ended ({:?}) after {}s; scans: {} accepted, {} duplicate, {} unregistered",
            summary.outcome,
            summary.ended_at.as_secs(),
            summary.accepted,
            summary.rejected_duplicate,
            summary.rejected_unregistered,
        )?;
    }

    if let Some(err) = outcome.notify_error {
        // Non-fatal: the saved report is the source of truth for this run.
        writeln!(writer, "warning: report notification failed: {err}")?;
    }

    Ok(())
}
