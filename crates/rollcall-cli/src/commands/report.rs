//! Report command: show a recorded session.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::NaiveDate;

use rollcall_core::SessionReport;
use rollcall_db::Database;

/// Prints the attendance recorded for `date`, defaulting to the most
/// recent session.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    date: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let date = match date {
        Some(date) => date,
        None => match db.session_dates()?.into_iter().next() {
            Some(latest) => latest,
            None => bail!("no sessions recorded yet"),
        },
    };

    let entries = db.session_entries(date)?;
    if entries.is_empty() {
        bail!("no session recorded for {date}");
    }

    let report = SessionReport::from_entries(date, None, entries);
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write!(writer, "{}", report.render_table())?;
    }
    Ok(())
}
