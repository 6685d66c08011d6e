//! Storage layer for the attendance system.
//!
//! Provides persistence for the roster and per-session attendance using
//! `rusqlite`. The original deployment kept everything in one spreadsheet
//! with a column per session date; here that layout becomes a
//! `registrants` table plus an `attendance` row per (uid, date).
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. A `Database` can move between threads but needs external
//! synchronization to be shared.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in ISO 8601 (e.g. `2024-01-15T10:30:00Z`);
//! session dates as `YYYY-MM-DD`. Lexicographic order matches chronological
//! order for both.

use std::path::Path;

use chrono::{NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use rollcall_core::{
    AttendanceStatus, CardUid, RegistrantId, RegistrantRecord, ReportEntry, Roster, RosterError,
    RosterStore, ValidationError,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored value failed core validation (empty uid, unknown status).
    #[error("corrupt row: {0}")]
    CorruptRow(String),
    /// The stored roster violated a core invariant.
    #[error(transparent)]
    Roster(#[from] RosterError),
    /// The card is already bound to a registrant.
    #[error("card {uid} is already registered")]
    AlreadyRegistered { uid: CardUid },
    /// The card has no binding.
    #[error("card {uid} is not registered")]
    NotRegistered { uid: CardUid },
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        Self::CorruptRow(err.to_string())
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS registrants (
                uid TEXT PRIMARY KEY,
                registrant_id TEXT NOT NULL,
                display_name TEXT NOT NULL,
                position INTEGER NOT NULL,
                enrolled_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_registrants_position ON registrants(position);

            -- One row per (card, session date); re-running a session for
            -- the same date overwrites that date's statuses.
            CREATE TABLE IF NOT EXISTS attendance (
                uid TEXT NOT NULL,
                session_date TEXT NOT NULL,
                status TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                PRIMARY KEY (uid, session_date),
                FOREIGN KEY (uid) REFERENCES registrants(uid) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(session_date);
            ",
        )?;
        Ok(())
    }

    /// Binds a card to a registrant identity.
    ///
    /// Fails with [`DbError::AlreadyRegistered`] if the card is known.
    pub fn add_registrant(
        &mut self,
        uid: &CardUid,
        registrant_id: &RegistrantId,
        display_name: &str,
    ) -> Result<(), DbError> {
        let exists: Option<String> = self
            .conn
            .query_row(
                "SELECT uid FROM registrants WHERE uid = ?",
                params![uid.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(DbError::AlreadyRegistered { uid: uid.clone() });
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.conn.execute(
            "
            INSERT INTO registrants (uid, registrant_id, display_name, position, enrolled_at)
            VALUES (?, ?, ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM registrants), ?)
            ",
            params![uid.as_str(), registrant_id.as_str(), display_name, now],
        )?;
        tracing::debug!(uid = %uid, name = display_name, "registrant enrolled");
        Ok(())
    }

    /// Looks up a card binding.
    pub fn find_registrant(&self, uid: &CardUid) -> Result<Option<RegistrantRecord>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT uid, registrant_id, display_name FROM registrants WHERE uid = ?",
                params![uid.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(uid, registrant_id, name)| {
            Ok(RegistrantRecord::new(
                CardUid::new(uid)?,
                RegistrantId::new(registrant_id)?,
                name,
            ))
        })
        .transpose()
    }

    /// Deletes a card binding and, via cascade, its attendance rows.
    ///
    /// Fails with [`DbError::NotRegistered`] if the card is unknown.
    pub fn remove_registrant(&mut self, uid: &CardUid) -> Result<(), DbError> {
        let deleted = self.conn.execute(
            "DELETE FROM registrants WHERE uid = ?",
            params![uid.as_str()],
        )?;
        if deleted == 0 {
            return Err(DbError::NotRegistered { uid: uid.clone() });
        }
        tracing::debug!(uid = %uid, "registrant removed");
        Ok(())
    }

    /// Lists all registrants in enrollment order.
    pub fn list_registrants(&self) -> Result<Vec<RegistrantRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT uid, registrant_id, display_name
            FROM registrants
            ORDER BY position ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (uid, registrant_id, name) = row?;
            records.push(RegistrantRecord::new(
                CardUid::new(uid)?,
                RegistrantId::new(registrant_id)?,
                name,
            ));
        }
        Ok(records)
    }

    /// Statuses recorded for one session date, in enrollment order.
    ///
    /// Registrants enrolled after the session ran appear with no row and
    /// are skipped; this reads back exactly what the session saved.
    pub fn session_entries(&self, date: NaiveDate) -> Result<Vec<ReportEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT r.uid, r.registrant_id, r.display_name, a.status
            FROM attendance a
            JOIN registrants r ON r.uid = a.uid
            WHERE a.session_date = ?
            ORDER BY r.position ASC
            ",
        )?;
        let rows = stmt.query_map(params![date.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut entries = Vec::new();
        for row in rows {
            let (uid, registrant_id, name, status) = row?;
            entries.push(ReportEntry {
                uid: CardUid::new(uid)?,
                registrant_id: RegistrantId::new(registrant_id)?,
                display_name: name,
                status: status
                    .parse::<AttendanceStatus>()
                    .map_err(|e| DbError::CorruptRow(e.to_string()))?,
            });
        }
        Ok(entries)
    }

    /// Dates with at least one attendance row, most recent first.
    pub fn session_dates(&self) -> Result<Vec<NaiveDate>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT session_date FROM attendance ORDER BY session_date DESC",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut dates = Vec::new();
        for row in rows {
            let raw = row?;
            dates.push(
                raw.parse::<NaiveDate>()
                    .map_err(|e| DbError::CorruptRow(format!("bad session date {raw}: {e}")))?,
            );
        }
        Ok(dates)
    }
}

impl RosterStore for Database {
    type Error = DbError;

    /// Loads the full roster in enrollment order, with unset statuses.
    ///
    /// Duplicate UIDs are structurally impossible here (primary key), but
    /// the core re-validates on construction regardless.
    fn load_roster(&self) -> Result<Roster, Self::Error> {
        let records = self.list_registrants()?;
        Ok(Roster::new(records)?)
    }

    /// Persists one session's statuses in a single transaction.
    fn save_session(&mut self, date: NaiveDate, roster: &Roster) -> Result<(), Self::Error> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR REPLACE INTO attendance (uid, session_date, status, recorded_at)
                VALUES (?, ?, ?, ?)
                ",
            )?;
            for record in roster {
                let Some(status) = record.status else {
                    // Callers finalize before saving; skip rather than
                    // invent a status for an unset record.
                    tracing::warn!(uid = %record.uid, "skipping unset status in save");
                    continue;
                };
                stmt.execute(params![
                    record.uid.as_str(),
                    date.to_string(),
                    status.as_str(),
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::finalize;

    fn uid(s: &str) -> CardUid {
        CardUid::new(s).unwrap()
    }

    fn rid(s: &str) -> RegistrantId {
        RegistrantId::new(s).unwrap()
    }

    fn seeded_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.add_registrant(&uid("111"), &rid("1"), "Amira").unwrap();
        db.add_registrant(&uid("222"), &rid("2"), "Bilal").unwrap();
        db.add_registrant(&uid("333"), &rid("3"), "Chadi").unwrap();
        db
    }

    #[test]
    fn open_creates_schema_on_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("rollcall.db");
        let mut db = Database::open(&path).unwrap();
        db.add_registrant(&uid("111"), &rid("1"), "Amira").unwrap();
        drop(db);

        // Re-open and read back.
        let db = Database::open(&path).unwrap();
        let records = db.list_registrants().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].display_name, "Amira");
    }

    #[test]
    fn duplicate_enrollment_is_rejected() {
        let mut db = seeded_db();
        let err = db.add_registrant(&uid("111"), &rid("9"), "Other").unwrap_err();
        assert!(matches!(err, DbError::AlreadyRegistered { .. }));
    }

    #[test]
    fn find_and_remove_registrant() {
        let mut db = seeded_db();

        let found = db.find_registrant(&uid("222")).unwrap().unwrap();
        assert_eq!(found.display_name, "Bilal");
        assert!(db.find_registrant(&uid("999")).unwrap().is_none());

        db.remove_registrant(&uid("222")).unwrap();
        assert!(db.find_registrant(&uid("222")).unwrap().is_none());

        let err = db.remove_registrant(&uid("222")).unwrap_err();
        assert!(matches!(err, DbError::NotRegistered { .. }));
    }

    #[test]
    fn roster_loads_in_enrollment_order() {
        let db = seeded_db();
        let roster = db.load_roster().unwrap();
        let order: Vec<&str> = roster.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(order, vec!["Amira", "Bilal", "Chadi"]);
        assert!(roster.iter().all(|r| r.status.is_none()));
    }

    #[test]
    fn save_session_round_trips_statuses() {
        let mut db = seeded_db();
        let mut roster = db.load_roster().unwrap();
        roster.mark(&uid("111"), AttendanceStatus::OnTime);
        roster.mark(&uid("222"), AttendanceStatus::Late);
        finalize(&mut roster);

        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        db.save_session(date, &roster).unwrap();

        let entries = db.session_entries(date).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].status, AttendanceStatus::OnTime);
        assert_eq!(entries[1].status, AttendanceStatus::Late);
        assert_eq!(entries[2].status, AttendanceStatus::Absent);
    }

    #[test]
    fn rerunning_a_date_overwrites_that_column() {
        let mut db = seeded_db();
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        let mut first = db.load_roster().unwrap();
        finalize(&mut first); // everyone absent
        db.save_session(date, &first).unwrap();

        let mut second = db.load_roster().unwrap();
        second.mark(&uid("111"), AttendanceStatus::OnTime);
        finalize(&mut second);
        db.save_session(date, &second).unwrap();

        let entries = db.session_entries(date).unwrap();
        assert_eq!(entries[0].status, AttendanceStatus::OnTime);
        assert_eq!(db.session_dates().unwrap(), vec![date]);
    }

    #[test]
    fn removing_a_registrant_cascades_attendance() {
        let mut db = seeded_db();
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let mut roster = db.load_roster().unwrap();
        finalize(&mut roster);
        db.save_session(date, &roster).unwrap();

        db.remove_registrant(&uid("111")).unwrap();
        let entries = db.session_entries(date).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn session_dates_sorted_descending() {
        let mut db = seeded_db();
        let mut roster = db.load_roster().unwrap();
        finalize(&mut roster);
        let d1 = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        db.save_session(d1, &roster).unwrap();
        db.save_session(d2, &roster).unwrap();

        assert_eq!(db.session_dates().unwrap(), vec![d2, d1]);
    }
}
