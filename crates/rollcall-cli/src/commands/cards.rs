//! Card registration commands: the roster CRUD surface.

use std::io::Write;

use anyhow::{Context, Result, bail};

use rollcall_core::{RegistrantId, SignalKind, SignalSink};
use rollcall_db::{Database, DbError};

use crate::Config;
use crate::commands::util::{build_signaler, resolve_uid};

/// Binds a card to a registrant identity.
pub fn enroll<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    id: &str,
    name: &str,
    uid_flag: Option<&str>,
) -> Result<()> {
    let registrant_id = RegistrantId::new(id).context("invalid --id value")?;
    if name.trim().is_empty() {
        bail!("--name cannot be empty");
    }

    let uid = resolve_uid(uid_flag, config)?;
    let mut signals = build_signaler(config)?;

    match db.add_registrant(&uid, &registrant_id, name.trim()) {
        Ok(()) => {
            signals.signal(SignalKind::AcceptedOnTime);
            writeln!(writer, "Enrolled {name} (id {id}) on card {uid}")?;
            Ok(())
        }
        Err(err @ DbError::AlreadyRegistered { .. }) => {
            signals.signal(SignalKind::RejectedDuplicate);
            Err(err).context("card is already enrolled")
        }
        Err(err) => Err(err).context("failed to enroll card"),
    }
}

/// Shows the binding for a card.
pub fn show<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    uid_flag: Option<&str>,
) -> Result<()> {
    let uid = resolve_uid(uid_flag, config)?;
    let mut signals = build_signaler(config)?;

    match db.find_registrant(&uid)? {
        Some(record) => {
            signals.signal(SignalKind::AcceptedOnTime);
            writeln!(
                writer,
                "UID: {}  ID: {}  Name: {}",
                record.uid,
                record.registrant_id.as_str(),
                record.display_name
            )?;
            Ok(())
        }
        None => {
            signals.signal(SignalKind::RejectedUnregistered);
            bail!("card {uid} is not registered")
        }
    }
}

/// Deletes the binding for a card.
pub fn remove<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    uid_flag: Option<&str>,
) -> Result<()> {
    let uid = resolve_uid(uid_flag, config)?;
    let mut signals = build_signaler(config)?;

    match db.remove_registrant(&uid) {
        Ok(()) => {
            signals.signal(SignalKind::AcceptedOnTime);
            writeln!(writer, "Removed card {uid}")?;
            Ok(())
        }
        Err(err @ DbError::NotRegistered { .. }) => {
            signals.signal(SignalKind::RejectedUnregistered);
            Err(err).context("cannot remove an unknown card")
        }
        Err(err) => Err(err).context("failed to remove card"),
    }
}

/// Lists all enrolled cards in enrollment order.
pub fn list<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let records = db.list_registrants()?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&records)?)?;
        return Ok(());
    }

    if records.is_empty() {
        writeln!(writer, "No cards enrolled.")?;
        return Ok(());
    }
    for record in records {
        writeln!(
            writer,
            "{}  {}  {}",
            record.uid,
            record.registrant_id.as_str(),
            record.display_name
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use rollcall_core::CardUid;

    fn seeded_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.add_registrant(
            &CardUid::new("111").unwrap(),
            &RegistrantId::new("1").unwrap(),
            "Amira",
        )
        .unwrap();
        db.add_registrant(
            &CardUid::new("222").unwrap(),
            &RegistrantId::new("2").unwrap(),
            "Bilal",
        )
        .unwrap();
        db
    }

    #[test]
    fn list_outputs_enrollment_order() {
        let db = seeded_db();
        let mut output = Vec::new();
        list(&mut output, &db, false).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        111  1  Amira
        222  2  Bilal
        ");
    }

    #[test]
    fn list_empty_roster() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        list(&mut output, &db, false).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "No cards enrolled.\n");
    }

    #[test]
    fn list_json_round_trips() {
        let db = seeded_db();
        let mut output = Vec::new();
        list(&mut output, &db, true).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["display_name"], "Amira");
    }

    #[test]
    fn enroll_and_remove_by_uid_flag() {
        let mut db = Database::open_in_memory().unwrap();
        let config = Config::default();
        let mut output = Vec::new();

        enroll(&mut output, &mut db, &config, "7", "Chadi", Some("333")).unwrap();
        assert!(
            db.find_registrant(&CardUid::new("333").unwrap())
                .unwrap()
                .is_some()
        );

        // Duplicate enrollment fails.
        let err = enroll(&mut output, &mut db, &config, "8", "Dina", Some("333"));
        assert!(err.is_err());

        remove(&mut output, &mut db, &config, Some("333")).unwrap();
        assert!(
            db.find_registrant(&CardUid::new("333").unwrap())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn show_unknown_card_fails() {
        let db = seeded_db();
        let config = Config::default();
        let mut output = Vec::new();
        let result = show(&mut output, &db, &config, Some("999"));
        assert!(result.is_err());
    }
}
