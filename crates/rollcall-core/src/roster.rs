//! The roster: card-to-identity bindings plus per-session statuses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AttendanceStatus, CardUid, RegistrantId};

/// Roster construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RosterError {
    /// Two records share the same card UID. The store must never hand the
    /// core a roster with duplicates; this is a load-time failure, not
    /// something to merge silently.
    #[error("duplicate card UID in roster: {uid}")]
    DuplicateUid { uid: CardUid },
}

/// One registrant's entry in the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrantRecord {
    /// The bound card UID, unique across the roster.
    pub uid: CardUid,
    /// Administratively assigned identifier.
    pub registrant_id: RegistrantId,
    /// Human-readable name.
    pub display_name: String,
    /// Session status; `None` until a scan is accepted or finalization
    /// marks the registrant absent. Set at most once per session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AttendanceStatus>,
}

impl RegistrantRecord {
    /// Creates a record with no session status.
    pub fn new(uid: CardUid, registrant_id: RegistrantId, display_name: impl Into<String>) -> Self {
        Self {
            uid,
            registrant_id,
            display_name: display_name.into(),
            status: None,
        }
    }
}

/// An ordered sequence of registrants keyed by card UID.
///
/// The index gives O(1) lookup by UID; iteration preserves enrollment
/// order. Exclusively owned by the session controller for the session's
/// lifetime, then consumed by the report finalizer.
#[derive(Debug, Clone)]
pub struct Roster {
    records: Vec<RegistrantRecord>,
    index: HashMap<CardUid, usize>,
}

impl Roster {
    /// Builds a roster, enforcing UID uniqueness.
    pub fn new(records: Vec<RegistrantRecord>) -> Result<Self, RosterError> {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if index.insert(record.uid.clone(), position).is_some() {
                return Err(RosterError::DuplicateUid {
                    uid: record.uid.clone(),
                });
            }
        }
        Ok(Self { records, index })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a card UID is enrolled.
    #[must_use]
    pub fn contains(&self, uid: &CardUid) -> bool {
        self.index.contains_key(uid)
    }

    /// Looks up a record by UID.
    #[must_use]
    pub fn get(&self, uid: &CardUid) -> Option<&RegistrantRecord> {
        self.index.get(uid).map(|&i| &self.records[i])
    }

    /// Sets a registrant's status, once.
    ///
    /// Returns the record if the UID is enrolled and the status was unset;
    /// `None` if the UID is unknown or the status was already assigned.
    pub fn mark(&mut self, uid: &CardUid, status: AttendanceStatus) -> Option<&RegistrantRecord> {
        let position = *self.index.get(uid)?;
        let record = &mut self.records[position];
        if record.status.is_some() {
            return None;
        }
        record.status = Some(status);
        Some(&self.records[position])
    }

    /// Iterates records in enrollment order.
    pub fn iter(&self) -> std::slice::Iter<'_, RegistrantRecord> {
        self.records.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, RegistrantRecord> {
        self.records.iter_mut()
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a RegistrantRecord;
    type IntoIter = std::slice::Iter<'a, RegistrantRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
pub(crate) fn test_roster(uids: &[&str]) -> Roster {
    let records = uids
        .iter()
        .enumerate()
        .map(|(i, uid)| {
            RegistrantRecord::new(
                CardUid::new(*uid).unwrap(),
                RegistrantId::new(format!("{}", 1000 + i)).unwrap(),
                format!("Registrant {i}"),
            )
        })
        .collect();
    Roster::new(records).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_uid_is_a_construction_error() {
        let records = vec![
            RegistrantRecord::new(
                CardUid::new("111").unwrap(),
                RegistrantId::new("1").unwrap(),
                "Amira",
            ),
            RegistrantRecord::new(
                CardUid::new("111").unwrap(),
                RegistrantId::new("2").unwrap(),
                "Bilal",
            ),
        ];
        let err = Roster::new(records).unwrap_err();
        assert_eq!(
            err,
            RosterError::DuplicateUid {
                uid: CardUid::new("111").unwrap()
            }
        );
    }

    #[test]
    fn lookup_and_order_preserved() {
        let roster = test_roster(&["a", "b", "c"]);
        assert_eq!(roster.len(), 3);
        assert!(roster.contains(&CardUid::new("b").unwrap()));
        assert!(!roster.contains(&CardUid::new("z").unwrap()));
        let order: Vec<&str> = roster.iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn mark_sets_status_once() {
        let mut roster = test_roster(&["a", "b"]);
        let uid = CardUid::new("a").unwrap();

        let marked = roster.mark(&uid, AttendanceStatus::OnTime);
        assert_eq!(marked.unwrap().status, Some(AttendanceStatus::OnTime));

        // Second mark must not overwrite.
        assert!(roster.mark(&uid, AttendanceStatus::Late).is_none());
        assert_eq!(
            roster.get(&uid).unwrap().status,
            Some(AttendanceStatus::OnTime)
        );
    }

    #[test]
    fn mark_unknown_uid_is_noop() {
        let mut roster = test_roster(&["a"]);
        assert!(
            roster
                .mark(&CardUid::new("nope").unwrap(), AttendanceStatus::Late)
                .is_none()
        );
        assert!(roster.iter().all(|r| r.status.is_none()));
    }
}
