//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated proximity-card UID.
    ///
    /// UIDs must be non-empty strings. They are unique across the roster,
    /// with uniqueness enforced when the roster is constructed and again
    /// at the database level.
    CardUid, "card UID"
);

define_string_id!(
    /// A validated registrant identifier assigned at enrollment.
    ///
    /// Distinct from the card UID: the UID identifies the physical card,
    /// this identifies the person in the institution's own numbering.
    RegistrantId, "registrant ID"
);

/// Final attendance status for one registrant in one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    /// Scanned within the on-time window.
    OnTime,
    /// Scanned after the cutoff but before the deadline.
    Late,
    /// Never scanned; assigned by finalization.
    Absent,
}

impl AttendanceStatus {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OnTime => "on_time",
            Self::Late => "late",
            Self::Absent => "absent",
        }
    }

    /// The mark used in human-facing report output.
    ///
    /// Kept from the original attendance sheet: checkmark for on-time,
    /// crossmark for late, and a literal phrase for absences.
    #[must_use]
    pub const fn mark(&self) -> &'static str {
        match self {
            Self::OnTime => "\u{2714}",
            Self::Late => "\u{2718}",
            Self::Absent => "not attend",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_time" => Ok(Self::OnTime),
            "late" => Ok(Self::Late),
            "absent" => Ok(Self::Absent),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl Serialize for AttendanceStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown attendance status strings.
#[derive(Debug, Clone)]
pub struct UnknownStatus(String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown attendance status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_uid_rejects_empty() {
        assert!(CardUid::new("").is_err());
        assert!(CardUid::new("589569966promote").is_ok());
    }

    #[test]
    fn registrant_id_rejects_empty() {
        assert!(RegistrantId::new("").is_err());
        assert!(RegistrantId::new("1042").is_ok());
    }

    #[test]
    fn card_uid_serde_roundtrip() {
        let uid = CardUid::new("589569966").unwrap();
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, "\"589569966\"");
        let parsed: CardUid = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, uid);
    }

    #[test]
    fn card_uid_serde_rejects_empty() {
        let result: Result<CardUid, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn card_uid_as_ref() {
        let uid = CardUid::new("12345").unwrap();
        let s: &str = uid.as_ref();
        assert_eq!(s, "12345");
    }

    #[test]
    fn status_roundtrip_all_variants() {
        for status in [
            AttendanceStatus::OnTime,
            AttendanceStatus::Late,
            AttendanceStatus::Absent,
        ] {
            let s = status.as_str();
            let parsed: AttendanceStatus = s.parse().expect("should parse");
            assert_eq!(parsed, status, "roundtrip failed for {status:?}");
            assert_eq!(status.to_string(), s);
        }
    }

    #[test]
    fn status_serde_matches_as_str() {
        // Prevents inconsistency between JSON reports and DB storage.
        for status in [
            AttendanceStatus::OnTime,
            AttendanceStatus::Late,
            AttendanceStatus::Absent,
        ] {
            let value = serde_json::to_value(status).unwrap();
            assert_eq!(value.as_str().unwrap(), status.as_str());
        }
    }

    #[test]
    fn status_unknown_string_errors() {
        let result: Result<AttendanceStatus, _> = "present".parse();
        assert!(result.is_err());
    }

    #[test]
    fn status_marks() {
        assert_eq!(AttendanceStatus::OnTime.mark(), "\u{2714}");
        assert_eq!(AttendanceStatus::Late.mark(), "\u{2718}");
        assert_eq!(AttendanceStatus::Absent.mark(), "not attend");
    }
}
