//! Identifier types for timetable entities.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when an identifier is blank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: must not be blank")]
pub struct InvalidId {
    kind: &'static str,
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Parse an identifier, trimming surrounding whitespace.
            ///
            /// Blank input is rejected.
            pub fn parse(s: &str) -> Result<Self, InvalidId> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(InvalidId { kind: $kind });
                }
                Ok(Self(Arc::from(trimmed)))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

string_id!(
    /// Identifier of a stop, as it appears in the feed.
    ///
    /// Cloning is cheap; the engines clone these freely into labels and
    /// frontiers.
    ///
    /// ```
    /// use transit_planner::domain::StopId;
    ///
    /// let stop = StopId::parse(" 8503000 ").unwrap();
    /// assert_eq!(stop.as_str(), "8503000");
    /// assert!(StopId::parse("   ").is_err());
    /// ```
    StopId,
    "stop"
);

string_id!(
    /// Identifier of a scheduled trip.
    TripId,
    "trip"
);

string_id!(
    /// Identifier of a route.
    RouteId,
    "route"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims() {
        let id = StopId::parse("  A ").unwrap();
        assert_eq!(id.as_str(), "A");
        assert_eq!(id.to_string(), "A");
        assert_eq!(format!("{id:?}"), "StopId(A)");
    }

    #[test]
    fn reject_blank() {
        assert!(StopId::parse("").is_err());
        assert!(TripId::parse("\t").is_err());
        let err = RouteId::parse(" ").unwrap_err();
        assert_eq!(err.to_string(), "invalid route id: must not be blank");
    }

    #[test]
    fn serde_as_plain_string() {
        let id = StopId::parse("B").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"B\"");
        let back: StopId = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<StopId>("\"\"").is_err());
    }
}
