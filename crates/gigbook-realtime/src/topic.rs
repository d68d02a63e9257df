use crate::error::{BusError, BusResult};
use std::borrow::Borrow;
use std::fmt;

/// Name of a class of events. Any string with at least one non-whitespace
/// character is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(String);

impl Topic {
    pub fn new(name: impl Into<String>) -> BusResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BusError::InvalidTopic(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets the registry be queried with a plain `&str`.
impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Topic {
    type Error = BusError;

    fn try_from(value: &str) -> BusResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for Topic {
    type Error = BusError;

    fn try_from(value: String) -> BusResult<Self> {
        Self::new(value)
    }
}

/// Topics the marketplace publishes on.
pub mod names {
    pub const BOOKING_CREATED: &str = "booking.created";
    pub const BOOKING_UPDATED: &str = "booking.updated";
    pub const BOOKING_CANCELLED: &str = "booking.cancelled";
    pub const MESSAGE_RECEIVED: &str = "message.received";
    pub const NOTIFICATION_PUSHED: &str = "notification.pushed";
    pub const ROSTER_CLAIMED: &str = "roster.claimed";
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn accepts_any_non_blank_string() {
        assert_eq!(Topic::new("booking.updated").unwrap().as_str(), "booking.updated");
        assert_eq!(Topic::new("x").unwrap().to_string(), "x");
        assert_eq!(Topic::new(" padded ").unwrap().as_str(), " padded ");
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert!(matches!(Topic::new(""), Err(BusError::InvalidTopic(_))));
        assert!(matches!(Topic::try_from(" \t\n"), Err(BusError::InvalidTopic(_))));
    }

    #[test]
    fn map_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(Topic::new(names::ROSTER_CLAIMED).unwrap(), 3);
        assert_eq!(map.get("roster.claimed"), Some(&3));
    }
}
