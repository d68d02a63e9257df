use crate::topic::names;
use serde::{Deserialize, Serialize};

/// Payloads that know which topic they belong on.
pub trait Routed {
    fn topic(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

/// Events pushed to marketplace clients. Ids are the opaque strings the
/// backend hands out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketplaceEvent {
    BookingCreated {
        booking_id: String,
        studio_id: String,
        artist_id: String,
    },
    BookingUpdated {
        booking_id: String,
        status: BookingStatus,
    },
    BookingCancelled {
        booking_id: String,
        reason: Option<String>,
    },
    MessageReceived {
        conversation_id: String,
        sender_id: String,
        body: String,
    },
    NotificationPushed {
        user_id: String,
        title: String,
        body: String,
    },
    RosterClaimed {
        label_id: String,
        artist_id: String,
    },
}

impl MarketplaceEvent {
    /// Booking the event refers to, if any.
    pub fn booking_id(&self) -> Option<&str> {
        match self {
            Self::BookingCreated { booking_id, .. }
            | Self::BookingUpdated { booking_id, .. }
            | Self::BookingCancelled { booking_id, .. } => Some(booking_id.as_str()),
            _ => None,
        }
    }
}

impl Routed for MarketplaceEvent {
    fn topic(&self) -> &'static str {
        match self {
            Self::BookingCreated { .. } => names::BOOKING_CREATED,
            Self::BookingUpdated { .. } => names::BOOKING_UPDATED,
            Self::BookingCancelled { .. } => names::BOOKING_CANCELLED,
            Self::MessageReceived { .. } => names::MESSAGE_RECEIVED,
            Self::NotificationPushed { .. } => names::NOTIFICATION_PUSHED,
            Self::RosterClaimed { .. } => names::ROSTER_CLAIMED,
        }
    }
}
