//! Realtime notification core for the gigbook marketplace.
//!
//! [`EventBus`] is a synchronous in-process publish/subscribe registry. Build
//! one, clone it into whatever needs to publish or subscribe, and keep the
//! [`Subscription`] handles to revoke registrations. [`Bridge`] turns inbound
//! transport messages into publishes. [`MockFeed`] simulates server push.

pub mod bridge;
pub mod bus;
pub mod error;
pub mod events;
pub mod feed;
pub mod subscription;
pub mod topic;

pub use bridge::Bridge;
pub use bus::{BusStats, EventBus, EventSink};
pub use error::{BusError, BusResult};
pub use events::{BookingStatus, MarketplaceEvent, Routed};
pub use feed::{FeedItem, FeedSummary, MockFeed};
pub use subscription::{Subscription, SubscriptionGuard, SubscriptionId};
pub use topic::{names, Topic};
