//! Handles returned by [`EventBus::subscribe`](crate::EventBus::subscribe).
//!
//! A registration is identified by its [`SubscriptionId`], never by the
//! callback it carries. The same callback may be registered any number of
//! times and each registration is revoked on its own.

use crate::topic::Topic;
use std::fmt;
use std::sync::Weak;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Registry side of a subscription, implemented by the bus.
pub(crate) trait Revoke: Send + Sync {
    fn revoke(&self, topic: &Topic, id: SubscriptionId) -> bool;
    fn is_registered(&self, topic: &Topic, id: SubscriptionId) -> bool;
}

/// Revocation handle for one registration.
///
/// Dropping it leaves the registration in place; use [`Subscription::into_guard`]
/// to tie the registration to a scope.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    registry: Weak<dyn Revoke>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, topic: Topic, registry: Weak<dyn Revoke>) -> Self {
        Self {
            id,
            topic,
            registry,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Removes this registration. Returns `true` only for the call that
    /// actually removed it; later calls, or calls after the bus is gone, are no-ops.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let removed = registry.revoke(&self.topic, self.id);
        if removed {
            debug!(topic = %self.topic, subscription = %self.id, "unsubscribed");
        }
        removed
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map_or(false, |registry| registry.is_registered(&self.topic, self.id))
    }

    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard {
            subscription: Some(self),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}

/// Unsubscribes when dropped.
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Option<Subscription>,
}

impl SubscriptionGuard {
    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Disarms the guard and hands back the plain handle.
    pub fn release(mut self) -> Option<Subscription> {
        self.subscription.take()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}
