//! Synchronous in-process publish/subscribe.
//!
//! Each topic keeps its subscribers in registration order. `publish` copies
//! the topic's list under the lock and then calls every entry on the caller's
//! thread with the lock released. A subscriber added while a publish is in
//! flight is not called by that publish. A subscriber removed mid-publish is
//! still called if it was already in the copy. Callbacks may use the bus
//! themselves without deadlocking.
//!
//! A callback that returns `Err` or panics is logged and skipped over. The
//! publisher never sees the failure.

use crate::error::{BusError, BusResult};
use crate::events::Routed;
use crate::subscription::{Revoke, Subscription, SubscriptionId};
use crate::topic::Topic;
use gigbook_core::{format_error_chain, BusConfig};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

type Handler<P> = Arc<dyn Fn(&P) -> anyhow::Result<()> + Send + Sync>;

/// Anything a payload can be published into.
pub trait EventSink<P>: Send + Sync {
    /// Returns the number of subscribers invoked.
    fn publish(&self, topic: &str, payload: &P) -> usize;
}

impl<P, T> EventSink<P> for Arc<T>
where
    T: EventSink<P> + ?Sized,
{
    fn publish(&self, topic: &str, payload: &P) -> usize {
        (**self).publish(topic, payload)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub published: u64,
    /// Callback invocations, failed ones included.
    pub deliveries: u64,
    pub failures: u64,
    pub subscriptions: usize,
}

struct Entry<P> {
    id: SubscriptionId,
    handler: Handler<P>,
}

impl<P> Clone for Entry<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

struct Registry<P> {
    next_id: u64,
    topics: HashMap<Topic, Vec<Entry<P>>>,
}

struct Inner<P> {
    registry: Mutex<Registry<P>>,
    max_subscribers_per_topic: Option<usize>,
    slow_handler: Option<Duration>,
    published: AtomicU64,
    deliveries: AtomicU64,
    failures: AtomicU64,
}

impl<P> Inner<P> {
    // Callbacks never run under this lock, so a poisoned registry is still consistent.
    fn lock(&self) -> MutexGuard<'_, Registry<P>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: 'static> Revoke for Inner<P> {
    fn revoke(&self, topic: &Topic, id: SubscriptionId) -> bool {
        let mut registry = self.lock();
        let Some(entries) = registry.topics.get_mut(topic.as_str()) else {
            return false;
        };
        let Some(pos) = entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        entries.remove(pos);
        if entries.is_empty() {
            registry.topics.remove(topic.as_str());
        }
        true
    }

    fn is_registered(&self, topic: &Topic, id: SubscriptionId) -> bool {
        self.lock()
            .topics
            .get(topic.as_str())
            .map_or(false, |entries| entries.iter().any(|entry| entry.id == id))
    }
}

/// Cloning yields another handle onto the same registry.
pub struct EventBus<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: 'static> EventBus<P> {
    pub fn new() -> Self {
        Self::with_config(&BusConfig::default())
    }

    pub fn with_config(cfg: &BusConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry {
                    next_id: 0,
                    topics: HashMap::new(),
                }),
                max_subscribers_per_topic: cfg.max_subscribers_per_topic,
                slow_handler: cfg.slow_handler_warn_ms.map(Duration::from_millis),
                published: AtomicU64::new(0),
                deliveries: AtomicU64::new(0),
                failures: AtomicU64::new(0),
            }),
        }
    }

    pub fn subscribe<F>(&self, topic: impl AsRef<str>, callback: F) -> BusResult<Subscription>
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let handler: Handler<P> = Arc::new(move |payload: &P| {
            callback(payload);
            Ok(())
        });
        self.register(topic.as_ref(), handler)
    }

    /// Like [`subscribe`](Self::subscribe), for callbacks that report failure
    /// through their return value.
    pub fn subscribe_fallible<F>(
        &self,
        topic: impl AsRef<str>,
        callback: F,
    ) -> BusResult<Subscription>
    where
        F: Fn(&P) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(topic.as_ref(), Arc::new(callback))
    }

    fn register(&self, topic: &str, handler: Handler<P>) -> BusResult<Subscription> {
        let topic = Topic::new(topic)?;
        let id = {
            let mut guard = self.inner.lock();
            let registry = &mut *guard;
            let current = registry.topics.get(topic.as_str()).map_or(0, Vec::len);
            if let Some(limit) = self.inner.max_subscribers_per_topic {
                if current >= limit {
                    return Err(BusError::TopicFull {
                        topic: topic.to_string(),
                        limit,
                    });
                }
            }
            registry.next_id += 1;
            let id = SubscriptionId::new(registry.next_id);
            registry
                .topics
                .entry(topic.clone())
                .or_default()
                .push(Entry { id, handler });
            id
        };

        debug!(topic = %topic, subscription = %id, "subscribed");
        let weak = Arc::downgrade(&self.inner);
        let registry: Weak<dyn Revoke> = weak;
        Ok(Subscription::new(id, topic, registry))
    }

    /// Calls every current subscriber of `topic`, in registration order, with
    /// the same `payload`. Returns how many were called.
    pub fn publish(&self, topic: impl AsRef<str>, payload: &P) -> usize {
        let topic = topic.as_ref();
        self.inner.published.fetch_add(1, Ordering::Relaxed);

        let snapshot: Vec<Entry<P>> = self
            .inner
            .lock()
            .topics
            .get(topic)
            .cloned()
            .unwrap_or_default();

        if snapshot.is_empty() {
            debug!(topic = %topic, "published with no subscribers");
            return 0;
        }

        for entry in &snapshot {
            self.deliver(topic, entry, payload);
        }
        snapshot.len()
    }

    fn deliver(&self, topic: &str, entry: &Entry<P>, payload: &P) {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (entry.handler)(payload)));
        let elapsed = started.elapsed();
        self.inner.deliveries.fetch_add(1, Ordering::Relaxed);

        match outcome {
            Ok(Ok(())) => {
                trace!(topic = %topic, subscription = %entry.id, "delivered");
            }
            Ok(Err(err)) => {
                self.inner.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    topic = %topic,
                    subscription = %entry.id,
                    error = %format_error_chain(&*err),
                    "subscriber failed"
                );
            }
            Err(panic) => {
                self.inner.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    topic = %topic,
                    subscription = %entry.id,
                    error = %panic_message(&*panic),
                    "subscriber panicked"
                );
            }
        }

        if let Some(limit) = self.inner.slow_handler {
            if elapsed > limit {
                warn!(
                    topic = %topic,
                    subscription = %entry.id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "slow subscriber"
                );
            }
        }
    }

    pub fn subscriber_count(&self, topic: impl AsRef<str>) -> usize {
        self.inner
            .lock()
            .topics
            .get(topic.as_ref())
            .map_or(0, Vec::len)
    }

    /// Topics with at least one subscriber, sorted.
    pub fn topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.inner.lock().topics.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn stats(&self) -> BusStats {
        let subscriptions = self.inner.lock().topics.values().map(Vec::len).sum();
        BusStats {
            published: self.inner.published.load(Ordering::Relaxed),
            deliveries: self.inner.deliveries.load(Ordering::Relaxed),
            failures: self.inner.failures.load(Ordering::Relaxed),
            subscriptions,
        }
    }
}

impl<P: Routed + 'static> EventBus<P> {
    pub fn publish_event(&self, event: &P) -> usize {
        self.publish(event.topic(), event)
    }
}

impl<P: 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static> EventSink<P> for EventBus<P> {
    fn publish(&self, topic: &str, payload: &P) -> usize {
        EventBus::publish(self, topic, payload)
    }
}

impl<P: 'static> fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("stats", &self.stats())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
