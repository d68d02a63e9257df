//! Scripted stand-in for server push.
//!
//! A [`MockFeed`] replays a fixed list of events into a sink, one per
//! interval tick, so clients can be exercised without a backend.

use crate::bus::EventSink;
use crate::error::BusResult;
use crate::topic::Topic;
use gigbook_core::Envelope;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem<P> {
    pub topic: Topic,
    pub payload: P,
}

impl<P> FeedItem<P> {
    pub fn new(topic: Topic, payload: P) -> Self {
        Self { topic, payload }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub published: u64,
    pub deliveries: u64,
}

#[derive(Debug, Clone)]
pub struct MockFeed<P> {
    items: Vec<FeedItem<P>>,
    interval: Duration,
    repeat: bool,
}

impl<P> MockFeed<P>
where
    P: Send + Sync + 'static,
{
    pub fn new(items: Vec<FeedItem<P>>, interval: Duration) -> Self {
        Self {
            items,
            interval,
            repeat: false,
        }
    }

    /// Decodes a script of envelopes, failing on the first bad entry.
    pub fn from_envelopes(envelopes: &[Envelope], interval: Duration) -> BusResult<Self>
    where
        P: DeserializeOwned,
    {
        let items = envelopes
            .iter()
            .map(|envelope| -> BusResult<FeedItem<P>> {
                Ok(FeedItem::new(
                    Topic::new(envelope.topic.as_str())?,
                    serde_json::from_value(envelope.payload.clone())?,
                ))
            })
            .collect::<BusResult<Vec<_>>>()?;
        Ok(Self::new(items, interval))
    }

    pub fn repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Publishes the script in order until it runs out (or forever when
    /// repeating) or `shutdown` becomes `true`.
    pub async fn run<S>(self, sink: S, mut shutdown: watch::Receiver<bool>) -> FeedSummary
    where
        S: EventSink<P>,
    {
        let mut summary = FeedSummary::default();
        if self.items.is_empty() {
            debug!("mock feed has nothing to publish");
            return summary;
        }

        info!(
            items = self.items.len(),
            interval_ms = self.interval.as_millis() as u64,
            repeat = self.repeat,
            "mock feed started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        'script: loop {
            for item in &self.items {
                tokio::select! {
                    biased;
                    _ = stop_requested(&mut shutdown) => break 'script,
                    _ = ticker.tick() => {}
                }
                let delivered = sink.publish(item.topic.as_str(), &item.payload);
                summary.published += 1;
                summary.deliveries += delivered as u64;
            }
            if !self.repeat {
                break;
            }
        }

        info!(
            published = summary.published,
            deliveries = summary.deliveries,
            "mock feed stopped"
        );
        summary
    }

    pub fn spawn<S>(self, sink: S, shutdown: watch::Receiver<bool>) -> JoinHandle<FeedSummary>
    where
        S: EventSink<P> + 'static,
    {
        tokio::spawn(self.run(sink, shutdown))
    }
}

// Resolves once the flag reads `true`. A dropped sender can no longer stop
// the feed, so this then never resolves.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
