//! Turns inbound transport messages into bus publishes.

use crate::bus::EventSink;
use crate::error::BusResult;
use crate::topic::Topic;
use gigbook_core::Envelope;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tracing::debug;

pub struct Bridge<P, S> {
    sink: S,
    _payload: PhantomData<fn() -> P>,
}

impl<P, S> Bridge<P, S>
where
    P: DeserializeOwned,
    S: EventSink<P>,
{
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            _payload: PhantomData,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Parses a raw `{"topic": .., "payload": ..}` message and publishes it.
    pub fn ingest_str(&self, raw: &str) -> BusResult<usize> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        self.ingest(envelope)
    }

    pub fn ingest(&self, envelope: Envelope) -> BusResult<usize> {
        let topic = Topic::new(envelope.topic)?;
        let payload: P = serde_json::from_value(envelope.payload)?;
        let delivered = self.sink.publish(topic.as_str(), &payload);
        debug!(topic = %topic, delivered, "bridged inbound message");
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::error::BusError;
    use crate::events::{BookingStatus, MarketplaceEvent};
    use crate::topic::names;
    use std::sync::{Arc, Mutex};

    fn capture(bus: &EventBus<MarketplaceEvent>, topic: &str) -> Arc<Mutex<Vec<MarketplaceEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(topic, move |event: &MarketplaceEvent| {
            sink.lock().unwrap().push(event.clone())
        })
        .unwrap();
        seen
    }

    #[test]
    fn decodes_and_publishes() {
        let bus = EventBus::<MarketplaceEvent>::new();
        let seen = capture(&bus, names::BOOKING_UPDATED);
        let bridge = Bridge::new(bus.clone());

        let delivered = bridge
            .ingest_str(
                r#"{"topic":"booking.updated","payload":{"type":"booking_updated","booking_id":"bk-7","status":"completed"}}"#,
            )
            .unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(bridge.sink().stats().published, 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![MarketplaceEvent::BookingUpdated {
                booking_id: "bk-7".to_string(),
                status: BookingStatus::Completed,
            }]
        );
    }

    #[test]
    fn untyped_payloads_pass_through() {
        let bus = EventBus::<serde_json::Value>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            bus.subscribe("x", move |v: &serde_json::Value| seen.lock().unwrap().push(v.clone()))
                .unwrap();
        }
        let bridge = Bridge::new(bus);

        assert_eq!(bridge.ingest_str(r#"{"topic":"x","payload":{"n":1}}"#).unwrap(), 1);
        assert_eq!(bridge.ingest_str(r#"{"topic":"y","payload":{}}"#).unwrap(), 0);
        assert_eq!(*seen.lock().unwrap(), vec![serde_json::json!({"n": 1})]);
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let bridge = Bridge::new(EventBus::<serde_json::Value>::new());
        assert!(matches!(bridge.ingest_str("not json"), Err(BusError::Decode(_))));
    }

    #[test]
    fn wrong_payload_shape_never_reaches_subscribers() {
        let bus = EventBus::<MarketplaceEvent>::new();
        let seen = capture(&bus, names::BOOKING_UPDATED);
        let bridge = Bridge::new(bus.clone());

        let result = bridge.ingest(Envelope::new(
            names::BOOKING_UPDATED,
            serde_json::json!({"type": "booking_updated", "booking_id": 3}),
        ));

        assert!(matches!(result, Err(BusError::Decode(_))));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(bus.stats().published, 0);
    }

    #[test]
    fn blank_topic_is_rejected() {
        let bridge = Bridge::new(EventBus::<serde_json::Value>::new());
        assert!(matches!(
            bridge.ingest(Envelope::new("", serde_json::Value::Null)),
            Err(BusError::InvalidTopic(_))
        ));
    }
}
