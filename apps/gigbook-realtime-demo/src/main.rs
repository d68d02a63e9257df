use anyhow::Context;
use gigbook_core::{logging::init_logging, CoreConfig, Envelope, FeedConfig};
use gigbook_realtime::{
    names, BookingStatus, Bridge, EventBus, MarketplaceEvent, MockFeed, SubscriptionGuard,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

type BookingBoard = Arc<Mutex<BTreeMap<String, BookingStatus>>>;

/// Inbound message replayed through the bridge after the feed finishes.
const LATE_PUSH: &str = r#"{"topic":"notification.pushed","payload":{"type":"notification_pushed","user_id":"usr-1","title":"Session reminder","body":"Your session at Blue Room starts in 1 hour"}}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => CoreConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => CoreConfig::default(),
    };
    init_logging(cfg.logging.filter.as_deref());

    let bus: EventBus<MarketplaceEvent> = EventBus::with_config(&cfg.bus);
    let board = BookingBoard::default();

    // Mounted "components"; dropping the guards tears them down.
    let guards = mount_components(&bus, &board)?;

    let feed = build_feed(&cfg.feed)?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut handle = feed.spawn(bus.clone(), stop_rx);

    let summary = tokio::select! {
        summary = &mut handle => summary?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, stopping feed");
            let _ = stop_tx.send(true);
            handle.await?
        }
    };
    info!(
        published = summary.published,
        deliveries = summary.deliveries,
        "feed finished"
    );

    let bridge = Bridge::new(bus.clone());
    match bridge.ingest_str(LATE_PUSH) {
        Ok(delivered) => info!(delivered, "late push bridged"),
        Err(err) => warn!(error = %err, "late push rejected"),
    }

    drop(guards);

    let final_board = board
        .lock()
        .map_err(|_| anyhow::anyhow!("booking board lock poisoned"))?;
    for (booking_id, status) in final_board.iter() {
        info!(booking_id = %booking_id, status = ?status, "final booking status");
    }
    drop(final_board);
    let stats = bus.stats();
    info!(
        published = stats.published,
        deliveries = stats.deliveries,
        failures = stats.failures,
        subscriptions = stats.subscriptions,
        "bus stats"
    );
    Ok(())
}

/// Falls back to the built-in script when the config has none.
fn build_feed(cfg: &FeedConfig) -> anyhow::Result<MockFeed<MarketplaceEvent>> {
    let script = if cfg.events.is_empty() {
        default_script()
    } else {
        cfg.events.clone()
    };
    let interval = Duration::from_millis(cfg.interval_ms);
    let feed = MockFeed::<MarketplaceEvent>::from_envelopes(&script, interval)
        .context("invalid feed script")?;
    Ok(feed.repeat(cfg.repeat))
}

fn mount_components(
    bus: &EventBus<MarketplaceEvent>,
    board: &BookingBoard,
) -> anyhow::Result<Vec<SubscriptionGuard>> {
    let mut guards = Vec::new();

    for topic in [
        names::BOOKING_CREATED,
        names::BOOKING_UPDATED,
        names::BOOKING_CANCELLED,
    ] {
        let board = Arc::clone(board);
        let sub = bus.subscribe_fallible(topic, move |event: &MarketplaceEvent| {
            let mut board = board
                .lock()
                .map_err(|_| anyhow::anyhow!("booking board lock poisoned"))?;
            match event {
                MarketplaceEvent::BookingCreated { booking_id, .. } => {
                    board.insert(booking_id.clone(), BookingStatus::Pending);
                }
                MarketplaceEvent::BookingUpdated { booking_id, status } => {
                    let Some(current) = board.get_mut(booking_id) else {
                        anyhow::bail!("update for unknown booking {}", booking_id);
                    };
                    *current = *status;
                }
                MarketplaceEvent::BookingCancelled { booking_id, .. } => {
                    board.insert(booking_id.clone(), BookingStatus::Cancelled);
                }
                _ => {}
            }
            Ok(())
        })?;
        guards.push(sub.into_guard());
    }

    let inbox = bus.subscribe(names::MESSAGE_RECEIVED, |event: &MarketplaceEvent| {
        if let MarketplaceEvent::MessageReceived {
            conversation_id,
            sender_id,
            body,
        } = event
        {
            info!(
                conversation_id = %conversation_id,
                sender_id = %sender_id,
                body = %body,
                "new message"
            );
        }
    })?;
    guards.push(inbox.into_guard());

    for topic in [names::NOTIFICATION_PUSHED, names::ROSTER_CLAIMED] {
        let sub = bus.subscribe(topic, |event: &MarketplaceEvent| {
            info!(event = ?event, "toast");
        })?;
        guards.push(sub.into_guard());
    }

    Ok(guards)
}

fn default_script() -> Vec<Envelope> {
    vec![
        Envelope::new(
            names::BOOKING_CREATED,
            json!({"type": "booking_created", "booking_id": "bk-100", "studio_id": "std-blue-room", "artist_id": "art-7"}),
        ),
        Envelope::new(
            names::MESSAGE_RECEIVED,
            json!({"type": "message_received", "conversation_id": "conv-3", "sender_id": "eng-2", "body": "Can we start at 10?"}),
        ),
        Envelope::new(
            names::BOOKING_UPDATED,
            json!({"type": "booking_updated", "booking_id": "bk-100", "status": "confirmed"}),
        ),
        // No booking bk-404 exists; the board subscriber fails and the feed carries on.
        Envelope::new(
            names::BOOKING_UPDATED,
            json!({"type": "booking_updated", "booking_id": "bk-404", "status": "completed"}),
        ),
        Envelope::new(
            names::ROSTER_CLAIMED,
            json!({"type": "roster_claimed", "label_id": "lbl-north", "artist_id": "art-7"}),
        ),
        Envelope::new(
            names::BOOKING_CANCELLED,
            json!({"type": "booking_cancelled", "booking_id": "bk-100", "reason": "artist unavailable"}),
        ),
    ]
}
