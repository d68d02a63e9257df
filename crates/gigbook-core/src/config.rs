use crate::envelope::Envelope;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    pub bus: BusConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct BusConfig {
    /// `None` means unbounded.
    pub max_subscribers_per_topic: Option<usize>,
    pub slow_handler_warn_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub interval_ms: u64,
    pub repeat: bool,
    pub events: Vec<Envelope>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_ms: 250,
            repeat: false,
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: Option<String>,
}

impl CoreConfig {
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let cfg = Self::from_json_str(&data)?;
        debug!(path = %path.display(), "config loaded");
        Ok(cfg)
    }

    pub fn from_json_str(data: &str) -> CoreResult<Self> {
        let cfg: CoreConfig = serde_json::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.bus.max_subscribers_per_topic == Some(0) {
            return Err(CoreError::Config(
                "bus.max_subscribers_per_topic must be at least 1".to_string(),
            ));
        }
        if self.feed.interval_ms == 0 {
            return Err(CoreError::Config(
                "feed.interval_ms must be greater than 0".to_string(),
            ));
        }
        if let Some(pos) = self.feed.events.iter().position(|e| e.topic.trim().is_empty()) {
            return Err(CoreError::Config(format!(
                "feed.events[{}] has an empty topic",
                pos
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let cfg = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, CoreConfig::default());
        assert_eq!(cfg.feed.interval_ms, 250);
        assert!(cfg.bus.max_subscribers_per_topic.is_none());
    }

    #[test]
    fn partial_sections_are_filled_in() {
        let cfg = CoreConfig::from_json_str(
            r#"{
                "bus": { "slow_handler_warn_ms": 20 },
                "feed": { "events": [ { "topic": "booking.updated", "payload": { "n": 1 } } ] },
                "logging": { "filter": "gigbook_realtime=debug" }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.bus.slow_handler_warn_ms, Some(20));
        assert_eq!(cfg.feed.interval_ms, 250);
        assert_eq!(cfg.feed.events.len(), 1);
        assert_eq!(cfg.feed.events[0].topic, "booking.updated");
        assert_eq!(cfg.logging.filter.as_deref(), Some("gigbook_realtime=debug"));
    }

    #[test]
    fn zero_subscriber_limit_is_rejected() {
        let err = CoreConfig::from_json_str(r#"{"bus":{"max_subscribers_per_topic":0}}"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = CoreConfig::from_json_str(r#"{"feed":{"interval_ms":0}}"#).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn blank_feed_topic_is_rejected() {
        let err = CoreConfig::from_json_str(r#"{"feed":{"events":[{"topic":"  "}]}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("feed.events[0]"));
    }

    #[test]
    fn malformed_json_is_a_serde_error() {
        let err = CoreConfig::from_json_str("{ bus: ").unwrap_err();
        assert!(matches!(err, CoreError::Serde(_)));
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("gigbook-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"feed":{"interval_ms":10,"repeat":true}}"#).unwrap();
        let cfg = CoreConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(cfg.feed.interval_ms, 10);
        assert!(cfg.feed.repeat);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = CoreConfig::load("/definitely/not/here/gigbook.json").unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
