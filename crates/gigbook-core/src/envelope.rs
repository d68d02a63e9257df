use serde::{Deserialize, Serialize};

/// A topic-addressed message as it arrives from outside the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }
}
