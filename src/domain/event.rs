use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One inbound match/broadcast event. The payload is carried through to the
/// action executor context untouched; only `event_type` is matched against
/// rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub event_type: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl LiveEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: Map::new(),
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}
