//! Where the session controller publishes its `session:*` events.
//!
//! The controller only sees [`EventBus`], so it runs the same under a UI,
//! under the replay runner, or under tests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Sink for the topics in [`crate::event_names`].
pub trait EventBus: Send + Sync {
    /// Publish `payload` under `topic`. Must not block the caller.
    fn emit(&self, topic: &str, payload: serde_json::Value);
}

pub type EventBusRef = Arc<dyn EventBus>;

/// Serialize `payload` and emit it. Serialization failures are logged and dropped.
pub fn emit_json<T: Serialize>(bus: &dyn EventBus, topic: &str, payload: &T) {
    match serde_json::to_value(payload) {
        Ok(value) => bus.emit(topic, value),
        Err(e) => tracing::warn!(topic, error = %e, "failed to serialize event payload"),
    }
}

/// Keeps every event the controller published, in order.
///
/// Lets tests assert on state transitions, predictions and history changes
/// without a presentation layer.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<EmittedEvent>>,
}

#[derive(Debug, Clone)]
pub struct EmittedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topics in publication order.
    pub fn topics(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .iter()
            .map(|e| e.topic.clone())
            .collect()
    }

    /// Events for one topic, oldest first.
    pub fn events_for(&self, topic: &str) -> Vec<EmittedEvent> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }

    pub fn last_for(&self, topic: &str) -> Option<EmittedEvent> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .iter()
            .rev()
            .find(|e| e.topic == topic)
            .cloned()
    }

    /// Latest payload on `topic` decoded as its event type, e.g.
    /// [`crate::SessionStateEvent`] for `session:state`.
    ///
    /// `None` if nothing was published on `topic` or the payload does not
    /// match `T`.
    pub fn last_as<T: DeserializeOwned>(&self, topic: &str) -> Option<T> {
        let event = self.last_for(topic)?;
        serde_json::from_value(event.payload).ok()
    }
}

impl EventBus for InMemoryEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(EmittedEvent {
                topic: topic.to_string(),
                payload,
            });
    }
}

/// Drops everything. For runs with nothing presenting the session, such as
/// the replay runner.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _topic: &str, _payload: serde_json::Value) {}
}
