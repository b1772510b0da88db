//! Event contracts published by the session controller.
//!
//! Using shared types keeps producers and presentation-layer consumers in
//! agreement on field names. Also provides the `EventBus` trait.

mod bus;

pub use bus::{emit_json, EmittedEvent, EventBus, EventBusRef, InMemoryEventBus, NullEventBus};

use serde::{Deserialize, Serialize};
use signlens_landmarks::Landmark;

/// Session lifecycle or connectivity changed.
///
/// Producers: session controller
/// Consumers: status indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStateEvent {
    pub is_running: bool,
    pub is_connected: bool,
    #[serde(default)]
    pub is_suspended: bool,
}

/// A new live prediction was applied.
///
/// Producers: session controller (detection cycle)
/// Consumers: live label view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEvent {
    pub label: String,
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Timestamp in milliseconds since epoch.
    pub ts_ms: i64,
}

/// Landmarks for the skeleton overlay. `None` means no hand in the last frame.
///
/// Producers: session controller (detection cycle)
/// Consumers: overlay painter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarksEvent {
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
    /// Sensor rotation the landmarks were captured under, in degrees.
    pub rotation_degrees: u32,
    pub mirror_x: bool,
}

/// The persisted history changed.
///
/// Producers: session controller (auto-save, clear)
/// Consumers: history list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryChangedEvent {
    pub len: usize,
    #[serde(default)]
    pub last_label: Option<String>,
}

/// Event names as constants to prevent typos.
pub mod event_names {
    pub const SESSION_STATE: &str = "session:state";
    pub const SESSION_PREDICTION: &str = "session:prediction";
    pub const SESSION_LANDMARKS: &str = "session:landmarks";
    pub const SESSION_HISTORY: &str = "session:history";
    pub const SESSION_CONNECTIVITY: &str = "session:connectivity";
}
