//! Capture-to-feedback session.
//!
//! Wires camera frames through a single-flight detection cycle to the remote
//! classifier, keeps the live prediction, and periodically commits it to the
//! persisted history.

mod admission;
mod autosave;
mod config;
mod constants;
mod error;
mod session;
mod timers;

pub use admission::{
    AdmissionGate, AdmissionPermit, CycleState, PipelineStats, PipelineStatsSnapshot,
};
pub use autosave::AutoSavePolicy;
pub use config::{default_database_path, SessionConfig, SignlensConfig};
pub use constants::*;
pub use error::{Result, SessionError};
pub use session::{OverlayOrientation, SessionController, SessionParts, SessionSnapshot};
