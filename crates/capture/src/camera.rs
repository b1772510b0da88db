use serde::{Deserialize, Serialize};
use signlens_landmarks::Rotation;
use std::sync::Arc;

use crate::{CaptureError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LensDirection {
    Front,
    Back,
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    pub id: String,
    pub name: String,
    pub lens: LensDirection,
    /// Clockwise rotation of the sensor relative to the display.
    pub sensor_orientation: Rotation,
}

impl CameraDescriptor {
    pub fn is_front(&self) -> bool {
        self.lens == LensDirection::Front
    }
}

/// One frame from the camera stream.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Monotonic sequence number within one stream.
    pub seq: u64,
    /// Capture time in milliseconds since epoch.
    pub ts_ms: i64,
    pub width: u32,
    pub height: u32,
    /// Raw pixel data, shared so frames can be handed off without copying.
    pub data: Arc<[u8]>,
}

/// Receives frames from a running camera stream.
///
/// Called on the camera's delivery thread; implementations must return quickly.
pub type FrameSink = Arc<dyn Fn(CameraFrame) + Send + Sync + 'static>;

/// An opened camera. Dropping it releases the device.
pub trait Camera: Send {
    fn descriptor(&self) -> &CameraDescriptor;

    /// Begin delivering frames to `sink`.
    fn start_stream(&mut self, sink: FrameSink) -> Result<()>;

    /// Stop delivering frames. No frame reaches the sink after this returns.
    fn stop_stream(&mut self);

    fn is_streaming(&self) -> bool;
}

/// Platform camera access.
pub trait CameraProvider: Send + Sync {
    fn list_cameras(&self) -> Result<Vec<CameraDescriptor>>;

    /// Acquire exclusive use of a camera.
    fn open(&self, camera: &CameraDescriptor) -> Result<Box<dyn Camera>>;
}

/// Pick the front-facing camera, otherwise the first one listed.
pub fn select_camera(cameras: &[CameraDescriptor]) -> Result<&CameraDescriptor> {
    cameras
        .iter()
        .find(|c| c.is_front())
        .or_else(|| cameras.first())
        .ok_or(CaptureError::NoCameraAvailable)
}
