//! Capture-side seams: cameras and the landmark engine.
//!
//! Platform code implements [`CameraProvider`] and [`EngineInitializer`]; the
//! session layer only ever sees these traits.

mod camera;
mod engine;

pub use camera::{
    select_camera, Camera, CameraDescriptor, CameraFrame, CameraProvider, FrameSink,
    LensDirection,
};
pub use engine::{Delegate, EngineInitializer, EngineRegistry, LandmarkEngine};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no camera available")]
    NoCameraAvailable,
    #[error("camera busy: {0}")]
    CameraBusy(String),
    #[error("camera error: {0}")]
    Camera(String),
    #[error("landmark engine unavailable ({})", attempts.join("; "))]
    LandmarkEngineUnavailable { attempts: Vec<String> },
    #[error("engine initialization failed: {0}")]
    EngineInit(String),
    #[error("landmark detection failed: {0}")]
    Detection(String),
    #[error("invalid landmarks: {0}")]
    InvalidLandmarks(#[from] signlens_landmarks::LandmarkError),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
