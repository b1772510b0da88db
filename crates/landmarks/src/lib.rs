//! Hand landmark geometry.
//!
//! Pure conversions from detector output to the two shapes the rest of the
//! pipeline needs:
//! - flat feature vectors for the remote classifier
//! - screen-space points and segments for the skeleton overlay
//!
//! Nothing in this crate holds state.

mod features;
mod hand;
mod overlay;

pub use features::{
    fingertip_distances, to_feature_vector, to_wrist_relative, FeatureVector, DISTANCE_FEATURE_LEN,
    FEATURE_LEN,
};
pub use hand::{
    joint, Hand, Landmark, FINGERTIPS, HAND_CONNECTIONS, LANDMARK_COUNT, PALM_CENTER_JOINTS,
};
pub use overlay::{overlay_segments, to_screen_point, CanvasSize, Rotation, ScreenPoint};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LandmarkError {
    #[error("expected {expected} landmarks, got {actual}")]
    InvalidLandmarkCount { expected: usize, actual: usize },
    #[error("expected {expected} features, got {actual}")]
    InvalidFeatureLength { expected: usize, actual: usize },
    #[error("unsupported rotation: {0} degrees")]
    UnsupportedRotation(u32),
}

pub type Result<T> = std::result::Result<T, LandmarkError>;
