//! Feature encodings sent to the classifier.
//!
//! The primary encoding flattens the 21 landmarks as
//! `[x0, y0, z0, x1, y1, z1, ..., x20, y20, z20]`, which is what the server
//! model was trained on. The distance encoding is a secondary, rotation-robust
//! representation for models trained against it.

use serde::Serialize;
use std::ops::Deref;

use crate::hand::{Hand, Landmark, FINGERTIPS, LANDMARK_COUNT};
use crate::{LandmarkError, Result};

/// Length of the flattened feature vector (21 landmarks * 3 coordinates).
pub const FEATURE_LEN: usize = LANDMARK_COUNT * 3;

const TIP_COUNT: usize = FINGERTIPS.len();
const PAIR_COUNT: usize = TIP_COUNT * (TIP_COUNT - 1) / 2;

/// Length of the distance feature encoding (5 + 5 + 10).
pub const DISTANCE_FEATURE_LEN: usize = TIP_COUNT * 2 + PAIR_COUNT;

/// Flattened landmark coordinates. Always exactly [`FEATURE_LEN`] values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl Deref for FeatureVector {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl TryFrom<Vec<f32>> for FeatureVector {
    type Error = LandmarkError;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        if values.len() != FEATURE_LEN {
            return Err(LandmarkError::InvalidFeatureLength {
                expected: FEATURE_LEN,
                actual: values.len(),
            });
        }
        Ok(Self(values))
    }
}

impl Hand {
    /// Flatten this hand. Infallible because the count is checked on construction.
    pub fn feature_vector(&self) -> FeatureVector {
        let mut values = Vec::with_capacity(FEATURE_LEN);
        for l in self.landmarks() {
            values.extend_from_slice(&[l.x, l.y, l.z]);
        }
        FeatureVector(values)
    }
}

/// Flatten raw detector points into a feature vector.
///
/// Fails with [`LandmarkError::InvalidLandmarkCount`] unless exactly 21 points
/// are given. Nothing is padded or truncated.
pub fn to_feature_vector(landmarks: &[Landmark]) -> Result<FeatureVector> {
    Hand::from_landmarks(landmarks).map(|hand| hand.feature_vector())
}

/// Translate every landmark so the wrist sits at the origin. No rescaling.
pub fn to_wrist_relative(hand: &Hand) -> Hand {
    let origin = hand.wrist();
    Hand::new(hand.landmarks().map(|l| {
        Landmark::new(l.x - origin.x, l.y - origin.y, l.z - origin.z)
    }))
}

/// Distance-based features.
///
/// Output order (fingertips are thumb, index, middle, ring, pinky):
/// - `[0..5)`   fingertip to wrist
/// - `[5..10)`  fingertip to palm center
/// - `[10..20)` fingertip pairs `(0,1) (0,2) (0,3) (0,4) (1,2) (1,3) (1,4) (2,3) (2,4) (3,4)`
///
/// Distances are 3D Euclidean in the detector's normalized space.
pub fn fingertip_distances(hand: &Hand) -> [f32; DISTANCE_FEATURE_LEN] {
    let wrist = hand.wrist();
    let palm = hand.palm_center();
    let tips = FINGERTIPS.map(|i| hand.landmarks()[i]);

    let mut out = [0.0f32; DISTANCE_FEATURE_LEN];
    for (i, tip) in tips.iter().enumerate() {
        out[i] = tip.distance_to(&wrist);
        out[TIP_COUNT + i] = tip.distance_to(&palm);
    }

    let mut k = TIP_COUNT * 2;
    for i in 0..TIP_COUNT {
        for j in (i + 1)..TIP_COUNT {
            out[k] = tips[i].distance_to(&tips[j]);
            k += 1;
        }
    }
    out
}
