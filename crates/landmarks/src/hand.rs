use serde::{Deserialize, Serialize};

use crate::{LandmarkError, Result};

/// Number of landmarks the detector emits for one hand.
pub const LANDMARK_COUNT: usize = 21;

/// Landmark indices in detector order.
pub mod joint {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

use joint::*;

/// Fingertips, thumb first.
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// Joints averaged to approximate the palm center.
pub const PALM_CENTER_JOINTS: [usize; 3] = [WRIST, INDEX_MCP, PINKY_MCP];

/// Skeleton connections drawn by the overlay.
#[rustfmt::skip]
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (WRIST, THUMB_CMC), (THUMB_CMC, THUMB_MCP), (THUMB_MCP, THUMB_IP), (THUMB_IP, THUMB_TIP),
    (WRIST, INDEX_MCP), (INDEX_MCP, INDEX_PIP), (INDEX_PIP, INDEX_DIP), (INDEX_DIP, INDEX_TIP),
    (INDEX_MCP, MIDDLE_MCP), (MIDDLE_MCP, MIDDLE_PIP), (MIDDLE_PIP, MIDDLE_DIP), (MIDDLE_DIP, MIDDLE_TIP),
    (MIDDLE_MCP, RING_MCP), (RING_MCP, RING_PIP), (RING_PIP, RING_DIP), (RING_DIP, RING_TIP),
    (RING_MCP, PINKY_MCP), (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_DIP), (PINKY_DIP, PINKY_TIP),
    (WRIST, PINKY_MCP),
];

/// One normalized landmark.
///
/// `x` and `y` are in [0, 1] relative to the camera frame. `z` is depth
/// relative to the wrist, as reported by the detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// A detected hand: exactly 21 landmarks in detector order.
///
/// The count is enforced at construction, so every `Hand` in the pipeline is
/// safe to flatten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct Hand {
    landmarks: [Landmark; LANDMARK_COUNT],
}

impl Hand {
    pub fn new(landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { landmarks }
    }

    /// Build a hand from detector output, rejecting any other point count.
    pub fn from_landmarks(landmarks: &[Landmark]) -> Result<Self> {
        let fixed: [Landmark; LANDMARK_COUNT] =
            landmarks
                .try_into()
                .map_err(|_| LandmarkError::InvalidLandmarkCount {
                    expected: LANDMARK_COUNT,
                    actual: landmarks.len(),
                })?;
        Ok(Self { landmarks: fixed })
    }

    pub fn landmarks(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.landmarks
    }

    pub fn wrist(&self) -> Landmark {
        self.landmarks[WRIST]
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    /// Mean of the palm-center joints.
    pub fn palm_center(&self) -> Landmark {
        let n = PALM_CENTER_JOINTS.len() as f32;
        let (x, y, z) = PALM_CENTER_JOINTS
            .iter()
            .map(|&i| self.landmarks[i])
            .fold((0.0, 0.0, 0.0), |(x, y, z), l| (x + l.x, y + l.y, z + l.z));
        Landmark::new(x / n, y / n, z / n)
    }
}

impl TryFrom<Vec<Landmark>> for Hand {
    type Error = LandmarkError;

    fn try_from(landmarks: Vec<Landmark>) -> Result<Self> {
        Self::from_landmarks(&landmarks)
    }
}

impl From<Hand> for Vec<Landmark> {
    fn from(hand: Hand) -> Self {
        hand.landmarks.to_vec()
    }
}
