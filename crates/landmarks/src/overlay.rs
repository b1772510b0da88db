//! Normalized landmark space to canvas pixels.
//!
//! The camera sensor is usually mounted rotated relative to the display, and
//! the front camera preview is mirrored. Rotation is applied first, then the
//! optional horizontal mirror. Swapping that order misaligns the overlay for
//! 90 and 270 degree sensors.

use serde::{Deserialize, Serialize};

use crate::hand::{Hand, Landmark, HAND_CONNECTIONS};
use crate::{LandmarkError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

/// Sensor rotation relative to the display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Result<Self> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(LandmarkError::UnsupportedRotation(other)),
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Rotate a normalized (x, y) pair.
    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        match self {
            Self::Deg0 => (x, y),
            Self::Deg90 => (1.0 - y, x),
            Self::Deg180 => (1.0 - x, 1.0 - y),
            Self::Deg270 => (y, 1.0 - x),
        }
    }
}

impl TryFrom<u32> for Rotation {
    type Error = LandmarkError;

    fn try_from(degrees: u32) -> Result<Self> {
        Self::from_degrees(degrees)
    }
}

impl From<Rotation> for u32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Map one landmark onto the canvas.
pub fn to_screen_point(
    landmark: &Landmark,
    canvas: CanvasSize,
    mirror_x: bool,
    rotation: Rotation,
) -> ScreenPoint {
    let (mut x, y) = rotation.apply(landmark.x, landmark.y);
    if mirror_x {
        x = 1.0 - x;
    }
    ScreenPoint {
        x: x * canvas.width,
        y: y * canvas.height,
    }
}

/// Line segments for the skeleton overlay, one per entry in [`HAND_CONNECTIONS`].
pub fn overlay_segments(
    hand: &Hand,
    canvas: CanvasSize,
    mirror_x: bool,
    rotation: Rotation,
) -> Vec<(ScreenPoint, ScreenPoint)> {
    let points = hand
        .landmarks()
        .map(|l| to_screen_point(&l, canvas, mirror_x, rotation));
    HAND_CONNECTIONS
        .iter()
        .map(|&(a, b)| (points[a], points[b]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: CanvasSize = CanvasSize::new(400.0, 800.0);

    fn close(p: ScreenPoint, x: f32, y: f32) -> bool {
        (p.x - x).abs() < 1e-3 && (p.y - y).abs() < 1e-3
    }

    #[test]
    fn test_identity_scaling() {
        let origin = to_screen_point(&Landmark::new(0.0, 0.0, 0.0), CANVAS, false, Rotation::Deg0);
        let corner = to_screen_point(&Landmark::new(1.0, 1.0, 0.0), CANVAS, false, Rotation::Deg0);
        assert!(close(origin, 0.0, 0.0));
        assert!(close(corner, 400.0, 800.0));
    }

    #[test]
    fn test_rotation_180() {
        let p = to_screen_point(&Landmark::new(0.2, 0.3, 0.0), CANVAS, false, Rotation::Deg180);
        assert!(close(p, 0.8 * 400.0, 0.7 * 800.0));
    }

    #[test]
    fn test_rotation_90_and_270() {
        let l = Landmark::new(0.2, 0.3, 0.0);
        let p90 = to_screen_point(&l, CANVAS, false, Rotation::Deg90);
        assert!(close(p90, 0.7 * 400.0, 0.2 * 800.0));

        let p270 = to_screen_point(&l, CANVAS, false, Rotation::Deg270);
        assert!(close(p270, 0.3 * 400.0, 0.8 * 800.0));
    }

    #[test]
    fn test_mirror_applies_after_rotation() {
        let l = Landmark::new(0.2, 0.3, 0.0);

        // rotate 90 -> (0.7, 0.2), then mirror -> (0.3, 0.2)
        let p = to_screen_point(&l, CANVAS, true, Rotation::Deg90);
        assert!(close(p, 0.3 * 400.0, 0.2 * 800.0));

        // Mirroring first would give (1 - 0.3, 0.8) = (0.7, 0.8) after rotation.
        assert!(!close(p, 0.7 * 400.0, 0.8 * 800.0));
    }

    #[test]
    fn test_mirror_without_rotation() {
        let p = to_screen_point(&Landmark::new(0.25, 0.5, 0.0), CANVAS, true, Rotation::Deg0);
        assert!(close(p, 300.0, 400.0));
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(270).unwrap(), Rotation::Deg270);
        assert_eq!(
            Rotation::from_degrees(45).unwrap_err(),
            LandmarkError::UnsupportedRotation(45)
        );
        let r: Rotation = serde_json::from_str("90").unwrap();
        assert_eq!(r, Rotation::Deg90);
        assert!(serde_json::from_str::<Rotation>("360").is_err());
    }

    #[test]
    fn test_overlay_segments_follow_connections() {
        let points: Vec<Landmark> = (0..21)
            .map(|i| Landmark::new(i as f32 / 20.0, 0.5, 0.0))
            .collect();
        let hand = Hand::from_landmarks(&points).unwrap();

        let segments = overlay_segments(&hand, CANVAS, false, Rotation::Deg0);
        assert_eq!(segments.len(), HAND_CONNECTIONS.len());

        let (a, b) = HAND_CONNECTIONS[0];
        assert!(close(segments[0].0, a as f32 / 20.0 * 400.0, 400.0));
        assert!(close(segments[0].1, b as f32 / 20.0 * 400.0, 400.0));
    }
}
