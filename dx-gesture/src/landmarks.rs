//! This module contains the types for the points a hand landmark model finds on a hand.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// The palm base.
pub const WRIST: usize = 0;

/// The tip of the thumb.
pub const THUMB_TIP: usize = 4;

/// The knuckle at the base of the index finger.
pub const INDEX_MCP: usize = 5;

/// The tip of the index finger.
pub const INDEX_TIP: usize = 8;

/// The tip of the middle finger.
pub const MIDDLE_TIP: usize = 12;

/// The tip of the ring finger.
pub const RING_TIP: usize = 16;

/// The tip of the little finger.
pub const PINKY_TIP: usize = 20;

/// The number of landmarks in a full hand.
pub const LANDMARK_COUNT: usize = 21;

/// A single point on the hand, normalised to `[0, 1]` across the camera frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// From the left edge of the unmirrored frame.
    pub x: f32,

    /// From the top edge of the frame.
    pub y: f32,
}

impl Landmark {
    /// Create a new landmark.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// The straight line distance to another landmark.
    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        Vec2::from(self).distance(Vec2::from(other))
    }
}

impl From<Landmark> for Vec2 {
    fn from(value: Landmark) -> Self {
        Vec2::new(value.x, value.y)
    }
}

impl From<Vec2> for Landmark {
    fn from(value: Vec2) -> Self {
        Landmark::new(value.x, value.y)
    }
}

/// All the landmarks of one hand. There are always at least [`LANDMARK_COUNT`] points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandLandmarks(Vec<Landmark>);

impl HandLandmarks {
    /// Wrap a list of landmarks, or return `None` if there aren't enough of them to be a hand.
    pub fn new(points: Vec<Landmark>) -> Option<Self> {
        (points.len() >= LANDMARK_COUNT).then_some(Self(points))
    }

    /// All the points.
    pub fn points(&self) -> &[Landmark] {
        &self.0
    }
}

impl Index<usize> for HandLandmarks {
    type Output = Landmark;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}
