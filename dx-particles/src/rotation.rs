//! This module handles the y-axis rotation of the tree group.

use crate::smoothing::{convergence_factor, rate_from_frame_lerp, REFERENCE_FPS};
use serde::{Deserialize, Serialize};

/// The config for a [`TreeRotation`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeRotationConfig {
    /// Constant spin in radians per second.
    pub auto_spin: f32,

    /// The rate at which the rotation follows the gesture target, per second.
    pub follow_rate: f32,
}

impl Default for TreeRotationConfig {
    fn default() -> Self {
        Self {
            auto_spin: 0.08,
            follow_rate: rate_from_frame_lerp(0.06, REFERENCE_FPS),
        }
    }
}

/// The rotation of the tree about the y axis.
///
/// Each frame it spins a little on its own and then eases towards whatever target the hand
/// suggests. Without a hand, the target is just the last rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TreeRotation {
    config: TreeRotationConfig,
    angle: f32,
}

impl TreeRotation {
    /// Create a new rotation at angle 0.
    pub fn new(config: TreeRotationConfig) -> Self {
        Self { config, angle: 0. }
    }

    /// The current angle in radians.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Advance by `dt` seconds, easing towards `target` if there is one.
    pub fn advance(&mut self, dt: f32, target: Option<f32>) -> f32 {
        if !(dt.is_finite() && dt > 0.) {
            return self.angle;
        }

        self.angle += dt * self.config.auto_spin;
        if let Some(target) = target.filter(|t| t.is_finite()) {
            self.angle += (target - self.angle) * convergence_factor(self.config.follow_rate, dt);
        }

        self.angle
    }
}
