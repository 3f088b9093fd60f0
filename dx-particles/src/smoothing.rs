//! This module contains the exponential smoothing law shared by everything that eases towards a
//! target: `x += (target - x) * (1 - exp(-rate * dt))`.
//!
//! The same real-time interval always closes the same fraction of the gap, whatever the frame
//! rate. Splitting `dt` into smaller steps gives the same result up to float rounding, because
//! `exp(-rate * a) * exp(-rate * b) = exp(-rate * (a + b))`.

/// The frame rate that per-frame lerp constants were tuned at.
pub const REFERENCE_FPS: f32 = 60.;

/// The fraction of the remaining distance to close after `dt` seconds at the given rate.
///
/// A `dt` that is zero, negative or not finite gives 0, so a bad frame time never moves anything.
#[inline]
pub fn convergence_factor(rate: f32, dt: f32) -> f32 {
    if !(dt.is_finite() && dt > 0.) {
        return 0.;
    }
    1. - (-rate * dt).exp()
}

/// Move `current` towards `target` by the convergence factor for `dt` seconds.
#[inline]
pub fn smooth_towards(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * convergence_factor(rate, dt)
}

/// Find the rate that closes the same fraction per frame as a fixed `lerp` at `fps` frames per
/// second.
///
/// `lerp` must be in `(0, 1)`.
#[inline]
pub fn rate_from_frame_lerp(lerp: f32, fps: f32) -> f32 {
    -fps * (1. - lerp).ln()
}
