//! This crate provides the particle field that makes up the tree, the maths that moves it between
//! its assembled and exploded shapes, and the generators for the decorative particles around it.
//!
//! Everything here works in the local space of the scene. Projection and painting live in the
//! client.

use rand::Rng;

mod colour;
pub mod decor;
mod field;
mod rotation;
mod smoothing;

pub use self::{
    colour::{hex, lerp_colour, smoothstep, RGBColour},
    field::{FieldConfig, FieldError, ParticleField},
    rotation::{TreeRotation, TreeRotationConfig},
    smoothing::{convergence_factor, rate_from_frame_lerp, smooth_towards, REFERENCE_FPS},
};

/// Sample `base^power` for `base` uniform in `[0, 1)`.
///
/// Powers above 1 bias the result towards 0, which is how the floor decorations get denser near
/// the tree.
pub fn power_law<R: Rng + ?Sized>(rng: &mut R, power: f32) -> f32 {
    rng.gen::<f32>().powf(power)
}
