//! This module handles the [`ParticleField`] that makes up the tree.

use crate::{
    colour::{hex, lerp_colour, smoothstep, Hsl, RGBColour},
    smoothing::convergence_factor,
};
use dx_shared::Mode;
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use thiserror::Error;
use tracing::{debug, instrument, trace};

/// The config for generating a [`ParticleField`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// The number of particles. Fixed for the lifetime of the field.
    pub count: usize,

    /// The height of the assembled cone, centred on y = 0.
    pub height: f32,

    /// The radius of the cone at the bottom.
    pub base_radius: f32,

    /// The radius of the cone at the top.
    pub tip_radius: f32,

    /// The maximum random distance added to the cone radius of each particle.
    pub radius_jitter: f32,

    /// How many radians the spiral turns per unit of height.
    pub swirl: f32,

    /// The smallest radius of the exploded sphere.
    pub explode_min_radius: f32,

    /// The exploded radius is `explode_min_radius` plus up to this much.
    pub explode_radius_spread: f32,

    /// The rate `k` of the exponential convergence, per second. 3 gets about 95% of the way there
    /// in a second.
    pub convergence_rate: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            count: 7500,
            height: 20.,
            base_radius: 9.,
            tip_radius: 0.6,
            radius_jitter: 1.2,
            swirl: 5.,
            explode_min_radius: 32.,
            explode_radius_spread: 14.,
            convergence_rate: ParticleField::DEFAULT_CONVERGENCE_RATE,
        }
    }
}

/// An error from building a [`ParticleField`] out of explicit arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The three arrays need to be the same length.
    #[error(
        "particle arrays must have equal lengths, but got {assembled} assembled, \
         {exploded} exploded, and {colours} colours"
    )]
    LengthMismatch {
        /// The number of assembled positions.
        assembled: usize,

        /// The number of exploded positions.
        exploded: usize,

        /// The number of colours.
        colours: usize,
    },
}

/// A fixed set of particles, each with an assembled position, an exploded position and a colour,
/// plus the position that is currently displayed.
///
/// The target arrays and colours never change after construction. Only [`Self::current`] moves,
/// through [`Self::step`].
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleField {
    /// Where each particle sits in the tree.
    assembled: Box<[Vec3]>,

    /// Where each particle sits on the exploded sphere.
    exploded: Box<[Vec3]>,

    /// The colour of each particle.
    colours: Box<[RGBColour]>,

    /// Where each particle is being drawn right now.
    current: Box<[Vec3]>,

    /// The highest assembled y, if there are any particles.
    max_y: Option<f32>,

    /// The rate `k` used by [`Self::step`].
    convergence_rate: f32,
}

/// The purple at the bottom of the tree.
const BOTTOM_COLOUR: u32 = 0x6b1bff;

/// The neon pink through the middle of the tree.
const MIDDLE_COLOUR: u32 = 0xff4fd8;

/// The white at the top of the tree.
const TOP_COLOUR: u32 = 0xffffff;

/// An icy white for sparkle points.
const ICE_COLOUR: u32 = 0xe9ffff;

/// A lavender white for sparkle points.
const LAVENDER_COLOUR: u32 = 0xefe6ff;

/// Where the gradient switches from purple-pink to pink-white, as a fraction of the height.
const GRADIENT_SPLIT: f32 = 0.62;

impl ParticleField {
    /// The rate `k` used unless configured otherwise.
    pub const DEFAULT_CONVERGENCE_RATE: f32 = 3.;

    /// Generate a new random field. The current positions start at the assembled positions.
    #[instrument(skip_all, fields(count = config.count))]
    pub fn generate<R: Rng + ?Sized>(config: &FieldConfig, rng: &mut R) -> Self {
        let count = config.count;

        // A negative or non-finite height from a config file collapses the cone to a disc
        let height = if config.height.is_finite() {
            config.height.max(0.)
        } else {
            0.
        };
        let half_height = height / 2.;

        let mut assembled = Vec::with_capacity(count);
        let mut exploded = Vec::with_capacity(count);
        let mut colours = Vec::with_capacity(count);

        for i in 0..count {
            let y = rng.gen::<f32>() * height - half_height;
            let t = if height > 0. {
                ((y + half_height) / height).clamp(0., 1.)
            } else {
                0.
            };

            let radius = config.base_radius
                + (config.tip_radius - config.base_radius) * t
                + rng.gen::<f32>() * config.radius_jitter;
            let angle = y * config.swirl + rng.gen::<f32>() * TAU;
            assembled.push(Vec3::new(angle.cos() * radius, y, angle.sin() * radius));

            let explode_radius =
                config.explode_min_radius + rng.gen::<f32>() * config.explode_radius_spread;
            exploded.push(fibonacci_sphere_point(i, count, explode_radius));

            colours.push(tree_colour(y, t, rng));
        }

        let field = Self::from_validated(assembled, exploded, colours, config.convergence_rate);
        debug!(max_y = ?field.max_y, "Generated particle field");
        field
    }

    /// Build a field from explicit arrays, which must all be the same length.
    pub fn from_targets(
        assembled: Vec<Vec3>,
        exploded: Vec<Vec3>,
        colours: Vec<RGBColour>,
    ) -> Result<Self, FieldError> {
        if assembled.len() != exploded.len() || assembled.len() != colours.len() {
            return Err(FieldError::LengthMismatch {
                assembled: assembled.len(),
                exploded: exploded.len(),
                colours: colours.len(),
            });
        }

        Ok(Self::from_validated(
            assembled,
            exploded,
            colours,
            Self::DEFAULT_CONVERGENCE_RATE,
        ))
    }

    fn from_validated(
        assembled: Vec<Vec3>,
        exploded: Vec<Vec3>,
        colours: Vec<RGBColour>,
        convergence_rate: f32,
    ) -> Self {
        let max_y = assembled.iter().map(|p| p.y).reduce(f32::max);
        let current = assembled.clone().into_boxed_slice();

        Self {
            assembled: assembled.into_boxed_slice(),
            exploded: exploded.into_boxed_slice(),
            colours: colours.into_boxed_slice(),
            current,
            max_y,
            convergence_rate,
        }
    }

    /// The number of particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Is the field empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// The assembled positions.
    #[inline]
    pub fn assembled(&self) -> &[Vec3] {
        &self.assembled
    }

    /// The exploded positions.
    #[inline]
    pub fn exploded(&self) -> &[Vec3] {
        &self.exploded
    }

    /// The target positions for the given mode.
    #[inline]
    pub fn targets(&self, mode: Mode) -> &[Vec3] {
        match mode {
            Mode::Assembled => &self.assembled,
            Mode::Exploded => &self.exploded,
        }
    }

    /// The colours.
    #[inline]
    pub fn colours(&self) -> &[RGBColour] {
        &self.colours
    }

    /// The positions being displayed right now.
    #[inline]
    pub fn current(&self) -> &[Vec3] {
        &self.current
    }

    /// The highest assembled y coordinate, or `None` for an empty field.
    #[inline]
    pub fn max_y(&self) -> Option<f32> {
        self.max_y
    }

    /// The rate `k` used by [`Self::step`].
    #[inline]
    pub fn convergence_rate(&self) -> f32 {
        self.convergence_rate
    }

    /// Move every particle towards its target for `mode` after `dt` seconds.
    pub fn step(&mut self, mode: Mode, dt: f32) {
        let a = convergence_factor(self.convergence_rate, dt);
        trace!(?mode, dt, a, "Stepping particle field");
        if a == 0. {
            return;
        }

        let targets: &[Vec3] = match mode {
            Mode::Assembled => &self.assembled,
            Mode::Exploded => &self.exploded,
        };

        for (current, &target) in self.current.iter_mut().zip(targets.iter()) {
            *current += (target - *current) * a;
        }
    }

    /// The largest distance from any particle to its target for `mode`.
    pub fn max_distance_to(&self, mode: Mode) -> f32 {
        self.current
            .iter()
            .zip(self.targets(mode))
            .map(|(current, target)| current.distance(*target))
            .fold(0., f32::max)
    }
}

/// Spread `count` points evenly over a sphere of the given radius.
fn fibonacci_sphere_point(i: usize, count: usize, radius: f32) -> Vec3 {
    let phi = (-1. + 2. * i as f32 / count as f32).clamp(-1., 1.).acos();
    let theta = (count as f32 * PI).sqrt() * phi;

    Vec3::new(
        radius * theta.cos() * phi.sin(),
        radius * theta.sin() * phi.sin(),
        radius * phi.cos(),
    )
}

/// Pick the colour of a particle at height `y`, which is a fraction `t` of the way up the tree.
fn tree_colour<R: Rng + ?Sized>(y: f32, t: f32, rng: &mut R) -> RGBColour {
    let base = if t < GRADIENT_SPLIT {
        lerp_colour(hex(BOTTOM_COLOUR), hex(MIDDLE_COLOUR), t / GRADIENT_SPLIT)
    } else {
        lerp_colour(
            hex(MIDDLE_COLOUR),
            hex(TOP_COLOUR),
            (t - GRADIENT_SPLIT) / (1. - GRADIENT_SPLIT),
        )
    };

    let mut hsl = Hsl::from_rgb(base);
    hsl.h += (rng.gen::<f32>() - 0.5) * 0.045;
    hsl.s = (hsl.s + (rng.gen::<f32>() - 0.5) * 0.18).clamp(0., 1.);
    hsl.l = (hsl.l + (rng.gen::<f32>() - 0.5) * 0.12).clamp(0., 1.);

    // Lower particles get more saturation, higher ones get a little more light
    hsl.s = (hsl.s * (1.25 + (1. - t) * 0.35)).clamp(0., 1.);
    hsl.l = (hsl.l * (1.05 + t * 0.1)).clamp(0., 1.);
    let boosted = hsl.to_rgb();

    let roll = rng.gen::<f32>();
    let top_boost = smoothstep(t, 0.55, 1.);

    if roll < 0.06 + 0.08 * top_boost {
        if rng.gen_bool(0.5) {
            hex(ICE_COLOUR)
        } else {
            hex(LAVENDER_COLOUR)
        }
    } else if roll < 0.16 && (y + rng.gen::<f32>() * 0.2).rem_euclid(2.6) < 0.18 {
        hex(TOP_COLOUR)
    } else {
        boosted
    }
}
